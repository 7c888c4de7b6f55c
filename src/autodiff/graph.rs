use ndarray::Array2;
use thiserror::Error;

use super::{
    ops::Op,
    tensor::{ParamId, ParameterSet, Scalar, Shape},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("{op}: incompatible shapes {left:?} and {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },
    #[error("{op} takes {expected} inputs, got {found}")]
    Arity {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("seed gradient shape {seed:?} does not match output shape {output:?}")]
    SeedShape { seed: Shape, output: Shape },
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("node {0} does not belong to this graph")]
    UnknownNode(usize),
}

/// Handle to a node of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Whether an evaluation stops after the forward phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    ForwardOnly,
    ForwardBackward,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(ParamId),
    Op { op: Op, inputs: Vec<NodeId> },
}

#[derive(Debug, Clone)]
struct Node<T: Scalar> {
    kind: NodeKind,
    value: Array2<T>,
    grad: Array2<T>,
}

/// Expression graph over the tensors of one [`ParameterSet`].
///
/// Nodes are appended in construction order and every input precedes the nodes that
/// consume it, so forward evaluation walks the list front to back and gradients flow
/// back to front. Shapes are checked when a node is added, never during evaluation.
#[derive(Debug, Clone)]
pub struct Graph<T: Scalar> {
    nodes: Vec<Node<T>>,
}

impl<T: Scalar> Default for Graph<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T: Scalar> Graph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn shape(&self, node: NodeId) -> Shape {
        self.nodes[node.0].value.dim()
    }

    /// Leaf node reading the named parameter.
    pub fn param(&mut self, params: &ParameterSet<T>, name: &str) -> Result<NodeId, GraphError> {
        let id = params.id(name)?;
        let shape = params.get(id).shape();
        Ok(self.push(NodeKind::Leaf(id), shape))
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Add, &[a, b])
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Mul, &[a, b])
    }

    pub fn transpose(&mut self, a: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Transpose, &[a])
    }

    pub fn quadratic(&mut self, a: NodeId, target: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Quadratic, &[a, target])
    }

    pub fn average(&mut self, a: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Average, &[a])
    }

    pub fn entropy(&mut self, a: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::Entropy, &[a])
    }

    pub fn spherical_softmax(&mut self, a: NodeId) -> Result<NodeId, GraphError> {
        self.op(Op::SphericalSoftmax, &[a])
    }

    pub fn op(&mut self, op: Op, inputs: &[NodeId]) -> Result<NodeId, GraphError> {
        let mut shapes = Vec::with_capacity(inputs.len());
        for input in inputs {
            if input.0 >= self.nodes.len() {
                return Err(GraphError::UnknownNode(input.0));
            }
            shapes.push(self.shape(*input));
        }

        let shape = op.output_shape(&shapes)?;
        Ok(self.push(
            NodeKind::Op {
                op,
                inputs: inputs.to_vec(),
            },
            shape,
        ))
    }

    fn push(&mut self, kind: NodeKind, shape: Shape) -> NodeId {
        self.nodes.push(Node {
            kind,
            value: Array2::zeros(shape),
            grad: Array2::zeros(shape),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn check(&self, node: NodeId) -> Result<(), GraphError> {
        if node.0 >= self.nodes.len() {
            return Err(GraphError::UnknownNode(node.0));
        }
        Ok(())
    }

    fn value<'a>(&'a self, params: &'a ParameterSet<T>, node: NodeId) -> &'a Array2<T> {
        match &self.nodes[node.0].kind {
            NodeKind::Leaf(id) => params.get(*id).data(),
            NodeKind::Op { .. } => &self.nodes[node.0].value,
        }
    }

    /// Evaluates every node up to and including `output`.
    pub fn forward<'a>(
        &'a mut self,
        params: &'a ParameterSet<T>,
        output: NodeId,
    ) -> Result<&'a Array2<T>, GraphError> {
        self.check(output)?;

        for index in 0..=output.0 {
            let value = match &self.nodes[index].kind {
                NodeKind::Leaf(_) => continue,
                NodeKind::Op { op, inputs } => {
                    let args = inputs
                        .iter()
                        .map(|input| self.value(params, *input))
                        .collect::<Vec<_>>();
                    op.forward(&args)
                }
            };
            self.nodes[index].value = value;
        }

        Ok(self.value(params, output))
    }

    /// Propagates `seed` (ones when `None`) from `output` back to the parameters,
    /// accumulating into their gradients. Requires a preceding [`Graph::forward`].
    pub fn backward(
        &mut self,
        params: &mut ParameterSet<T>,
        output: NodeId,
        seed: Option<Array2<T>>,
    ) -> Result<(), GraphError> {
        self.check(output)?;

        let output_shape = self.shape(output);
        let seed = match seed {
            Some(seed) if seed.dim() != output_shape => {
                return Err(GraphError::SeedShape {
                    seed: seed.dim(),
                    output: output_shape,
                })
            }
            Some(seed) => seed,
            None => Array2::ones(output_shape),
        };

        for node in self.nodes[..=output.0].iter_mut() {
            node.grad.fill(T::zero());
        }
        self.nodes[output.0].grad = seed;

        for index in (0..=output.0).rev() {
            match &self.nodes[index].kind {
                NodeKind::Leaf(id) => {
                    let id = *id;
                    params.get_mut(id).accumulate(&self.nodes[index].grad);
                }
                NodeKind::Op { op, inputs } => {
                    let (op, inputs) = (*op, inputs.clone());
                    let grads = {
                        let args = inputs
                            .iter()
                            .map(|input| self.value(params, *input))
                            .collect::<Vec<_>>();
                        op.backward(&args, &self.nodes[index].grad)
                    };
                    for (input, grad) in inputs.iter().zip(grads) {
                        self.nodes[input.0].grad += &grad;
                    }
                }
            }
        }

        Ok(())
    }

    /// Forward pass, then the backward pass unless `pass` is [`Pass::ForwardOnly`].
    /// Returns a copy of the output.
    pub fn evaluate(
        &mut self,
        params: &mut ParameterSet<T>,
        output: NodeId,
        pass: Pass,
    ) -> Result<Array2<T>, GraphError> {
        let value = self.forward(params, output)?.clone();
        if pass == Pass::ForwardBackward {
            self.backward(params, output, None)?;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_set() -> ParameterSet<f64> {
        let mut params = ParameterSet::new();
        let w = params.add("w", (2, 2));
        params.get_mut(w).data_mut().assign(&array![[1.0, 2.0], [3.0, 4.0]]);
        let x = params.add("x", (2, 1));
        params.get_mut(x).data_mut().assign(&array![[1.0], [-1.0]]);
        let b = params.add("b", (2, 1));
        params.get_mut(b).data_mut().assign(&array![[0.5], [0.5]]);
        params
    }

    #[test]
    fn test_construction_rejects_mismatch() {
        let params = linear_set();
        let mut graph = Graph::new();
        let w = graph.param(&params, "w").unwrap();
        let b = graph.param(&params, "b").unwrap();

        assert!(matches!(graph.mul(b, w), Err(GraphError::ShapeMismatch { op: "mul", .. })));
        assert!(matches!(graph.param(&params, "z"), Err(GraphError::UnknownParameter(_))));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_forward_backward_linear() {
        let mut params = linear_set();
        let mut graph = Graph::new();
        let w = graph.param(&params, "w").unwrap();
        let x = graph.param(&params, "x").unwrap();
        let b = graph.param(&params, "b").unwrap();
        let wx = graph.mul(w, x).unwrap();
        let l1 = graph.add(wx, b).unwrap();
        let cost = graph.average(l1).unwrap();

        params.zero();
        let value = graph.evaluate(&mut params, cost, Pass::ForwardBackward).unwrap();

        // l1 = [-1 + 0.5, -1 + 0.5]
        assert_eq!(value[[0, 0]], -0.5);
        assert_eq!(params.by_name("w").unwrap().grad(), &array![[0.5, -0.5], [0.5, -0.5]]);
        assert_eq!(params.by_name("x").unwrap().grad(), &array![[2.0], [3.0]]);
        assert_eq!(params.by_name("b").unwrap().grad(), &array![[0.5], [0.5]]);
    }

    #[test]
    fn test_forward_only_leaves_gradients() {
        let mut params = linear_set();
        let mut graph = Graph::new();
        let w = graph.param(&params, "w").unwrap();
        let x = graph.param(&params, "x").unwrap();
        let wx = graph.mul(w, x).unwrap();

        let value = graph.evaluate(&mut params, wx, Pass::ForwardOnly).unwrap();

        assert_eq!(value, array![[-1.0], [-1.0]]);
        assert!(params.iter().all(|t| t.grad().iter().all(|g| *g == 0.0)));
    }

    #[test]
    fn test_shared_leaf_accumulates() {
        let mut params = ParameterSet::<f64>::new();
        let v = params.add("v", (2, 1));
        params.get_mut(v).data_mut().assign(&array![[2.0], [3.0]]);

        let mut graph = Graph::new();
        let leaf = graph.param(&params, "v").unwrap();
        let _squared = graph.quadratic(leaf, leaf).unwrap();
        let vt = graph.transpose(leaf).unwrap();
        let inner = graph.mul(vt, leaf).unwrap();

        params.zero();
        graph.evaluate(&mut params, inner, Pass::ForwardBackward).unwrap();

        // d(v.v)/dv = 2v, the quadratic node before it contributes nothing.
        assert_eq!(params.get(v).grad(), &array![[4.0], [6.0]]);
    }

    #[test]
    fn test_gradients_accumulate_without_zero() {
        let mut params = linear_set();
        let mut graph = Graph::new();
        let w = graph.param(&params, "w").unwrap();
        let x = graph.param(&params, "x").unwrap();
        let wx = graph.mul(w, x).unwrap();
        let cost = graph.average(wx).unwrap();

        params.zero();
        graph.evaluate(&mut params, cost, Pass::ForwardBackward).unwrap();
        graph.evaluate(&mut params, cost, Pass::ForwardBackward).unwrap();
        assert_eq!(params.by_name("x").unwrap().grad(), &array![[4.0], [6.0]]);

        params.zero();
        graph.evaluate(&mut params, cost, Pass::ForwardBackward).unwrap();
        assert_eq!(params.by_name("x").unwrap().grad(), &array![[2.0], [3.0]]);
    }

    #[test]
    fn test_custom_seed() {
        let mut params = linear_set();
        let mut graph = Graph::new();
        let w = graph.param(&params, "w").unwrap();
        let x = graph.param(&params, "x").unwrap();
        let wx = graph.mul(w, x).unwrap();

        params.zero();
        graph.forward(&params, wx).unwrap();
        assert!(matches!(
            graph.backward(&mut params, wx, Some(Array2::ones((1, 1)))),
            Err(GraphError::SeedShape { .. })
        ));

        graph
            .backward(&mut params, wx, Some(array![[1.0], [0.0]]))
            .unwrap();
        assert_eq!(params.by_name("x").unwrap().grad(), &array![[1.0], [2.0]]);
    }

    #[test]
    fn test_foreign_node_rejected() {
        let mut params = linear_set();
        let mut small = Graph::new();
        let x = small.param(&params, "x").unwrap();

        let mut large = Graph::new();
        let w = large.param(&params, "w").unwrap();
        let lx = large.param(&params, "x").unwrap();
        let foreign = large.mul(w, lx).unwrap();

        assert_eq!(small.forward(&params, foreign).err(), Some(GraphError::UnknownNode(2)));
        assert_eq!(
            small.backward(&mut params, foreign, None),
            Err(GraphError::UnknownNode(2))
        );
        assert!(small.forward(&params, x).is_ok());
    }
}
