use ndarray::{Array2, Axis};

use super::{
    graph::GraphError,
    tensor::{Scalar, Shape},
};

/// Stabilizer added to every squared element of a spherical softmax lane.
/// Zero means an all-zero lane divides 0 by 0 and yields NaN.
pub const SPHERICAL_EPSILON: f64 = 0.0;

/// Operator kinds the graph can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Elementwise sum, the right side may be a single column broadcast across the left.
    Add,
    /// Matrix product.
    Mul,
    Transpose,
    /// Elementwise squared error against a target.
    Quadratic,
    /// Mean of every element, as a 1x1 tensor.
    Average,
    /// `-sum(a * ln a)` over every element, as a 1x1 tensor.
    Entropy,
    /// Normalizes each column by the sum of its squared elements.
    SphericalSoftmax,
}

impl Op {
    pub fn arity(&self) -> usize {
        match self {
            Op::Add | Op::Mul | Op::Quadratic => 2,
            Op::Transpose | Op::Average | Op::Entropy | Op::SphericalSoftmax => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Mul => "mul",
            Op::Transpose => "transpose",
            Op::Quadratic => "quadratic",
            Op::Average => "average",
            Op::Entropy => "entropy",
            Op::SphericalSoftmax => "spherical_softmax",
        }
    }

    /// Validates input shapes and returns the output shape.
    pub fn output_shape(&self, inputs: &[Shape]) -> Result<Shape, GraphError> {
        if inputs.len() != self.arity() {
            return Err(GraphError::Arity {
                op: self.name(),
                expected: self.arity(),
                found: inputs.len(),
            });
        }

        let mismatch = |left: Shape, right: Shape| GraphError::ShapeMismatch {
            op: self.name(),
            left,
            right,
        };

        match self {
            Op::Add => {
                let (left, right) = (inputs[0], inputs[1]);
                if left.0 != right.0 || (right.1 != left.1 && right.1 != 1) {
                    return Err(mismatch(left, right));
                }
                Ok(left)
            }
            Op::Mul => {
                let (left, right) = (inputs[0], inputs[1]);
                if left.1 != right.0 {
                    return Err(mismatch(left, right));
                }
                Ok((left.0, right.1))
            }
            Op::Quadratic => {
                let (left, right) = (inputs[0], inputs[1]);
                if left != right {
                    return Err(mismatch(left, right));
                }
                Ok(left)
            }
            Op::Transpose => Ok((inputs[0].1, inputs[0].0)),
            Op::Average | Op::Entropy => Ok((1, 1)),
            Op::SphericalSoftmax => Ok(inputs[0]),
        }
    }

    pub fn forward<T: Scalar>(&self, inputs: &[&Array2<T>]) -> Array2<T> {
        match self {
            Op::Add => inputs[0] + inputs[1],
            Op::Mul => inputs[0].dot(inputs[1]),
            Op::Transpose => inputs[0].t().to_owned(),
            Op::Quadratic => {
                let diff = inputs[0] - inputs[1];
                &diff * &diff
            }
            Op::Average => {
                let count = T::from_f64(inputs[0].len() as f64);
                Array2::from_elem((1, 1), inputs[0].sum() / count)
            }
            Op::Entropy => {
                let total = inputs[0]
                    .iter()
                    .filter(|value| **value != T::zero())
                    .fold(T::zero(), |acc, &value| acc + value * value.ln());
                Array2::from_elem((1, 1), -total)
            }
            Op::SphericalSoftmax => spherical_softmax(inputs[0]),
        }
    }

    /// Gradients with respect to each input, in input order.
    pub fn backward<T: Scalar>(
        &self,
        inputs: &[&Array2<T>],
        output_grad: &Array2<T>,
    ) -> Vec<Array2<T>> {
        match self {
            Op::Add => {
                let (left, right) = (inputs[0], inputs[1]);
                let right_grad = if right.ncols() == left.ncols() {
                    output_grad.clone()
                } else {
                    output_grad.sum_axis(Axis(1)).insert_axis(Axis(1))
                };
                vec![output_grad.clone(), right_grad]
            }
            Op::Mul => {
                let (left, right) = (inputs[0], inputs[1]);
                vec![output_grad.dot(&right.t()), left.t().dot(output_grad)]
            }
            Op::Transpose => vec![output_grad.t().to_owned()],
            Op::Quadratic => {
                let diff = inputs[0] - inputs[1];
                let left_grad = &diff * output_grad * T::from_f64(2.0);
                let right_grad = left_grad.mapv(|value| -value);
                vec![left_grad, right_grad]
            }
            Op::Average => {
                let count = T::from_f64(inputs[0].len() as f64);
                vec![Array2::from_elem(inputs[0].raw_dim(), output_grad[[0, 0]] / count)]
            }
            Op::Entropy => {
                let upstream = output_grad[[0, 0]];
                let one = T::one();
                vec![inputs[0].mapv(|value| {
                    if value == T::zero() {
                        T::zero()
                    } else {
                        -(value.ln() + one) * upstream
                    }
                })]
            }
            Op::SphericalSoftmax => vec![spherical_softmax_grad(inputs[0], output_grad)],
        }
    }
}

fn spherical_softmax<T: Scalar>(input: &Array2<T>) -> Array2<T> {
    let epsilon = T::from_f64(SPHERICAL_EPSILON);
    let mut output = Array2::zeros(input.raw_dim());

    for (lane, mut target) in input.columns().into_iter().zip(output.columns_mut()) {
        let sum = lane
            .iter()
            .fold(T::zero(), |acc, &value| acc + value * value + epsilon);
        for (out, &value) in target.iter_mut().zip(lane.iter()) {
            *out = (value * value + epsilon) / sum;
        }
    }

    output
}

// Only the numerator term of the quotient rule. The cross term
// `-sum_k(d_k * c_k) * 2 * a_j / sum` is not applied.
fn spherical_softmax_grad<T: Scalar>(input: &Array2<T>, output_grad: &Array2<T>) -> Array2<T> {
    let epsilon = T::from_f64(SPHERICAL_EPSILON);
    let two = T::from_f64(2.0);
    let mut grad = Array2::zeros(input.raw_dim());

    for ((lane, upstream), mut target) in input
        .columns()
        .into_iter()
        .zip(output_grad.columns())
        .zip(grad.columns_mut())
    {
        let sum = lane
            .iter()
            .fold(T::zero(), |acc, &value| acc + value * value + epsilon);
        for ((out, &value), &d) in target.iter_mut().zip(lane.iter()).zip(upstream.iter()) {
            *out = d * (two * value * (sum - (value * value + epsilon))) / (sum * sum);
        }
    }

    grad
}
