use std::{
    fmt::Debug,
    ops::{AddAssign, Neg},
};

use hashbrown::HashMap;
use ndarray::{Array2, LinalgScalar, ScalarOperand};
use rustfft::num_complex::Complex64;

use super::graph::GraphError;

/// (rows, cols)
pub type Shape = (usize, usize);

/// Element type a tensor can hold. Real models use `f32`, the attention scorer uses `Complex64`.
pub trait Scalar:
    LinalgScalar + ScalarOperand + Debug + PartialEq + Neg<Output = Self> + AddAssign
{
    fn from_f64(value: f64) -> Self;

    /// Natural logarithm. Principal branch for complex values.
    fn ln(self) -> Self;
}

impl Scalar for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn ln(self) -> Self {
        f32::ln(self)
    }
}

impl Scalar for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn ln(self) -> Self {
        f64::ln(self)
    }
}

impl Scalar for Complex64 {
    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    fn ln(self) -> Self {
        Complex64::ln(self)
    }
}

/// A named 2-D buffer with a gradient of the same shape.
#[derive(Debug, Clone)]
pub struct Tensor<T: Scalar> {
    name: String,
    data: Array2<T>,
    grad: Array2<T>,
}

impl<T: Scalar> Tensor<T> {
    pub fn zeros(name: &str, shape: Shape) -> Self {
        Self {
            name: name.to_string(),
            data: Array2::zeros(shape),
            grad: Array2::zeros(shape),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Mutable access to the values. The shape is fixed for the tensor's lifetime,
    /// so callers write in place (`assign`, indexing) rather than replacing the array.
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn grad(&self) -> &Array2<T> {
        &self.grad
    }

    pub(crate) fn accumulate(&mut self, grad: &Array2<T>) {
        self.grad += grad;
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(T::zero());
    }
}

/// Handle to a tensor inside a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(usize);

/// Named parameters that outlive a single graph evaluation.
#[derive(Debug, Clone)]
pub struct ParameterSet<T: Scalar> {
    tensors: Vec<Tensor<T>>,
    by_name: HashMap<String, ParamId>,
}

impl<T: Scalar> Default for ParameterSet<T> {
    fn default() -> Self {
        Self {
            tensors: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: Scalar> ParameterSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a zero-filled parameter. Re-declaring a name replaces the previous tensor.
    pub fn add(&mut self, name: &str, shape: Shape) -> ParamId {
        let tensor = Tensor::zeros(name, shape);

        if let Some(id) = self.by_name.get(name) {
            self.tensors[id.0] = tensor;
            return *id;
        }

        let id = ParamId(self.tensors.len());
        self.tensors.push(tensor);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Result<ParamId, GraphError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownParameter(name.to_string()))
    }

    pub fn get(&self, id: ParamId) -> &Tensor<T> {
        &self.tensors[id.0]
    }

    pub fn get_mut(&mut self, id: ParamId) -> &mut Tensor<T> {
        &mut self.tensors[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Tensor<T>> {
        self.by_name.get(name).map(|id| &self.tensors[id.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tensor<T>> {
        self.tensors.iter()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Clears every gradient. Call before each forward and backward pair.
    pub fn zero(&mut self) {
        for tensor in self.tensors.iter_mut() {
            tensor.zero_grad();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut set = ParameterSet::<f32>::new();
        let w1 = set.add("w1", (3, 3));
        let b1 = set.add("b1", (3, 1));

        assert_eq!(set.len(), 2);
        assert_eq!(set.id("w1").unwrap(), w1);
        assert_eq!(set.get(b1).shape(), (3, 1));
        assert_eq!(set.by_name("w1").unwrap().name(), "w1");
        assert!(matches!(
            set.id("values"),
            Err(GraphError::UnknownParameter(name)) if name == "values"
        ));
    }

    #[test]
    fn test_redeclare_replaces() {
        let mut set = ParameterSet::<f32>::new();
        let first = set.add("values", (2, 2));
        set.get_mut(first).data_mut()[[0, 0]] = 4.0;

        let second = set.add("values", (4, 1));

        assert_eq!(first, second);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(second).shape(), (4, 1));
        assert_eq!(set.get(second).data()[[0, 0]], 0.0);
    }

    #[test]
    fn test_zero_clears_gradients() {
        let mut set = ParameterSet::<Complex64>::new();
        let id = set.add("input", (2, 1));
        set.get_mut(id)
            .accumulate(&Array2::from_elem((2, 1), Complex64::new(1.0, -1.0)));
        assert_eq!(set.get(id).grad()[[1, 0]], Complex64::new(1.0, -1.0));

        set.zero();

        assert!(set.get(id).grad().iter().all(|g| *g == Complex64::new(0.0, 0.0)));
    }
}
