//! Reverse-mode automatic differentiation over small 2-D tensors.

pub mod graph;
pub mod ops;
pub mod tensor;

pub use graph::{Graph, GraphError, NodeId, Pass};
pub use tensor::{ParamId, ParameterSet};
