pub mod attention;
pub mod price;
#[cfg(test)]
mod scenario_tests;

pub use attention::rank;
pub use price::{PriceModel, TrainingConfig};
