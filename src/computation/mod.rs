//! Executes calculations against the store.
pub mod engine;
pub mod error;
pub mod recompute;

pub use engine::CalculationEngine;
pub use error::{CalcError, ErrorKind};
pub use recompute::{recompute, Evaluated};
