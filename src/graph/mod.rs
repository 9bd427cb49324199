//! The dependency graph between stored calculations.
pub mod dag;

pub use dag::{DependencyGraph, GraphError};
