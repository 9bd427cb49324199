//! The expression language: validation, reference resolution and evaluation.
//!
//! A raw expression goes through [`validate`] once when it is submitted.
//! Before every evaluation its `{n}` markers are replaced by current values
//! ([`references::resolve`]) and the resulting literal-only string is handed
//! to an [`Evaluator`].

pub mod evaluator;
pub mod references;
pub mod validator;

mod error;
mod scan;

pub use error::ExpressionError;
pub use evaluator::{evaluate, Evaluator, SplitPolicy, DEFAULT_MAX_NESTING};
pub use references::{resolve, Resolved};
pub use validator::validate;
