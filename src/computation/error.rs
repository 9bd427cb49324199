use crate::expression::ExpressionError;
use crate::graph::GraphError;
use crate::store::{CalcId, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("a calculation with id {0} does not exist")]
    NotFound(CalcId),
    #[error("reference chain is deeper than {0} calculations")]
    TooDeep(usize),
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("engine lock poisoned: {0}")]
    Poisoned(String),
}

/// Coarse classification for whoever maps errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submitted expression has to be fixed.
    Validation,
    /// The expression is well formed but has no value (division by zero,
    /// nesting too deep).
    Evaluation,
    NotFound,
    /// Storage or engine trouble; nothing the caller can fix.
    Internal,
}

impl CalcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::Expression(e) if e.is_input_error() => ErrorKind::Validation,
            CalcError::Expression(ExpressionError::DivisionByZero(_) | ExpressionError::TooDeep(_)) => {
                ErrorKind::Evaluation
            }
            CalcError::Expression(_) => ErrorKind::Internal,
            CalcError::Graph(GraphError::CycleDetected(_)) => ErrorKind::Validation,
            CalcError::Graph(GraphError::Store(_)) => ErrorKind::Internal,
            CalcError::NotFound(_) => ErrorKind::NotFound,
            CalcError::TooDeep(_) => ErrorKind::Evaluation,
            CalcError::Store(_) | CalcError::Poisoned(_) => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }
}
