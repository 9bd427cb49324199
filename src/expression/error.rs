//! Defines the error types for parsing and evaluating expressions.
use crate::store::CalcId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("the expression is empty")]
    EmptyExpression,
    #[error("the expression contains invalid symbols or characters: '{0}'")]
    InvalidSyntax(String),
    #[error("operators '{pair}' follow each other at position {position}")]
    ConsecutiveOperators { position: usize, pair: String },
    #[error("the brackets in the expression are not formatted correctly: {0}")]
    UnbalancedBrackets(String),
    #[error("an expression cannot refer to itself (calculation {0})")]
    SelfReference(CalcId),
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("cannot evaluate '{0}'")]
    MalformedExpression(String),
    #[error("expression nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl ExpressionError {
    /// True for errors caused by the text the caller submitted.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExpressionError::EmptyExpression
                | ExpressionError::InvalidSyntax(_)
                | ExpressionError::ConsecutiveOperators { .. }
                | ExpressionError::UnbalancedBrackets(_)
                | ExpressionError::SelfReference(_)
        )
    }
}
