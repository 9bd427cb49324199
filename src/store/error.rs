//! Defines the error types for the storage gateway.
use super::types::CalcId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("calculation row {0} does not exist")]
    RowNotFound(CalcId),
    #[error("invalid table name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidTableName(String),
}
