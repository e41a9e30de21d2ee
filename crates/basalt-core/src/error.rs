//! Error types for all BasaltDB operations.

use thiserror::Error;

/// Top-level error type for BasaltDB operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Administrative preconditions on tables and column families.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("table is not disabled: {0}")]
    TableNotDisabled(String),

    #[error("table is not enabled: {0}")]
    TableNotEnabled(String),

    #[error("column family not found in table '{table}': {family}")]
    FamilyNotFound { table: String, family: String },

    #[error("column family already exists in table '{table}': {family}")]
    FamilyAlreadyExists { table: String, family: String },

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("table needs at least one column family: {0}")]
    NoFamilies(String),
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("put carries no cells")]
    EmptyPut,

    #[error("empty row key")]
    EmptyRowKey,

    #[error("row key exceeds maximum size of {max} bytes (got {actual})")]
    RowKeyTooLarge { max: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter depth exceeds maximum of {0}")]
    TooDeep(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
