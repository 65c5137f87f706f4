//! Error types for ddl-schema

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring or building a schema model
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read SQL file: {path}")]
    SqlFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL tokenize error at line {line}: {message}")]
    TokenizeError { line: usize, message: String },

    #[error("Invalid parse options: {message}")]
    InvalidOptions { message: String },

    #[error("Failed to read operations from {path}")]
    OperationReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid operation document: {message}")]
    InvalidOperationDocument { message: String },

    #[error("JSON serialization error: {message}")]
    JsonError { message: String },
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::JsonError {
            message: err.to_string(),
        }
    }
}

/// Errors produced while rendering a single operation back into DDL.
///
/// These are returned as values, one list per operation, so a batch caller
/// can drop the failing operation and keep rendering the rest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeparseError {
    #[error("Unsupported operation: {kind}")]
    UnsupportedOperation { kind: String },

    #[error("Malformed operation `{kind}`: {message}")]
    MalformedOperation { kind: String, message: String },

    #[error("Operation {operation} is missing required field `{field}`")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("{constraint} constraint `{name}` on table `{table}` has no columns")]
    EmptyColumnList {
        table: String,
        name: String,
        constraint: &'static str,
    },

    #[error("Column `{column}` cannot be a primary key: `{table}` already has `{existing}`")]
    DuplicatePrimaryKey {
        table: String,
        column: String,
        existing: String,
    },

    #[error("Table `{table}` has no columns")]
    EmptyTable { table: String },

    #[error("Column change `{attribute}` on `{table}.{column}` cannot be rendered: {reason}")]
    UnsupportedColumnChange {
        table: String,
        column: String,
        attribute: &'static str,
        reason: String,
    },
}
