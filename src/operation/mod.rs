//! Schema edit operations
//!
//! Operations are produced by whatever tracks schema history and arrive as
//! JSON, internally tagged by `kind`:
//!
//! ```json
//! { "kind": "alter_column", "table": "users", "column": "name",
//!   "change": { "attribute": "not_null", "value": true } }
//! ```
//!
//! Each operation carries everything needed to render it; the schema passed
//! to the deparser is only context.
//!
//! Documents are decoded element by element: an element that does not
//! decode becomes [`Operation::Malformed`] and the rest are kept.

mod apply;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::SchemaError;
use crate::model::{Column, ColumnDefault, Constraint, Index, Table};

pub use apply::apply_operation;

/// A single structured schema edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    AddTable {
        table: Table,
    },
    DropTable {
        table: String,
    },
    /// `to` is a bare name; the table keeps its schema qualifier
    RenameTable {
        table: String,
        to: String,
    },
    SetTableComment {
        table: String,
        comment: Option<String>,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AlterColumn {
        table: String,
        column: String,
        change: ColumnChange,
    },
    AddConstraint {
        table: String,
        constraint: Constraint,
    },
    DropConstraint {
        table: String,
        name: String,
    },
    AddIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        name: String,
    },
    /// A document element that did not decode (e.g., a missing field).
    ///
    /// Only produced by [`Operation::from_value`]; never read from or
    /// written to JSON.
    #[serde(skip)]
    Malformed { kind: String, message: String },
    /// Any operation kind this crate does not model
    #[serde(other)]
    Unsupported,
}

impl Operation {
    /// The `kind` tag of this operation
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddTable { .. } => "add_table",
            Operation::DropTable { .. } => "drop_table",
            Operation::RenameTable { .. } => "rename_table",
            Operation::SetTableComment { .. } => "set_table_comment",
            Operation::AddColumn { .. } => "add_column",
            Operation::DropColumn { .. } => "drop_column",
            Operation::AlterColumn { .. } => "alter_column",
            Operation::AddConstraint { .. } => "add_constraint",
            Operation::DropConstraint { .. } => "drop_constraint",
            Operation::AddIndex { .. } => "add_index",
            Operation::DropIndex { .. } => "drop_index",
            Operation::Malformed { .. } => "malformed",
            Operation::Unsupported => "unsupported",
        }
    }

    /// Decode one document element, keeping a broken one as
    /// [`Operation::Malformed`]
    pub fn from_value(value: Value) -> Operation {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(kind = %kind, error = %e, "malformed operation");
            Operation::Malformed {
                kind,
                message: e.to_string(),
            }
        })
    }
}

/// Decode a JSON array of operations.
///
/// Only a document that is not an array fails as a whole; broken elements
/// come back as [`Operation::Malformed`] in their position.
pub fn parse_operations(json: &str) -> Result<Vec<Operation>, SchemaError> {
    let values: Vec<Value> =
        serde_json::from_str(json).map_err(|e| SchemaError::InvalidOperationDocument {
            message: e.to_string(),
        })?;
    Ok(values.into_iter().map(Operation::from_value).collect())
}

fn deserialize_operations<'de, D>(deserializer: D) -> Result<Vec<Operation>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.into_iter().map(Operation::from_value).collect())
}

/// A change to one attribute of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "attribute", rename_all = "snake_case")]
pub enum ColumnChange {
    Type {
        #[serde(rename = "type")]
        data_type: String,
    },
    NotNull {
        value: bool,
    },
    Default {
        value: Option<ColumnDefault>,
    },
    Comment {
        value: Option<String>,
    },
    Check {
        value: Option<String>,
    },
    Rename {
        to: String,
    },
}

impl ColumnChange {
    pub fn attribute(&self) -> &'static str {
        match self {
            ColumnChange::Type { .. } => "type",
            ColumnChange::NotNull { .. } => "not_null",
            ColumnChange::Default { .. } => "default",
            ColumnChange::Comment { .. } => "comment",
            ColumnChange::Check { .. } => "check",
            ColumnChange::Rename { .. } => "rename",
        }
    }
}

/// The operations recorded for one schema version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedOperationBatch {
    pub version: i64,
    #[serde(deserialize_with = "deserialize_operations")]
    pub operations: Vec<Operation>,
}

impl VersionedOperationBatch {
    pub fn new(version: i64, operations: Vec<Operation>) -> Self {
        Self {
            version,
            operations,
        }
    }
}
