//! Schema model element types
//!
//! Field names and nesting follow the JSON shape downstream consumers read
//! (`notNull`, `primaryTable`, `type`, ...), so every type here serializes in
//! camelCase with SCREAMING_SNAKE_CASE enum tags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Table element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    /// Columns in declaration order
    pub columns: IndexMap<String, Column>,
    pub comment: Option<String>,
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
    #[serde(default)]
    pub constraints: IndexMap<String, Constraint>,
}

impl Table {
    /// An empty table with only its name set.
    ///
    /// This is also the exact shape of the placeholder created when an ALTER
    /// statement targets a table that has not been created yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            comment: None,
            indexes: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// The table's primary key constraint, if it has one
    pub fn primary_key(&self) -> Option<(&String, &[String])> {
        self.constraints.iter().find_map(|(name, c)| match c {
            Constraint::PrimaryKey { columns, .. } => Some((name, columns.as_slice())),
            _ => None,
        })
    }

    /// Whether a single-column UNIQUE constraint covers `column`
    pub fn has_unique_constraint(&self, column: &str) -> bool {
        self.constraints.values().any(|c| match c {
            Constraint::Unique { columns, .. } => columns.len() == 1 && columns[0] == column,
            _ => false,
        })
    }
}

/// Column element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Normalized type string (e.g., "varchar", "numeric(10,2)")
    #[serde(rename = "type")]
    pub data_type: String,
    pub default: Option<ColumnDefault>,
    pub check: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    pub not_null: bool,
    /// True when values come from a sequence or identity rather than a default
    #[serde(default)]
    pub increment: bool,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default: None,
            check: None,
            primary: false,
            unique: false,
            not_null: false,
            increment: false,
            comment: None,
        }
    }
}

/// A column default.
///
/// Literal constants keep their native JSON type; anything else (function
/// calls, operators) is kept as opaque expression text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDefault {
    Boolean(bool),
    Integer(i64),
    /// Any other numeric literal (`9.99`, `1e3`), written back as is
    Number(serde_json::Number),
    Text(String),
    Expression(DefaultExpression),
}

/// Opaque default expression text (e.g., `now()`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultExpression {
    pub expression: String,
}

impl ColumnDefault {
    pub fn expression(text: impl Into<String>) -> Self {
        ColumnDefault::Expression(DefaultExpression {
            expression: text.into(),
        })
    }
}

/// Index element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    /// Indexed columns in key order
    pub columns: Vec<String>,
    /// Access method; empty for the default (btree)
    #[serde(rename = "type", default)]
    pub index_type: String,
}

/// Foreign key referential action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    #[default]
    NoAction,
}

impl ReferenceAction {
    /// SQL keyword form (e.g., "SET NULL")
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferenceAction::Cascade => "CASCADE",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::SetNull => "SET NULL",
            ReferenceAction::SetDefault => "SET DEFAULT",
            ReferenceAction::NoAction => "NO ACTION",
        }
    }
}

/// Table constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Constraint {
    PrimaryKey {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        /// Referencing column in the owning table
        column: String,
        target_table: String,
        target_column: String,
        #[serde(default)]
        on_update: ReferenceAction,
        #[serde(default)]
        on_delete: ReferenceAction,
    },
    Unique {
        name: String,
        columns: Vec<String>,
    },
    Check {
        name: String,
        /// Raw expression text, not interpreted
        expression: String,
    },
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey { name, .. }
            | Constraint::ForeignKey { name, .. }
            | Constraint::Unique { name, .. }
            | Constraint::Check { name, .. } => name,
        }
    }

    /// Human-readable constraint kind (e.g., "PRIMARY KEY")
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::PrimaryKey { .. } => "PRIMARY KEY",
            Constraint::ForeignKey { .. } => "FOREIGN KEY",
            Constraint::Unique { .. } => "UNIQUE",
            Constraint::Check { .. } => "CHECK",
        }
    }
}

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

/// A foreign-key relationship between two tables.
///
/// The primary side is the referenced table; the foreign side holds the
/// foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub name: String,
    pub primary_table: String,
    pub primary_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub cardinality: Cardinality,
    pub on_update: ReferenceAction,
    pub on_delete: ReferenceAction,
}

/// A named group of tables (populated by external override layers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGroup {
    pub name: String,
    pub tables: Vec<String>,
    pub comment: Option<String>,
}
