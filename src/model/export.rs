//! schema.json physical schema export
//!
//! The export flattens the model's maps into arrays in model order. Column
//! defaults are plain scalars: expression defaults become their text.
//!
//! ```json
//! { "database": { "vendor": "postgresql", "version": "16" },
//!   "tables": [ { "name": "users", "comment": null,
//!                 "columns": [...], "indexes": [...], "constraints": [...] } ] }
//! ```

use serde::{Serialize, Serializer};

use super::{Column, ColumnDefault, Constraint, Index, Schema};

pub const DATABASE_VENDOR: &str = "postgresql";

/// Top-level schema.json document
#[derive(Debug, Clone, Serialize)]
pub struct SchemaExport<'a> {
    pub database: DatabaseInfo,
    pub tables: Vec<TableExport<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    pub vendor: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableExport<'a> {
    pub name: &'a str,
    pub comment: Option<&'a str>,
    pub columns: Vec<ColumnExport<'a>>,
    pub indexes: Vec<&'a Index>,
    pub constraints: Vec<&'a Constraint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnExport<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub data_type: &'a str,
    #[serde(serialize_with = "serialize_scalar_default")]
    pub default: Option<&'a ColumnDefault>,
    pub check: Option<&'a str>,
    pub primary: bool,
    pub unique: bool,
    pub not_null: bool,
    pub increment: bool,
    pub comment: Option<&'a str>,
}

impl<'a> From<&'a Column> for ColumnExport<'a> {
    fn from(column: &'a Column) -> Self {
        Self {
            name: &column.name,
            data_type: &column.data_type,
            default: column.default.as_ref(),
            check: column.check.as_deref(),
            primary: column.primary,
            unique: column.unique,
            not_null: column.not_null,
            increment: column.increment,
            comment: column.comment.as_deref(),
        }
    }
}

fn serialize_scalar_default<S: Serializer>(
    default: &Option<&ColumnDefault>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match default {
        Some(ColumnDefault::Expression(e)) => serializer.serialize_str(&e.expression),
        Some(other) => other.serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Borrowing export view of a schema
pub fn export_schema<'a>(schema: &'a Schema, version: Option<&str>) -> SchemaExport<'a> {
    SchemaExport {
        database: DatabaseInfo {
            vendor: DATABASE_VENDOR.to_string(),
            version: version.map(str::to_string),
        },
        tables: schema
            .tables
            .values()
            .map(|table| TableExport {
                name: &table.name,
                comment: table.comment.as_deref(),
                columns: table.columns.values().map(ColumnExport::from).collect(),
                indexes: table.indexes.values().collect(),
                constraints: table.constraints.values().collect(),
            })
            .collect(),
    }
}

/// Render the export as pretty-printed JSON
pub fn export_schema_json(schema: &Schema, version: Option<&str>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&export_schema(schema, version))
}
