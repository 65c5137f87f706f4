//! CREATE [UNIQUE] INDEX handling

use sqlparser::ast::{CreateIndex, Expr};
use tracing::{debug, warn};

use super::builder::{short_table_name, SchemaBuilder};
use super::Index;
use crate::parser::identifier_utils::{normalize_ident, resolve_object_name, unqualified_name};
use crate::ParseOptions;

/// Build an index from CREATE INDEX and attach it to its table.
///
/// Only plain column references are modeled. An index with any expression
/// key is skipped; a partial index keeps its columns and drops the predicate.
pub(crate) fn build_index(builder: &mut SchemaBuilder<'_>, create: &CreateIndex, options: &ParseOptions) {
    let table = resolve_object_name(&create.table_name, options);

    let mut columns = Vec::with_capacity(create.columns.len());
    for key in &create.columns {
        match &key.expr {
            Expr::Identifier(ident) => columns.push(normalize_ident(ident)),
            Expr::CompoundIdentifier(parts) => {
                columns.push(parts.last().map(normalize_ident).unwrap_or_default())
            }
            other => {
                warn!(table = %table, expression = %other, "expression index not modeled, skipping");
                builder.skip(
                    "CREATE INDEX".to_string(),
                    format!("expression key not modeled: {}", other),
                );
                return;
            }
        }
    }

    if create.predicate.is_some() {
        debug!(table = %table, "ignoring partial index predicate");
    }

    let name = create
        .name
        .as_ref()
        .map(unqualified_name)
        .unwrap_or_else(|| default_index_name(&table, &columns));

    builder.add_index(
        &table,
        Index {
            name,
            unique: create.unique,
            columns,
            index_type: access_method(create.using.as_ref().map(|u| u.to_string())),
        },
    );
}

/// PostgreSQL's name for an unnamed index (`users_email_idx`)
pub fn default_index_name(table: &str, columns: &[String]) -> String {
    format!("{}_{}_idx", short_table_name(table), columns.join("_"))
}

/// Lowercased access method; empty for the default btree
fn access_method(using: Option<String>) -> String {
    match using.map(|m| m.to_lowercase()) {
        Some(method) if method != "btree" => method,
        _ => String::new(),
    }
}
