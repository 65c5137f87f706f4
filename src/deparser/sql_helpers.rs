//! Low-level SQL text utilities for DDL rendering.

use crate::model::ColumnDefault;

/// Double-quote an identifier, doubling embedded quotes.
///
/// Generates: `"name"`
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name (`audit.users` -> `"audit"."users"`)
pub(crate) fn quote_table(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// Single-quote a string literal, doubling embedded quotes
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Parenthesized, quoted column list: `("a", "b")`
pub(crate) fn quote_column_list(columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("({})", quoted.join(", "))
}

/// Render a column default as SQL
pub(crate) fn render_default(default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Boolean(true) => "TRUE".to_string(),
        ColumnDefault::Boolean(false) => "FALSE".to_string(),
        ColumnDefault::Integer(i) => i.to_string(),
        ColumnDefault::Number(n) => n.to_string(),
        ColumnDefault::Text(s) => quote_literal(s),
        ColumnDefault::Expression(e) => e.expression.clone(),
    }
}

/// Comment text for COMMENT ON, where an absent comment clears it
pub(crate) fn render_comment(comment: Option<&str>) -> String {
    match comment {
        Some(text) => quote_literal(text),
        None => "NULL".to_string(),
    }
}
