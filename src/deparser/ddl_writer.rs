//! Table, column, constraint and index DDL writers.
//!
//! These are the inverse of the table and alter builders: a sequence-backed
//! column renders as an identity column, constraint actions render back to
//! their keywords, and composite keys render as table-level clauses.

use std::collections::HashSet;

use super::sql_helpers::{
    quote_column_list, quote_ident, quote_table, render_comment, render_default,
};
use crate::error::DeparseError;
use crate::model::{normalize_type_name, Column, Constraint, Index, ReferenceAction, Table};

/// Which inline key clauses a column still needs
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InlineKeys {
    pub primary: bool,
    pub unique: bool,
}

impl InlineKeys {
    /// Inline clauses for a column, given the constraints already on its table
    pub(crate) fn for_column(column: &Column, table: Option<&Table>) -> Self {
        let covered_primary = table
            .and_then(|t| t.primary_key())
            .is_some_and(|(_, columns)| columns.iter().any(|c| c == &column.name));
        let covered_unique = table.is_some_and(|t| t.has_unique_constraint(&column.name));
        Self {
            primary: column.primary && !covered_primary,
            unique: column.unique && !column.primary && !covered_unique,
        }
    }
}

/// Write a column definition.
///
/// Generates: `"name" type[ GENERATED BY DEFAULT AS IDENTITY][ NOT NULL][ DEFAULT v][ PRIMARY KEY| UNIQUE][ CHECK (expr)]`
pub(crate) fn write_column(
    column: &Column,
    keys: InlineKeys,
    operation: &'static str,
) -> Result<String, DeparseError> {
    if column.data_type.trim().is_empty() {
        return Err(DeparseError::MissingField {
            operation,
            field: "type",
        });
    }

    // A serial type is written as its integer type plus identity
    let (integer_type, serial) = normalize_type_name(&column.data_type);
    let increment = column.increment || serial;
    let data_type = if serial {
        integer_type.as_str()
    } else {
        column.data_type.as_str()
    };

    let mut sql = format!("{} {}", quote_ident(&column.name), data_type);
    if increment {
        sql.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let (Some(default), false) = (&column.default, increment) {
        sql.push_str(" DEFAULT ");
        sql.push_str(&render_default(default));
    }
    if keys.primary {
        sql.push_str(" PRIMARY KEY");
    } else if keys.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(check) = &column.check {
        sql.push_str(&format!(" CHECK ({})", check));
    }
    Ok(sql)
}

/// Write a table-level constraint clause.
///
/// Generates: `CONSTRAINT "name" PRIMARY KEY ("a", "b")` and friends; NO ACTION
/// is the default and is omitted from foreign keys.
pub(crate) fn write_constraint(table: &str, constraint: &Constraint) -> Result<String, DeparseError> {
    let prefix = match constraint.name() {
        "" => String::new(),
        name => format!("CONSTRAINT {} ", quote_ident(name)),
    };

    let body = match constraint {
        Constraint::PrimaryKey { columns, name } | Constraint::Unique { columns, name } => {
            if columns.is_empty() {
                return Err(DeparseError::EmptyColumnList {
                    table: table.to_string(),
                    name: name.clone(),
                    constraint: constraint.kind(),
                });
            }
            format!("{} {}", constraint.kind(), quote_column_list(columns))
        }
        Constraint::Check { expression, .. } => format!("CHECK ({})", expression),
        Constraint::ForeignKey {
            column,
            target_table,
            target_column,
            on_update,
            on_delete,
            ..
        } => {
            let mut clause = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(column),
                quote_table(target_table),
                quote_ident(target_column)
            );
            if *on_update != ReferenceAction::NoAction {
                clause.push_str(&format!(" ON UPDATE {}", on_update.as_sql()));
            }
            if *on_delete != ReferenceAction::NoAction {
                clause.push_str(&format!(" ON DELETE {}", on_delete.as_sql()));
            }
            clause
        }
    };

    Ok(format!("{}{}", prefix, body))
}

/// Write a CREATE TABLE statement followed by its comments and indexes.
///
/// Every problem in the table is collected rather than stopping at the first.
pub(crate) fn write_create_table(table: &Table) -> Result<String, Vec<DeparseError>> {
    if table.columns.is_empty() {
        return Err(vec![DeparseError::EmptyTable {
            table: table.name.clone(),
        }]);
    }

    let mut errors = Vec::new();
    let mut lines = Vec::new();

    // Primary columns no constraint covers: one goes inline, several become a table-level key
    let uncovered_primary: Vec<String> = table
        .columns
        .values()
        .filter(|c| InlineKeys::for_column(c, Some(table)).primary)
        .map(|c| c.name.clone())
        .collect();
    let composite_primary = uncovered_primary.len() > 1;
    let composite_set: HashSet<&str> = if composite_primary {
        uncovered_primary.iter().map(String::as_str).collect()
    } else {
        HashSet::new()
    };

    for column in table.columns.values() {
        let mut keys = InlineKeys::for_column(column, Some(table));
        if composite_set.contains(column.name.as_str()) {
            keys.primary = false;
        }
        match write_column(column, keys, "add_table") {
            Ok(sql) => lines.push(sql),
            Err(e) => errors.push(e),
        }
    }

    if composite_primary {
        lines.push(format!("PRIMARY KEY {}", quote_column_list(&uncovered_primary)));
    }

    for constraint in table.constraints.values() {
        match write_constraint(&table.name, constraint) {
            Ok(sql) => lines.push(sql),
            Err(e) => errors.push(e),
        }
    }

    let mut follow_ups = Vec::new();
    if let Some(comment) = &table.comment {
        follow_ups.push(write_table_comment(&table.name, Some(comment)));
    }
    for column in table.columns.values() {
        if let Some(comment) = &column.comment {
            follow_ups.push(write_column_comment(&table.name, &column.name, Some(comment)));
        }
    }
    for index in table.indexes.values() {
        match write_create_index(&table.name, index, "add_table") {
            Ok(sql) => follow_ups.push(sql),
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut sql = format!(
        "CREATE TABLE {} (\n  {}\n);",
        quote_table(&table.name),
        lines.join(",\n  ")
    );
    if !follow_ups.is_empty() {
        sql.push_str("\n\n");
        sql.push_str(&follow_ups.join("\n"));
    }
    Ok(sql)
}

/// Write a CREATE INDEX statement.
///
/// Generates: `CREATE [UNIQUE ]INDEX "name" ON "table"[ USING method] ("a", "b");`
pub(crate) fn write_create_index(
    table: &str,
    index: &Index,
    operation: &'static str,
) -> Result<String, DeparseError> {
    if index.name.trim().is_empty() {
        return Err(DeparseError::MissingField {
            operation,
            field: "index.name",
        });
    }
    if index.columns.is_empty() {
        return Err(DeparseError::EmptyColumnList {
            table: table.to_string(),
            name: index.name.clone(),
            constraint: "INDEX",
        });
    }

    let using = match index.index_type.as_str() {
        "" => String::new(),
        method => format!(" USING {}", method),
    };
    Ok(format!(
        "CREATE {}INDEX {} ON {}{} {};",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        quote_table(table),
        using,
        quote_column_list(&index.columns)
    ))
}

pub(crate) fn write_table_comment(table: &str, comment: Option<&str>) -> String {
    format!(
        "COMMENT ON TABLE {} IS {};",
        quote_table(table),
        render_comment(comment)
    )
}

pub(crate) fn write_column_comment(table: &str, column: &str, comment: Option<&str>) -> String {
    format!(
        "COMMENT ON COLUMN {}.{} IS {};",
        quote_table(table),
        quote_ident(column),
        render_comment(comment)
    )
}

