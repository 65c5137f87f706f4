//! Render operations back into PostgreSQL DDL
//!
//! [`deparse`] returns either non-empty SQL or a non-empty error list, never
//! both. Errors are values, so a batch caller can drop one failing
//! operation and keep the rest.
//!
//! # Examples
//!
//! ```ignore
//! let op = Operation::DropColumn { table: "users".into(), column: "age".into() };
//! assert_eq!(deparse(&op, &Schema::new()).unwrap(), "ALTER TABLE \"users\" DROP COLUMN \"age\";");
//! ```

mod ddl_writer;
mod sql_helpers;

use crate::error::DeparseError;
use crate::model::Schema;
use crate::operation::{ColumnChange, Operation};

use ddl_writer::{
    write_column, write_column_comment, write_constraint, write_create_index, write_create_table,
    write_table_comment, InlineKeys,
};
use sql_helpers::{quote_ident, quote_table, render_default};

/// Render one operation as DDL.
///
/// `context` is the schema as it stands before the operation; it only
/// decides whether a column's key clauses are already covered by a table
/// constraint.
pub fn deparse(operation: &Operation, context: &Schema) -> Result<String, Vec<DeparseError>> {
    let kind = operation.kind();
    let sql = match operation {
        Operation::AddTable { table } => write_create_table(table)?,
        Operation::DropTable { table } => {
            require(kind, "table", table)?;
            format!("DROP TABLE {};", quote_table(table))
        }
        Operation::RenameTable { table, to } => {
            require(kind, "table", table)?;
            require(kind, "to", to)?;
            format!(
                "ALTER TABLE {} RENAME TO {};",
                quote_table(table),
                quote_ident(to)
            )
        }
        Operation::SetTableComment { table, comment } => {
            require(kind, "table", table)?;
            write_table_comment(table, comment.as_deref())
        }
        Operation::AddColumn { table, column } => {
            require(kind, "table", table)?;
            let existing = context.table(table);
            if let Some((key, key_columns)) = existing.and_then(|t| t.primary_key()) {
                if column.primary && !key_columns.contains(&column.name) {
                    return Err(vec![DeparseError::DuplicatePrimaryKey {
                        table: table.clone(),
                        column: column.name.clone(),
                        existing: key.clone(),
                    }]);
                }
            }
            let keys = InlineKeys::for_column(column, existing);
            let definition = write_column(column, keys, kind).map_err(|e| vec![e])?;
            let mut sql = format!(
                "ALTER TABLE {} ADD COLUMN {};",
                quote_table(table),
                definition
            );
            if let Some(comment) = &column.comment {
                sql.push_str("\n\n");
                sql.push_str(&write_column_comment(table, &column.name, Some(comment)));
            }
            sql
        }
        Operation::DropColumn { table, column } => {
            require(kind, "table", table)?;
            require(kind, "column", column)?;
            format!(
                "ALTER TABLE {} DROP COLUMN {};",
                quote_table(table),
                quote_ident(column)
            )
        }
        Operation::AlterColumn {
            table,
            column,
            change,
        } => {
            require(kind, "table", table)?;
            require(kind, "column", column)?;
            deparse_column_change(table, column, change).map_err(|e| vec![e])?
        }
        Operation::AddConstraint { table, constraint } => {
            require(kind, "table", table)?;
            let clause = write_constraint(table, constraint).map_err(|e| vec![e])?;
            format!("ALTER TABLE {} ADD {};", quote_table(table), clause)
        }
        Operation::DropConstraint { table, name } => {
            require(kind, "table", table)?;
            require(kind, "name", name)?;
            format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                quote_table(table),
                quote_ident(name)
            )
        }
        Operation::AddIndex { table, index } => {
            require(kind, "table", table)?;
            write_create_index(table, index, kind).map_err(|e| vec![e])?
        }
        Operation::DropIndex { table, name } => {
            require(kind, "name", name)?;
            // Indexes live in their table's schema
            let qualified = match table.rsplit_once('.') {
                Some((schema, _)) => format!("{}.{}", schema, name),
                None => name.clone(),
            };
            format!("DROP INDEX {};", quote_table(&qualified))
        }
        Operation::Malformed { kind, message } => {
            return Err(vec![DeparseError::MalformedOperation {
                kind: kind.clone(),
                message: message.clone(),
            }])
        }
        Operation::Unsupported => {
            return Err(vec![DeparseError::UnsupportedOperation {
                kind: kind.to_string(),
            }])
        }
    };

    Ok(sql)
}

fn deparse_column_change(
    table: &str,
    column: &str,
    change: &ColumnChange,
) -> Result<String, DeparseError> {
    let alter = format!(
        "ALTER TABLE {} ALTER COLUMN {}",
        quote_table(table),
        quote_ident(column)
    );

    let sql = match change {
        ColumnChange::Type { data_type } => {
            if data_type.trim().is_empty() {
                return Err(DeparseError::MissingField {
                    operation: "alter_column",
                    field: "change.type",
                });
            }
            format!("{} TYPE {};", alter, data_type)
        }
        ColumnChange::NotNull { value: true } => format!("{} SET NOT NULL;", alter),
        ColumnChange::NotNull { value: false } => format!("{} DROP NOT NULL;", alter),
        ColumnChange::Default { value: Some(value) } => {
            format!("{} SET DEFAULT {};", alter, render_default(value))
        }
        ColumnChange::Default { value: None } => format!("{} DROP DEFAULT;", alter),
        ColumnChange::Comment { value } => write_column_comment(table, column, value.as_deref()),
        ColumnChange::Rename { to } => {
            if to.trim().is_empty() {
                return Err(DeparseError::MissingField {
                    operation: "alter_column",
                    field: "change.to",
                });
            }
            format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                quote_table(table),
                quote_ident(column),
                quote_ident(to)
            )
        }
        ColumnChange::Check { .. } => {
            return Err(DeparseError::UnsupportedColumnChange {
                table: table.to_string(),
                column: column.to_string(),
                attribute: change.attribute(),
                reason: "PostgreSQL has no ALTER COLUMN form for an inline check; \
                         use add_constraint/drop_constraint"
                    .to_string(),
            })
        }
    };
    Ok(sql)
}

fn require(operation: &'static str, field: &'static str, value: &str) -> Result<(), Vec<DeparseError>> {
    if value.trim().is_empty() {
        Err(vec![DeparseError::MissingField { operation, field }])
    } else {
        Ok(())
    }
}
