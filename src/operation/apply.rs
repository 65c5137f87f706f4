//! Apply operations directly to a schema model
//!
//! Uses the same [`SchemaBuilder`] paths as DDL parsing, so applying an
//! operation and parsing its rendered DDL land on the same schema.

use tracing::debug;

use super::{ColumnChange, Operation};
use crate::model::{
    normalize_default, normalize_type_name, renamed_table_name, Column, Schema, SchemaBuilder,
};

/// Apply one operation to a schema.
///
/// Never fails: an operation whose target is missing leaves the schema
/// unchanged, except that column and constraint additions create a
/// placeholder table the way an out-of-order ALTER does.
pub fn apply_operation(schema: &mut Schema, operation: &Operation) {
    let mut builder = SchemaBuilder::new(schema);

    let applied = match operation {
        Operation::AddTable { table } => {
            let mut table = table.clone();
            table.columns.values_mut().for_each(normalize_column);
            builder.insert_table(table);
            true
        }
        Operation::DropTable { table } => builder.drop_table(table),
        Operation::RenameTable { table, to } => {
            builder.rename_table(table, &renamed_table_name(table, to))
        }
        Operation::SetTableComment { table, comment } => {
            builder.set_table_comment(table, comment.clone())
        }
        Operation::AddColumn { table, column } => {
            let mut column = column.clone();
            normalize_column(&mut column);
            builder.add_column(table, column);
            true
        }
        Operation::DropColumn { table, column } => builder.drop_column(table, column),
        Operation::AlterColumn {
            table,
            column,
            change,
        } => apply_column_change(&mut builder, table, column, change),
        Operation::AddConstraint { table, constraint } => {
            builder.add_constraint(table, constraint.clone(), true);
            true
        }
        Operation::DropConstraint { table, name } => builder.drop_constraint(table, name),
        Operation::AddIndex { table, index } => {
            builder.add_index(table, index.clone());
            true
        }
        Operation::DropIndex { table, name } => builder.drop_index(Some(table), name),
        Operation::Malformed { .. } | Operation::Unsupported => false,
    };

    if !applied {
        debug!(kind = operation.kind(), "operation left the schema unchanged");
    }
    builder.finish();
}

fn apply_column_change(
    builder: &mut SchemaBuilder<'_>,
    table: &str,
    column: &str,
    change: &ColumnChange,
) -> bool {
    if let ColumnChange::Rename { to } = change {
        return builder.rename_column(table, column, to);
    }

    let Some(target) = builder.column_mut(table, column) else {
        return false;
    };
    match change {
        ColumnChange::Type { data_type } => {
            let (normalized, increment) = normalize_type_name(data_type);
            target.data_type = normalized;
            if increment {
                target.increment = true;
            }
        }
        ColumnChange::NotNull { value } => target.not_null = *value,
        ColumnChange::Default { value } => {
            target.default = value.clone();
            normalize_default(target);
        }
        ColumnChange::Comment { value } => target.comment = value.clone(),
        ColumnChange::Check { value } => target.check = value.clone(),
        ColumnChange::Rename { .. } => {}
    }
    true
}

/// Normalize an incoming column's type and default the way the table builder would
fn normalize_column(column: &mut Column) {
    let (normalized, increment) = normalize_type_name(&column.data_type);
    column.data_type = normalized;
    if increment {
        column.increment = true;
    }
    normalize_default(column);
}
