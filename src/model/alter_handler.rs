//! ALTER TABLE, ALTER SEQUENCE, COMMENT ON and DROP handling
//!
//! Every ALTER TABLE first makes sure its target exists; a table that has not
//! been created yet becomes an empty placeholder that a later CREATE TABLE
//! merges into.

use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, CommentObject, Ident, ObjectName, ObjectType,
};

use super::builder::{renamed_table_name, statement_kind, SchemaBuilder};
use super::table_builder::{apply_default, column_from_def, normalize_data_type, table_constraint_draft};
use crate::parser::identifier_utils::{
    normalize_ident, object_name_parts, resolve_object_name, resolve_table_name, unqualified_name,
};
use crate::ParseOptions;

/// Apply the operations of one ALTER TABLE statement in order
pub(crate) fn apply_alter_table(
    builder: &mut SchemaBuilder<'_>,
    name: &ObjectName,
    operations: &[AlterTableOperation],
    options: &ParseOptions,
) {
    let mut table = resolve_object_name(name, options);
    builder.ensure_table(&table);

    for operation in operations {
        match operation {
            AlterTableOperation::AddColumn { column_def, .. } => {
                let spec = column_from_def(column_def, options);
                builder.add_column(&table, spec.column);
                for (declared, draft) in spec.constraints {
                    builder.add_draft(&table, declared, draft);
                }
            }
            AlterTableOperation::DropColumn { column_name, .. } => {
                let column = normalize_ident(column_name);
                if !builder.drop_column(&table, &column) {
                    builder.skip(
                        "ALTER TABLE DROP COLUMN".to_string(),
                        format!("column {}.{} not found", table, column),
                    );
                }
            }
            AlterTableOperation::AddConstraint(constraint) => {
                match table_constraint_draft(constraint, options) {
                    Some((declared, draft)) => builder.add_draft(&table, declared, draft),
                    None => builder.skip(
                        "ALTER TABLE ADD CONSTRAINT".to_string(),
                        format!("unsupported table constraint: {}", constraint),
                    ),
                }
            }
            AlterTableOperation::DropConstraint { name, .. } => {
                let constraint = normalize_ident(name);
                if !builder.drop_constraint(&table, &constraint) {
                    builder.skip(
                        "ALTER TABLE DROP CONSTRAINT".to_string(),
                        format!("constraint {} not found on {}", constraint, table),
                    );
                }
            }
            AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => {
                let from = normalize_ident(old_column_name);
                let to = normalize_ident(new_column_name);
                builder.rename_column(&table, &from, &to);
            }
            AlterTableOperation::RenameTable { table_name } => {
                let new_name = match table_name.0.as_slice() {
                    [bare] => renamed_table_name(&table, &normalize_ident(bare)),
                    _ => resolve_object_name(table_name, options),
                };
                if builder.rename_table(&table, &new_name) {
                    table = new_name;
                }
            }
            AlterTableOperation::AlterColumn { column_name, op } => {
                apply_alter_column(builder, &table, column_name, op);
            }
            other => builder.skip(
                format!("ALTER TABLE {}", statement_kind(other)),
                "unsupported ALTER TABLE operation".to_string(),
            ),
        }
    }
}

fn apply_alter_column(
    builder: &mut SchemaBuilder<'_>,
    table: &str,
    column_name: &Ident,
    op: &AlterColumnOperation,
) {
    let name = normalize_ident(column_name);
    let Some(column) = builder.column_mut(table, &name) else {
        builder.skip(
            "ALTER TABLE ALTER COLUMN".to_string(),
            format!("column {}.{} not found", table, name),
        );
        return;
    };

    match op {
        AlterColumnOperation::SetNotNull => column.not_null = true,
        AlterColumnOperation::DropNotNull => column.not_null = false,
        AlterColumnOperation::SetDefault { value } => apply_default(column, value),
        AlterColumnOperation::DropDefault => column.default = None,
        AlterColumnOperation::SetDataType { data_type, .. } => {
            let (normalized, increment) = normalize_data_type(data_type);
            column.data_type = normalized;
            if increment {
                column.increment = true;
            }
        }
        AlterColumnOperation::AddGenerated { .. } => {
            column.increment = true;
            column.default = None;
        }
    }
}

/// `ALTER SEQUENCE ... OWNED BY table.column` marks the column as sequence-backed
pub(crate) fn apply_sequence_owner(
    builder: &mut SchemaBuilder<'_>,
    owned_by: Option<&[String]>,
    options: &ParseOptions,
) {
    let Some((column, table_parts)) = owned_by.and_then(|parts| parts.split_last()) else {
        builder.skip(
            "ALTER SEQUENCE".to_string(),
            "no OWNED BY column".to_string(),
        );
        return;
    };

    let table = resolve_table_name(table_parts.to_vec(), options);
    if !builder.mark_increment(&table, column) {
        builder.skip(
            "ALTER SEQUENCE".to_string(),
            format!("owning column {}.{} not found", table, column),
        );
    }
}

/// COMMENT ON TABLE / COLUMN
pub(crate) fn apply_comment(
    builder: &mut SchemaBuilder<'_>,
    object_type: &CommentObject,
    object_name: &ObjectName,
    comment: Option<&str>,
    options: &ParseOptions,
) {
    let comment = comment.map(str::to_string);
    match object_type {
        CommentObject::Table => {
            let table = resolve_object_name(object_name, options);
            if !builder.set_table_comment(&table, comment) {
                builder.skip(
                    "COMMENT ON TABLE".to_string(),
                    format!("table {} not found", table),
                );
            }
        }
        CommentObject::Column => {
            let mut parts = object_name_parts(object_name);
            let column = parts.pop().unwrap_or_default();
            let table = resolve_table_name(parts, options);
            if !builder.set_column_comment(&table, &column, comment) {
                builder.skip(
                    "COMMENT ON COLUMN".to_string(),
                    format!("column {}.{} not found", table, column),
                );
            }
        }
        other => builder.skip(
            format!("COMMENT ON {}", other),
            "unsupported comment target".to_string(),
        ),
    }
}

/// DROP TABLE / DROP INDEX
pub(crate) fn apply_drop(
    builder: &mut SchemaBuilder<'_>,
    object_type: &ObjectType,
    names: &[ObjectName],
    options: &ParseOptions,
) {
    for name in names {
        match object_type {
            ObjectType::Table => {
                let table = resolve_object_name(name, options);
                if !builder.drop_table(&table) {
                    builder.skip("DROP TABLE".to_string(), format!("table {} not found", table));
                }
            }
            ObjectType::Index => {
                let index = unqualified_name(name);
                if !builder.drop_index(None, &index) {
                    builder.skip("DROP INDEX".to_string(), format!("index {} not found", index));
                }
            }
            other => builder.skip(format!("DROP {}", other), "unsupported object type".to_string()),
        }
    }
}
