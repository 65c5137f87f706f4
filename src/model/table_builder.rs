//! CREATE TABLE handling and column normalization
//!
//! Column definitions are normalized the same way whether they come from
//! CREATE TABLE or ALTER TABLE ... ADD COLUMN:
//!
//! - `varchar(n)` / `character varying(n)` lose their length (`varchar`)
//! - `numeric(p,s)`, `timestamp(n)` and friends keep their modifiers
//! - `serial` types become their integer type with `increment = true`
//! - literal defaults keep their JSON type; `nextval(...)` means `increment`

use sqlparser::ast::{
    ColumnDef, ColumnOption, CreateTable, DataType, Expr, Function, ReferentialAction,
    TableConstraint, UnaryOperator, Value,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::builder::{ConstraintDraft, SchemaBuilder};
use super::{Column, ColumnDefault, ReferenceAction, Table};
use crate::parser::identifier_utils::{normalize_ident, resolve_object_name};
use crate::ParseOptions;

/// A column plus the constraints declared inline on it
#[derive(Debug, Clone)]
pub(crate) struct ColumnSpec {
    pub column: Column,
    pub constraints: Vec<(Option<String>, ConstraintDraft)>,
}

/// How a DEFAULT expression lands in the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Literal(ColumnDefault),
    Null,
    /// `nextval(...)`: the column is sequence-backed
    Sequence,
}

/// Build a table from CREATE TABLE and hand it to the schema builder
pub(crate) fn build_table(builder: &mut SchemaBuilder<'_>, create: &CreateTable, options: &ParseOptions) {
    let name = resolve_object_name(&create.name, options);
    let mut table = Table::new(name.clone());
    let mut drafts = Vec::new();

    for def in &create.columns {
        let spec = column_from_def(def, options);
        drafts.extend(spec.constraints);
        table.columns.insert(spec.column.name.clone(), spec.column);
    }

    for constraint in &create.constraints {
        match table_constraint_draft(constraint, options) {
            Some(draft) => drafts.push(draft),
            None => builder.skip(
                "CREATE TABLE constraint".to_string(),
                format!("unsupported table constraint: {}", constraint),
            ),
        }
    }

    builder.insert_table(table);
    for (declared, draft) in drafts {
        builder.add_draft(&name, declared, draft);
    }
}

/// Convert a column definition into a model column and its inline constraints
pub(crate) fn column_from_def(def: &ColumnDef, options: &ParseOptions) -> ColumnSpec {
    let (data_type, increment) = normalize_data_type(&def.data_type);
    let mut column = Column::new(normalize_ident(&def.name), data_type);
    column.increment = increment;
    let mut constraints = Vec::new();

    for option_def in &def.options {
        let declared = option_def.name.as_ref().map(normalize_ident);
        match &option_def.option {
            ColumnOption::NotNull => column.not_null = true,
            ColumnOption::Null => column.not_null = false,
            ColumnOption::Default(expr) => apply_default(&mut column, expr),
            ColumnOption::Check(expr) => column.check = Some(expr.to_string()),
            ColumnOption::Comment(text) => column.comment = Some(text.clone()),
            ColumnOption::Unique { is_primary, .. } => {
                let columns = vec![column.name.clone()];
                if *is_primary {
                    column.not_null = true;
                    constraints.push((declared, ConstraintDraft::PrimaryKey(columns)));
                } else {
                    constraints.push((declared, ConstraintDraft::Unique(columns)));
                }
            }
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                on_delete,
                on_update,
                ..
            } => {
                constraints.push((
                    declared,
                    ConstraintDraft::ForeignKey {
                        column: column.name.clone(),
                        target_table: resolve_object_name(foreign_table, options),
                        target_column: referred_columns.first().map(normalize_ident),
                        on_update: reference_action(on_update.as_ref()),
                        on_delete: reference_action(on_delete.as_ref()),
                    },
                ));
            }
            // GENERATED ... AS IDENTITY; a generation expression is a computed column
            ColumnOption::Generated {
                generation_expr: None,
                ..
            }
            | ColumnOption::Identity(_) => {
                column.increment = true;
                column.default = None;
            }
            _ => {}
        }
    }

    ColumnSpec {
        column,
        constraints,
    }
}

/// Convert a table-level constraint into a draft.
///
/// Composite foreign keys are reduced to their first column pair. Returns
/// None for constraint kinds the model has no place for.
pub(crate) fn table_constraint_draft(
    constraint: &TableConstraint,
    options: &ParseOptions,
) -> Option<(Option<String>, ConstraintDraft)> {
    match constraint {
        TableConstraint::PrimaryKey { name, columns, .. } => Some((
            name.as_ref().map(normalize_ident),
            ConstraintDraft::PrimaryKey(columns.iter().map(normalize_ident).collect()),
        )),
        TableConstraint::Unique { name, columns, .. } => Some((
            name.as_ref().map(normalize_ident),
            ConstraintDraft::Unique(columns.iter().map(normalize_ident).collect()),
        )),
        TableConstraint::Check { name, expr } => Some((
            name.as_ref().map(normalize_ident),
            ConstraintDraft::Check(expr.to_string()),
        )),
        TableConstraint::ForeignKey {
            name,
            columns,
            foreign_table,
            referred_columns,
            on_delete,
            on_update,
            ..
        } => {
            let column = columns.first().map(normalize_ident)?;
            Some((
                name.as_ref().map(normalize_ident),
                ConstraintDraft::ForeignKey {
                    column,
                    target_table: resolve_object_name(foreign_table, options),
                    target_column: referred_columns.first().map(normalize_ident),
                    on_update: reference_action(on_update.as_ref()),
                    on_delete: reference_action(on_delete.as_ref()),
                },
            ))
        }
        _ => None,
    }
}

pub(crate) fn reference_action(action: Option<&ReferentialAction>) -> ReferenceAction {
    match action {
        Some(ReferentialAction::Cascade) => ReferenceAction::Cascade,
        Some(ReferentialAction::Restrict) => ReferenceAction::Restrict,
        Some(ReferentialAction::SetNull) => ReferenceAction::SetNull,
        Some(ReferentialAction::SetDefault) => ReferenceAction::SetDefault,
        Some(ReferentialAction::NoAction) | None => ReferenceAction::NoAction,
    }
}

/// Apply a DEFAULT expression to a column
pub(crate) fn apply_default(column: &mut Column, expr: &Expr) {
    match classify_default(expr) {
        DefaultValue::Literal(value) => column.default = Some(value),
        DefaultValue::Null => column.default = None,
        DefaultValue::Sequence => {
            column.increment = true;
            column.default = None;
        }
    }
}

/// Reclassify an expression default that arrived as text (e.g., from an
/// operation), so `nextval(...)` lands as `increment` just as in DDL.
///
/// Text that does not parse as an expression is kept as is.
pub(crate) fn normalize_default(column: &mut Column) {
    let Some(ColumnDefault::Expression(expression)) = &column.default else {
        return;
    };
    let text = expression.expression.clone();
    let parsed = Parser::new(&PostgreSqlDialect {})
        .try_with_sql(&text)
        .and_then(|mut parser| parser.parse_expr());
    if let Ok(expr) = parsed {
        apply_default(column, &expr);
    }
}

/// Classify a DEFAULT expression.
///
/// Casts around a literal are unwrapped (`'active'::character varying` is the
/// text `active`). Anything that is not a plain literal is kept as expression
/// text.
pub fn classify_default(expr: &Expr) -> DefaultValue {
    match expr {
        Expr::Nested(inner) => classify_default(inner),
        Expr::Cast { expr: inner, .. } if is_literal(inner) => classify_default(inner),
        Expr::Value(value) => classify_value(value),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match inner.as_ref() {
            Expr::Value(Value::Number(n, _)) => DefaultValue::Literal(
                numeric_default(&format!("-{}", n))
                    .unwrap_or_else(|| ColumnDefault::expression(expr.to_string())),
            ),
            _ => DefaultValue::Literal(ColumnDefault::expression(expr.to_string())),
        },
        Expr::Function(function) if is_nextval(function) => DefaultValue::Sequence,
        other => DefaultValue::Literal(ColumnDefault::expression(other.to_string())),
    }
}

fn classify_value(value: &Value) -> DefaultValue {
    match value {
        Value::SingleQuotedString(s) | Value::EscapedStringLiteral(s) => {
            DefaultValue::Literal(ColumnDefault::Text(s.clone()))
        }
        Value::DollarQuotedString(s) => DefaultValue::Literal(ColumnDefault::Text(s.value.clone())),
        Value::Number(n, _) => DefaultValue::Literal(
            numeric_default(n).unwrap_or_else(|| ColumnDefault::expression(n.clone())),
        ),
        Value::Boolean(b) => DefaultValue::Literal(ColumnDefault::Boolean(*b)),
        Value::Null => DefaultValue::Null,
        other => DefaultValue::Literal(ColumnDefault::expression(other.to_string())),
    }
}

/// Integers stay integers; other numerals keep their JSON number form
fn numeric_default(text: &str) -> Option<ColumnDefault> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(ColumnDefault::Integer(i));
    }
    text.parse::<serde_json::Number>()
        .ok()
        .map(ColumnDefault::Number)
}

fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Value(_) => true,
        Expr::Nested(inner) | Expr::Cast { expr: inner, .. } => is_literal(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => matches!(inner.as_ref(), Expr::Value(Value::Number(..))),
        _ => false,
    }
}

fn is_nextval(function: &Function) -> bool {
    function
        .name
        .0
        .last()
        .is_some_and(|part| part.value.eq_ignore_ascii_case("nextval"))
}

/// Normalize a column type; the flag is true for serial types
pub fn normalize_data_type(data_type: &DataType) -> (String, bool) {
    normalize_type_name(&data_type.to_string())
}

/// Normalize a type name as written (e.g., "CHARACTER VARYING(255)").
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_type_name("VARCHAR(255)"), ("varchar".to_string(), false));
/// assert_eq!(normalize_type_name("bigserial"), ("bigint".to_string(), true));
/// assert_eq!(normalize_type_name("NUMERIC(10,2)"), ("numeric(10,2)".to_string(), false));
/// ```
pub fn normalize_type_name(raw: &str) -> (String, bool) {
    let lowered = raw.trim().to_lowercase();
    let unprefixed = lowered.strip_prefix("pg_catalog.").unwrap_or(&lowered);

    let (base, array_suffix) = match unprefixed.find('[') {
        Some(i) => (unprefixed[..i].trim_end(), &unprefixed[i..]),
        None => (unprefixed, ""),
    };

    let (base, increment) = match base {
        "serial" | "serial4" => ("integer", true),
        "bigserial" | "serial8" => ("bigint", true),
        "smallserial" | "serial2" => ("smallint", true),
        other if is_variable_text(other) => ("varchar", false),
        other => (other, false),
    };

    (format!("{}{}", base, array_suffix), increment)
}

fn is_variable_text(base: &str) -> bool {
    ["varchar", "character varying", "char varying"]
        .iter()
        .any(|prefix| match base.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.trim_start().starts_with('('),
            None => false,
        })
}
