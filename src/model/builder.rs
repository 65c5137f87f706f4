//! Build the schema model from parsed statements
//!
//! [`build_schema`] is a single linear fold over the statement list: each
//! statement is routed to the table, alter or index builder, which all mutate
//! the schema through one [`SchemaBuilder`]. Later statements observe the
//! state left by earlier ones, so the fold is never split across threads.

use std::collections::HashSet;

use serde::Serialize;
use sqlparser::ast::{ObjectType, Statement};
use tracing::{debug, warn};

use super::relationship::{finalize_cardinalities, remove_for_column, synthesize, ForeignKey};
use super::{
    alter_handler, index_builder, table_builder, Column, Constraint, Index, ReferenceAction,
    Schema, Table,
};
use crate::parser::{FallbackStatementType, ParsedStatement};
use crate::ParseOptions;

/// A statement (or part of one) that did not change the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStatement {
    /// Statement kind (e.g., "CreateFunction", "ALTER TABLE OwnerTo")
    pub kind: String,
    /// Why it was skipped
    pub reason: String,
    /// 1-based line of the statement in the input
    pub line: usize,
}

/// What happened during a build, for callers and tests to inspect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub skipped: Vec<SkippedStatement>,
    /// Tables created as placeholders because an ALTER reached them first
    pub placeholders: Vec<String>,
    /// Statements routed to a builder
    pub statements_processed: usize,
}

/// Result of parsing one document
#[derive(Debug, Clone, Serialize)]
pub struct ParsedSchema {
    pub schema: Schema,
    pub report: BuildReport,
}

/// A constraint as written in DDL, before it has a resolved name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConstraintDraft {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    Check(String),
    ForeignKey {
        column: String,
        target_table: String,
        /// None when the REFERENCES clause omits the column list
        target_column: Option<String>,
        on_update: ReferenceAction,
        on_delete: ReferenceAction,
    },
}

/// Build a schema model from parsed statements
pub fn build_schema(statements: &[ParsedStatement], options: &ParseOptions) -> ParsedSchema {
    let mut schema = Schema::new();
    let mut builder = SchemaBuilder::new(&mut schema);

    for parsed in statements {
        builder.set_line(parsed.start_line);

        if let Some(fallback) = &parsed.fallback_type {
            match fallback {
                FallbackStatementType::AlterSequence { owned_by, .. } => {
                    builder.processed();
                    alter_handler::apply_sequence_owner(&mut builder, owned_by.as_deref(), options);
                }
                FallbackStatementType::RawStatement { kind, message } => {
                    builder.skip(kind.clone(), format!("not parsed: {}", message));
                }
            }
            continue;
        }

        if let Some(statement) = &parsed.statement {
            dispatch_statement(&mut builder, statement, options);
        }
    }

    let report = builder.finish();
    ParsedSchema { schema, report }
}

fn dispatch_statement(builder: &mut SchemaBuilder<'_>, statement: &Statement, options: &ParseOptions) {
    debug!(line = builder.line, kind = %statement_kind(statement), "dispatching statement");
    match statement {
        Statement::CreateTable(create) => {
            builder.processed();
            table_builder::build_table(builder, create, options);
        }
        Statement::AlterTable {
            name, operations, ..
        } => {
            builder.processed();
            alter_handler::apply_alter_table(builder, name, operations, options);
        }
        Statement::CreateIndex(create) => {
            builder.processed();
            index_builder::build_index(builder, create, options);
        }
        Statement::Comment {
            object_type,
            object_name,
            comment,
            ..
        } => {
            builder.processed();
            alter_handler::apply_comment(builder, object_type, object_name, comment.as_deref(), options);
        }
        Statement::Drop {
            object_type: object_type @ (ObjectType::Table | ObjectType::Index),
            names,
            ..
        } => {
            builder.processed();
            alter_handler::apply_drop(builder, object_type, names, options);
        }
        other => {
            builder.skip(statement_kind(other), "no schema-relevant meaning".to_string());
        }
    }
}

/// Variant name of a statement (e.g., "CreateFunction")
pub(crate) fn statement_kind<T: std::fmt::Debug>(node: &T) -> String {
    let debug = format!("{:?}", node);
    debug
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Name of a table without its schema qualifier (`audit.users` -> `users`)
pub(crate) fn short_table_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// Apply a bare new table name while keeping the current schema qualifier
pub(crate) fn renamed_table_name(current: &str, new_name: &str) -> String {
    match current.rsplit_once('.') {
        Some((schema, _)) if !new_name.contains('.') => format!("{}.{}", schema, new_name),
        _ => new_name.to_string(),
    }
}

/// Mutable access to the schema being built.
///
/// Parsing and operation application both go through this type so that the
/// same DDL and the same operation produce the same schema.
pub struct SchemaBuilder<'a> {
    schema: &'a mut Schema,
    report: BuildReport,
    line: usize,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(schema: &'a mut Schema) -> Self {
        Self {
            schema,
            report: BuildReport::default(),
            line: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub(crate) fn processed(&mut self) {
        self.report.statements_processed += 1;
    }

    /// Record a skipped statement or clause
    pub(crate) fn skip(&mut self, kind: String, reason: String) {
        debug!(line = self.line, kind = %kind, reason = %reason, "skipped statement");
        self.report.skipped.push(SkippedStatement {
            kind,
            reason,
            line: self.line,
        });
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Get a table, creating an empty placeholder if it does not exist yet
    pub fn ensure_table(&mut self, name: &str) -> &mut Table {
        if !self.schema.tables.contains_key(name) {
            warn!(table = %name, line = self.line, "table referenced before creation, adding placeholder");
            self.report.placeholders.push(name.to_string());
        }
        self.schema
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name))
    }

    /// Insert a created table, merging it into a placeholder of the same name.
    ///
    /// The created table's columns come first, followed by columns that only
    /// earlier ALTER statements added. Every constraint goes through
    /// [`Self::add_constraint`].
    pub fn insert_table(&mut self, table: Table) {
        let Table {
            name,
            mut columns,
            comment,
            indexes,
            constraints,
        } = table;
        columns.values_mut().for_each(clear_sequence_default);

        match self.schema.tables.get_mut(&name) {
            Some(existing) => {
                debug!(table = %name, "merging table into existing entry");
                let mut merged = columns;
                for (column_name, column) in std::mem::take(&mut existing.columns) {
                    merged.entry(column_name).or_insert(column);
                }
                existing.columns = merged;
                if comment.is_some() {
                    existing.comment = comment;
                }
                existing.indexes.extend(indexes);
            }
            None => {
                self.schema.tables.insert(
                    name.clone(),
                    Table {
                        name: name.clone(),
                        columns,
                        comment,
                        indexes,
                        constraints: Default::default(),
                    },
                );
            }
        }

        for (_, constraint) in constraints {
            self.add_constraint(&name, constraint, true);
        }
        self.apply_column_flags(&name);
    }

    /// Drop a table along with relationships and foreign keys that touch it
    pub fn drop_table(&mut self, name: &str) -> bool {
        if self.schema.tables.shift_remove(name).is_none() {
            return false;
        }
        self.schema
            .relationships
            .retain(|_, r| r.primary_table != name && r.foreign_table != name);
        for table in self.schema.tables.values_mut() {
            table.constraints.retain(|_, c| {
                !matches!(c, Constraint::ForeignKey { target_table, .. } if target_table == name)
            });
        }
        true
    }

    /// Rename a table, rewriting every reference to it.
    ///
    /// A missing source or an existing target is recorded as a skip.
    pub fn rename_table(&mut self, from: &str, to: &str) -> bool {
        if !self.schema.tables.contains_key(from) {
            self.skip(
                "ALTER TABLE RENAME".to_string(),
                format!("table {} not found", from),
            );
            return false;
        }
        if from == to {
            return true;
        }
        if self.schema.tables.contains_key(to) {
            self.skip(
                "ALTER TABLE RENAME".to_string(),
                format!("cannot rename {} to {}: table already exists", from, to),
            );
            return false;
        }

        let tables = std::mem::take(&mut self.schema.tables);
        self.schema.tables = tables
            .into_iter()
            .map(|(key, mut table)| {
                if key == from {
                    table.name = to.to_string();
                    (to.to_string(), table)
                } else {
                    (key, table)
                }
            })
            .collect();

        for table in self.schema.tables.values_mut() {
            for constraint in table.constraints.values_mut() {
                if let Constraint::ForeignKey { target_table, .. } = constraint {
                    if target_table == from {
                        *target_table = to.to_string();
                    }
                }
            }
        }
        for relationship in self.schema.relationships.values_mut() {
            if relationship.primary_table == from {
                relationship.primary_table = to.to_string();
            }
            if relationship.foreign_table == from {
                relationship.foreign_table = to.to_string();
            }
        }
        true
    }

    pub fn set_table_comment(&mut self, table: &str, comment: Option<String>) -> bool {
        match self.schema.tables.get_mut(table) {
            Some(t) => {
                t.comment = comment;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn column_mut(&mut self, table: &str, column: &str) -> Option<&mut Column> {
        self.schema.tables.get_mut(table)?.columns.get_mut(column)
    }

    /// Append a column (or replace one with the same name in place)
    pub fn add_column(&mut self, table: &str, mut column: Column) {
        clear_sequence_default(&mut column);
        let t = self.ensure_table(table);
        t.columns.insert(column.name.clone(), column);
        self.apply_column_flags(table);
    }

    /// Drop a column and everything that depends on it
    pub fn drop_column(&mut self, table: &str, column: &str) -> bool {
        let Some(t) = self.schema.tables.get_mut(table) else {
            return false;
        };
        if t.columns.shift_remove(column).is_none() {
            return false;
        }

        t.constraints.retain(|_, c| match c {
            Constraint::PrimaryKey { columns, .. } | Constraint::Unique { columns, .. } => {
                !columns.iter().any(|c| c == column)
            }
            Constraint::ForeignKey { column: fk_column, .. } => fk_column != column,
            Constraint::Check { .. } => true,
        });
        t.indexes
            .retain(|_, index| !index.columns.iter().any(|c| c == column));

        self.schema.relationships.retain(|_, r| {
            !(r.foreign_table == table && r.foreign_column == column)
                && !(r.primary_table == table && r.primary_column == column)
        });
        true
    }

    /// Rename a column in place, rewriting constraints, indexes and relationships.
    ///
    /// A missing source or an existing target is recorded as a skip.
    pub fn rename_column(&mut self, table: &str, from: &str, to: &str) -> bool {
        let conflict = match self.schema.tables.get(table) {
            Some(t) if !t.columns.contains_key(from) => {
                Some(format!("column {}.{} not found", table, from))
            }
            Some(t) if from != to && t.columns.contains_key(to) => Some(format!(
                "cannot rename {}.{} to {}: column already exists",
                table, from, to
            )),
            Some(_) => None,
            None => Some(format!("table {} not found", table)),
        };
        if let Some(reason) = conflict {
            self.skip("ALTER TABLE RENAME COLUMN".to_string(), reason);
            return false;
        }
        let Some(t) = self.schema.tables.get_mut(table) else {
            return false;
        };

        let rename = |name: &mut String| {
            if name.as_str() == from {
                *name = to.to_string();
            }
        };

        let columns = std::mem::take(&mut t.columns);
        t.columns = columns
            .into_iter()
            .map(|(key, mut column)| {
                if key == from {
                    column.name = to.to_string();
                    (to.to_string(), column)
                } else {
                    (key, column)
                }
            })
            .collect();

        for constraint in t.constraints.values_mut() {
            match constraint {
                Constraint::PrimaryKey { columns, .. } | Constraint::Unique { columns, .. } => {
                    columns.iter_mut().for_each(rename);
                }
                Constraint::ForeignKey { column, .. } => rename(column),
                Constraint::Check { .. } => {}
            }
        }
        for index in t.indexes.values_mut() {
            index.columns.iter_mut().for_each(rename);
        }

        for other in self.schema.tables.values_mut() {
            for constraint in other.constraints.values_mut() {
                if let Constraint::ForeignKey {
                    target_table,
                    target_column,
                    ..
                } = constraint
                {
                    if target_table == table {
                        rename(target_column);
                    }
                }
            }
        }
        for r in self.schema.relationships.values_mut() {
            if r.foreign_table == table {
                rename(&mut r.foreign_column);
            }
            if r.primary_table == table {
                rename(&mut r.primary_column);
            }
        }
        true
    }

    pub fn set_column_comment(&mut self, table: &str, column: &str, comment: Option<String>) -> bool {
        match self.column_mut(table, column) {
            Some(c) => {
                c.comment = comment;
                true
            }
            None => false,
        }
    }

    /// Mark a column as sequence-backed; any literal default no longer applies
    pub fn mark_increment(&mut self, table: &str, column: &str) -> bool {
        match self.column_mut(table, column) {
            Some(c) => {
                c.increment = true;
                c.default = None;
                true
            }
            None => false,
        }
    }

    /// Turn `primary`/`unique` column flags that no constraint covers into
    /// constraints, named the way PostgreSQL names inline ones.
    fn apply_column_flags(&mut self, table: &str) {
        let Some(t) = self.schema.tables.get(table) else {
            return;
        };

        let covered_primary: HashSet<&str> = t
            .primary_key()
            .map(|(_, cols)| cols.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let uncovered_primary: Vec<String> = t
            .columns
            .values()
            .filter(|c| c.primary && !covered_primary.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();
        let uncovered_unique: Vec<String> = t
            .columns
            .values()
            .filter(|c| c.unique && !t.has_unique_constraint(&c.name))
            .map(|c| c.name.clone())
            .collect();

        if !uncovered_primary.is_empty() {
            self.add_draft(table, None, ConstraintDraft::PrimaryKey(uncovered_primary));
        }
        for column in uncovered_unique {
            self.add_draft(table, None, ConstraintDraft::Unique(vec![column]));
        }
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Name a constraint draft and add it to a table.
    ///
    /// Unnamed constraints get PostgreSQL's default names (`users_pkey`,
    /// `users_email_key`, `posts_user_id_fkey`, `users_check`).
    pub(crate) fn add_draft(&mut self, table: &str, declared: Option<String>, draft: ConstraintDraft) {
        let is_declared = declared.is_some();
        let short = short_table_name(table);

        let constraint = match draft {
            ConstraintDraft::PrimaryKey(columns) => Constraint::PrimaryKey {
                name: declared.unwrap_or_else(|| format!("{}_pkey", short)),
                columns,
            },
            ConstraintDraft::Unique(columns) => {
                let candidate = Constraint::Unique {
                    name: String::new(),
                    columns: columns.clone(),
                };
                let name = declared.unwrap_or_else(|| {
                    self.free_constraint_name(
                        table,
                        &format!("{}_{}_key", short, columns.join("_")),
                        &candidate,
                    )
                });
                Constraint::Unique { name, columns }
            }
            ConstraintDraft::Check(expression) => {
                let candidate = Constraint::Check {
                    name: String::new(),
                    expression: expression.clone(),
                };
                let name = declared.unwrap_or_else(|| {
                    self.free_constraint_name(table, &format!("{}_check", short), &candidate)
                });
                Constraint::Check { name, expression }
            }
            ConstraintDraft::ForeignKey {
                column,
                target_table,
                target_column,
                on_update,
                on_delete,
            } => {
                let target_column =
                    target_column.unwrap_or_else(|| self.referenced_key_column(&target_table));
                let candidate = Constraint::ForeignKey {
                    name: String::new(),
                    column: column.clone(),
                    target_table: target_table.clone(),
                    target_column: target_column.clone(),
                    on_update,
                    on_delete,
                };
                let name = declared.unwrap_or_else(|| {
                    self.free_constraint_name(table, &format!("{}_{}_fkey", short, column), &candidate)
                });
                Constraint::ForeignKey {
                    name,
                    column,
                    target_table,
                    target_column,
                    on_update,
                    on_delete,
                }
            }
        };

        self.add_constraint(table, constraint, is_declared);
    }

    /// Add a named constraint to a table.
    ///
    /// A primary key replaces any other primary key on the table. Foreign keys
    /// are handed to the relationship synthesizer; `declared` decides whether
    /// the relationship takes the constraint's name.
    pub fn add_constraint(&mut self, table: &str, constraint: Constraint, declared: bool) {
        let name = constraint.name().to_string();
        let t = self.ensure_table(table);

        match &constraint {
            Constraint::PrimaryKey { columns, .. } => {
                t.constraints
                    .retain(|n, c| n == &name || !matches!(c, Constraint::PrimaryKey { .. }));
                for column in columns {
                    if let Some(c) = t.columns.get_mut(column) {
                        c.primary = true;
                        c.not_null = true;
                    }
                }
            }
            Constraint::Unique { columns, .. } if columns.len() == 1 => {
                if let Some(c) = t.columns.get_mut(&columns[0]) {
                    c.unique = true;
                }
            }
            _ => {}
        }

        let foreign_key = match &constraint {
            Constraint::ForeignKey {
                column,
                target_table,
                target_column,
                on_update,
                on_delete,
                ..
            } => Some(ForeignKey {
                name: declared.then(|| name.clone()),
                table: table.to_string(),
                column: column.clone(),
                target_table: target_table.clone(),
                target_column: target_column.clone(),
                on_update: *on_update,
                on_delete: *on_delete,
            }),
            _ => None,
        };

        t.constraints.insert(name, constraint);

        if let Some(fk) = foreign_key {
            synthesize(&fk, self.schema);
        }
    }

    /// Drop a constraint by name.
    ///
    /// Inline column checks have no entry in the constraint map; their
    /// PostgreSQL default name (`<table>_<column>_check`) still drops them.
    pub fn drop_constraint(&mut self, table: &str, name: &str) -> bool {
        let Some(t) = self.schema.tables.get_mut(table) else {
            return false;
        };

        match t.constraints.shift_remove(name) {
            Some(Constraint::ForeignKey { column, .. }) => {
                remove_for_column(self.schema, table, &column);
                true
            }
            Some(Constraint::PrimaryKey { columns, .. }) => {
                for column in &columns {
                    if let Some(c) = t.columns.get_mut(column) {
                        c.primary = false;
                    }
                }
                true
            }
            Some(Constraint::Unique { columns, .. }) => {
                if let [column] = columns.as_slice() {
                    if let Some(c) = t.columns.get_mut(column) {
                        c.unique = false;
                    }
                }
                true
            }
            Some(Constraint::Check { .. }) => true,
            None => {
                let short = short_table_name(table);
                match t
                    .columns
                    .values_mut()
                    .find(|c| c.check.is_some() && format!("{}_{}_check", short, c.name) == name)
                {
                    Some(column) => {
                        column.check = None;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Column a REFERENCES clause without a column list points at
    fn referenced_key_column(&self, target_table: &str) -> String {
        self.schema
            .tables
            .get(target_table)
            .and_then(|t| t.primary_key())
            .and_then(|(_, columns)| columns.first().cloned())
            .unwrap_or_else(|| "id".to_string())
    }

    /// `base`, or `base` with a numeric suffix if a different constraint holds it
    fn free_constraint_name(&self, table: &str, base: &str, candidate: &Constraint) -> String {
        let Some(t) = self.schema.tables.get(table) else {
            return base.to_string();
        };
        let is_free = |name: &str| match t.constraints.get(name) {
            None => true,
            Some(existing) => same_shape(existing, candidate),
        };
        if is_free(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}{}", base, n))
            .find(|name| is_free(name))
            .unwrap_or_else(|| base.to_string())
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    pub fn add_index(&mut self, table: &str, index: Index) {
        let t = self.ensure_table(table);
        t.indexes.insert(index.name.clone(), index);
    }

    /// Drop an index by name, searching every table when none is given
    pub fn drop_index(&mut self, table: Option<&str>, name: &str) -> bool {
        match table {
            Some(table) => self
                .schema
                .tables
                .get_mut(table)
                .is_some_and(|t| t.indexes.shift_remove(name).is_some()),
            None => self
                .schema
                .tables
                .values_mut()
                .any(|t| t.indexes.shift_remove(name).is_some()),
        }
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Re-derive column markers from the final constraints and recompute
    /// relationship cardinalities.
    pub fn finish(self) -> BuildReport {
        for table in self.schema.tables.values_mut() {
            derive_column_flags(table);
        }
        finalize_cardinalities(self.schema);
        self.report
    }
}

/// Sequence-backed columns carry no literal default
fn clear_sequence_default(column: &mut Column) {
    if column.increment {
        column.default = None;
    }
}

/// Two constraints that differ only by name
fn same_shape(a: &Constraint, b: &Constraint) -> bool {
    match (a, b) {
        (Constraint::PrimaryKey { columns: x, .. }, Constraint::PrimaryKey { columns: y, .. })
        | (Constraint::Unique { columns: x, .. }, Constraint::Unique { columns: y, .. }) => x == y,
        (Constraint::Check { expression: x, .. }, Constraint::Check { expression: y, .. }) => x == y,
        (
            Constraint::ForeignKey {
                column: c1,
                target_table: t1,
                target_column: tc1,
                ..
            },
            Constraint::ForeignKey {
                column: c2,
                target_table: t2,
                target_column: tc2,
                ..
            },
        ) => c1 == c2 && t1 == t2 && tc1 == tc2,
        _ => false,
    }
}

fn derive_column_flags(table: &mut Table) {
    let mut primary: HashSet<String> = HashSet::new();
    let mut unique: HashSet<String> = HashSet::new();
    for constraint in table.constraints.values() {
        match constraint {
            Constraint::PrimaryKey { columns, .. } => primary.extend(columns.iter().cloned()),
            Constraint::Unique { columns, .. } if columns.len() == 1 => {
                unique.insert(columns[0].clone());
            }
            _ => {}
        }
    }

    for column in table.columns.values_mut() {
        column.primary = primary.contains(&column.name);
        column.unique = unique.contains(&column.name);
        if column.primary {
            column.not_null = true;
        }
    }
}
