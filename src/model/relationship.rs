//! Relationship synthesis from foreign key constraints
//!
//! Every foreign key discovered while building the schema, whether inline
//! `REFERENCES`, table-level `FOREIGN KEY` or `ALTER TABLE ... ADD CONSTRAINT`,
//! goes through [`synthesize`]. Relationships are keyed by their foreign side:
//! a given `(foreign_table, foreign_column)` pair owns exactly one entry no
//! matter how often its constraint is seen.

use tracing::debug;

use super::{Cardinality, ReferenceAction, Relationship, Schema};

/// A foreign key as seen by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Declared constraint name, if the DDL named it
    pub name: Option<String>,
    /// Table holding the foreign key column
    pub table: String,
    pub column: String,
    /// Referenced table and column
    pub target_table: String,
    pub target_column: String,
    pub on_update: ReferenceAction,
    pub on_delete: ReferenceAction,
}

/// Deterministic relationship name for an unnamed foreign key
pub fn default_relationship_name(fk: &ForeignKey) -> String {
    format!(
        "{}_{}_to_{}_{}",
        fk.table, fk.column, fk.target_table, fk.target_column
    )
}

/// Cardinality of a relationship whose foreign key lives on `table.column`.
///
/// One-to-one iff the referencing column is itself unique or part of the
/// primary key; what the referenced side looks like does not matter.
pub fn cardinality_for(schema: &Schema, table: &str, column: &str) -> Cardinality {
    match schema.column(table, column) {
        Some(c) if c.unique || c.primary => Cardinality::OneToOne,
        _ => Cardinality::OneToMany,
    }
}

/// Record the relationship for a foreign key, returning its name.
///
/// Re-synthesizing the same `(table, column)` pair replaces the earlier entry
/// in place, so repeated or out-of-order processing never duplicates it.
pub fn synthesize(fk: &ForeignKey, schema: &mut Schema) -> String {
    let base_name = fk
        .name
        .clone()
        .unwrap_or_else(|| default_relationship_name(fk));

    let existing = schema
        .relationships
        .iter()
        .position(|(_, r)| r.foreign_table == fk.table && r.foreign_column == fk.column);

    // Drop the previous entry first so its name is free for reuse
    let position = existing.map(|index| {
        schema.relationships.shift_remove_index(index);
        index
    });

    let name = available_name(schema, &base_name);
    let relationship = Relationship {
        name: name.clone(),
        primary_table: fk.target_table.clone(),
        primary_column: fk.target_column.clone(),
        foreign_table: fk.table.clone(),
        foreign_column: fk.column.clone(),
        cardinality: cardinality_for(schema, &fk.table, &fk.column),
        on_update: fk.on_update,
        on_delete: fk.on_delete,
    };

    debug!(
        name = %name,
        foreign = %format!("{}.{}", fk.table, fk.column),
        primary = %format!("{}.{}", fk.target_table, fk.target_column),
        "synthesized relationship"
    );

    match position {
        Some(index) if index <= schema.relationships.len() => {
            schema
                .relationships
                .shift_insert(index, name.clone(), relationship);
        }
        _ => {
            schema.relationships.insert(name.clone(), relationship);
        }
    }
    name
}

/// Remove the relationship owned by `(table, column)`, if any
pub fn remove_for_column(schema: &mut Schema, table: &str, column: &str) {
    schema
        .relationships
        .retain(|_, r| !(r.foreign_table == table && r.foreign_column == column));
}

/// Recompute every cardinality against the final column markers.
///
/// A UNIQUE or PRIMARY KEY added after the foreign key (pg_dump adds all
/// constraints at the end) must still yield ONE_TO_ONE.
pub fn finalize_cardinalities(schema: &mut Schema) {
    let updates: Vec<(usize, Cardinality)> = schema
        .relationships
        .values()
        .enumerate()
        .map(|(i, r)| (i, cardinality_for(schema, &r.foreign_table, &r.foreign_column)))
        .collect();

    for (index, cardinality) in updates {
        if let Some((_, relationship)) = schema.relationships.get_index_mut(index) {
            relationship.cardinality = cardinality;
        }
    }
}

fn available_name(schema: &Schema, base: &str) -> String {
    if !schema.relationships.contains_key(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !schema.relationships.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}
