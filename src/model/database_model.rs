//! Schema model representation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Column, Relationship, Table, TableGroup};

/// The complete schema model produced by one parse pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Tables keyed by (possibly qualified) table name
    pub tables: IndexMap<String, Table>,
    /// Relationships keyed by relationship name
    pub relationships: IndexMap<String, Relationship>,
    #[serde(default)]
    pub table_groups: IndexMap<String, TableGroup>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&Column> {
        self.tables.get(table)?.columns.get(column)
    }

    /// The relationship whose foreign side is `(table, column)`, if any
    pub fn relationship_for(&self, table: &str, column: &str) -> Option<(&String, &Relationship)> {
        self.relationships
            .iter()
            .find(|(_, r)| r.foreign_table == table && r.foreign_column == column)
    }
}
