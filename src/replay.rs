//! Cumulative replay of versioned operation batches
//!
//! Folds every batch up to a cutoff version into one migration script.
//! Batches are taken in ascending version order (stable for equal versions)
//! and operations keep their order within a batch, so every statement of an
//! earlier version precedes every statement of a later one.

use tracing::debug;

use crate::deparser::deparse;
use crate::error::DeparseError;
use crate::model::Schema;
use crate::operation::{apply_operation, VersionedOperationBatch};

/// Separator between rendered operations
const STATEMENT_SEPARATOR: &str = "\n\n";

/// An operation that could not be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFailure {
    pub version: i64,
    /// Position of the operation within its batch
    pub index: usize,
    pub errors: Vec<DeparseError>,
}

/// Full replay result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOutput {
    pub sql: String,
    /// Number of operations rendered into `sql`
    pub rendered: usize,
    pub failures: Vec<ReplayFailure>,
}

/// Render all operations with `version <= up_to` into one script.
///
/// Failing operations are left out; see [`replay_detailed`] for them.
pub fn replay(batches: &[VersionedOperationBatch], up_to: i64) -> String {
    replay_detailed(batches, up_to).sql
}

/// Like [`replay`], also reporting what failed to render.
///
/// Each operation is rendered against the schema produced by applying every
/// operation before it, and is then applied itself, so a later add_column
/// sees the keys an earlier add_table declared.
pub fn replay_detailed(batches: &[VersionedOperationBatch], up_to: i64) -> ReplayOutput {
    let mut selected: Vec<&VersionedOperationBatch> =
        batches.iter().filter(|b| b.version <= up_to).collect();
    selected.sort_by_key(|b| b.version);

    let mut context = Schema::new();
    let mut fragments = Vec::new();
    let mut failures = Vec::new();

    for batch in selected {
        for (index, operation) in batch.operations.iter().enumerate() {
            match deparse(operation, &context) {
                Ok(sql) => {
                    debug!(version = batch.version, index, kind = operation.kind(), "rendered operation");
                    fragments.push(sql);
                }
                Err(errors) => {
                    debug!(
                        version = batch.version,
                        index,
                        kind = operation.kind(),
                        errors = errors.len(),
                        "operation not rendered"
                    );
                    failures.push(ReplayFailure {
                        version: batch.version,
                        index,
                        errors,
                    });
                }
            }
            apply_operation(&mut context, operation);
        }
    }

    ReplayOutput {
        rendered: fragments.len(),
        sql: fragments.join(STATEMENT_SEPARATOR),
        failures,
    }
}
