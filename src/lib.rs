//! ddl-schema: PostgreSQL DDL to a canonical schema model, and back
//!
//! This library turns raw relational DDL (including pg_dump output) into a
//! normalized, diffable schema model, and renders structured schema edit
//! operations back into DDL text, either one at a time or folded into a
//! cumulative migration script across versions.

pub mod deparser;
pub mod error;
pub mod model;
pub mod operation;
pub mod parser;
pub mod replay;
mod util;

use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;
use tracing::debug;

pub use deparser::deparse;
pub use error::{DeparseError, SchemaError};
pub use model::{BuildReport, ParsedSchema, Schema};
pub use operation::{apply_operation, parse_operations, Operation, VersionedOperationBatch};
pub use replay::{replay, replay_detailed, ReplayOutput};

/// Schema used by PostgreSQL when a table name carries no qualifier
pub const DEFAULT_SCHEMA: &str = "public";

/// How schema qualifiers on table names are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualifierPolicy {
    /// Drop the default schema qualifier (`public.users` -> `users`) and keep
    /// any other qualifier as part of the name (`audit.users` stays as is)
    #[default]
    DropDefault,
    /// Drop every schema qualifier (`audit.users` -> `users`)
    DropAll,
}

/// Options for parsing DDL into a schema model
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Schema treated as the default qualifier (e.g., "public")
    pub default_schema: String,
    /// Qualifier stripping rule for table names
    pub qualifier_policy: QualifierPolicy,
    /// Database version reported in the schema.json export header
    pub database_version: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_schema: DEFAULT_SCHEMA.to_string(),
            qualifier_policy: QualifierPolicy::default(),
            database_version: None,
        }
    }
}

impl ParseOptions {
    fn validate(&self) -> std::result::Result<(), SchemaError> {
        if self.default_schema.trim().is_empty() {
            return Err(SchemaError::InvalidOptions {
                message: "default schema must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse one DDL document into a schema model
pub fn parse_schema(
    sql: &str,
    options: &ParseOptions,
) -> std::result::Result<ParsedSchema, SchemaError> {
    options.validate()?;

    // Step 1: Split and parse statements
    let statements = parser::parse_sql(sql)?;
    debug!(statements = statements.len(), "parsed SQL statements");

    // Step 2: Fold the statements into the schema model
    let parsed = model::build_schema(&statements, options);
    debug!(
        tables = parsed.schema.tables.len(),
        relationships = parsed.schema.relationships.len(),
        skipped = parsed.report.skipped.len(),
        "built schema model"
    );

    Ok(parsed)
}

/// Parse a DDL file (or a directory of `.sql` files read as one ordered document)
pub fn parse_schema_path(path: &Path, options: &ParseOptions) -> Result<ParsedSchema> {
    let sql = parser::read_sql_input(path)?;
    Ok(parse_schema(&sql, options)?)
}

/// Minimum number of documents to benefit from parallel processing.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Parse several independent documents.
///
/// Each document is folded on its own; parallelism only ever spans
/// documents, never statements within one document.
pub fn parse_documents(
    documents: &[&str],
    options: &ParseOptions,
) -> Vec<std::result::Result<ParsedSchema, SchemaError>> {
    if documents.len() >= PARALLEL_THRESHOLD {
        documents
            .par_iter()
            .map(|sql| parse_schema(sql, options))
            .collect()
    } else {
        documents
            .iter()
            .map(|sql| parse_schema(sql, options))
            .collect()
    }
}
