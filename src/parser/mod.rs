//! PostgreSQL DDL parsing
//!
//! This is the AST acquisition boundary: dump text goes in, an ordered list
//! of sqlparser statements (plus fallback-parsed statements) comes out.

pub mod identifier_utils;
mod pg_parser;
mod preprocess_parser;
mod sequence_parser;

pub use pg_parser::{
    parse_sql, read_sql_file, read_sql_input, FallbackStatementType, ParsedStatement,
};
pub use preprocess_parser::{preprocess_dump, PreprocessResult};
pub use sequence_parser::{parse_alter_sequence_tokens, TokenParsedAlterSequence};
