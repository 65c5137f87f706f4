//! PostgreSQL DDL parser using sqlparser-rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use encoding_rs::WINDOWS_1252;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};
use tracing::debug;
use walkdir::WalkDir;

use super::preprocess_parser::preprocess_dump;
use super::sequence_parser::parse_alter_sequence_tokens;
use crate::error::SchemaError;

/// Statement types that require fallback parsing due to sqlparser limitations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStatementType {
    /// ALTER SEQUENCE, reduced to the sequence name and its OWNED BY column
    AlterSequence {
        /// Normalized sequence name parts
        sequence: Vec<String>,
        /// Normalized OWNED BY parts, column last
        owned_by: Option<Vec<String>>,
    },
    /// Any statement sqlparser rejected; kept so the skip stays observable
    RawStatement {
        /// Leading keywords of the statement (e.g., "CREATE FUNCTION")
        kind: String,
        /// Parser error message
        message: String,
    },
}

/// A parsed SQL statement with source information
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// The parsed AST statement (None for fallback-parsed statements)
    pub statement: Option<Statement>,
    /// Original SQL text, without the terminating semicolon
    pub sql_text: String,
    /// 1-based line of the statement's first token
    pub start_line: usize,
    /// Fallback-parsed statement type (for statements sqlparser can't handle)
    pub fallback_type: Option<FallbackStatementType>,
}

impl ParsedStatement {
    /// Create a new ParsedStatement from a sqlparser Statement
    pub fn from_statement(statement: Statement, sql_text: String, start_line: usize) -> Self {
        Self {
            statement: Some(statement),
            sql_text,
            start_line,
            fallback_type: None,
        }
    }

    /// Create a new ParsedStatement from fallback parsing
    pub fn from_fallback(
        fallback_type: FallbackStatementType,
        sql_text: String,
        start_line: usize,
    ) -> Self {
        Self {
            statement: None,
            sql_text,
            start_line,
            fallback_type: Some(fallback_type),
        }
    }
}

/// A statement's text located in the source document
#[derive(Debug, Clone)]
struct RawStatement<'a> {
    text: &'a str,
    start_line: usize,
    /// First keywords of the statement, upper-cased
    leading_words: Vec<String>,
}

/// Extract line number from sqlparser error message (format: "... at Line: X, Column: Y")
fn extract_line_from_error(error_msg: &str) -> Option<usize> {
    let re = Regex::new(r"Line:\s*(\d+)").ok()?;
    let caps = re.captures(error_msg)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Parse a DDL document into an ordered statement list.
///
/// Statements sqlparser rejects do not fail the document; they come back as
/// fallback statements. Only a lexical failure of the whole document (e.g.
/// an unterminated string literal) is an error.
pub fn parse_sql(sql: &str) -> std::result::Result<Vec<ParsedStatement>, SchemaError> {
    let preprocessed = preprocess_dump(sql);
    if preprocessed.removed_lines > 0 {
        debug!(
            lines = preprocessed.removed_lines,
            "removed psql client syntax"
        );
    }

    let raw_statements = split_statements(&preprocessed.sql)?;
    let dialect = PostgreSqlDialect {};
    let mut statements = Vec::with_capacity(raw_statements.len());

    for raw in raw_statements {
        // sqlparser doesn't support ALTER SEQUENCE, so we use fallback
        if matches!(raw.leading_words.as_slice(), [a, b, ..] if a == "ALTER" && b == "SEQUENCE") {
            statements.push(ParsedStatement::from_fallback(
                alter_sequence_fallback(&raw),
                raw.text.to_string(),
                raw.start_line,
            ));
            continue;
        }

        match Parser::parse_sql(&dialect, raw.text) {
            Ok(parsed) => {
                for stmt in parsed {
                    statements.push(ParsedStatement::from_statement(
                        stmt,
                        raw.text.to_string(),
                        raw.start_line,
                    ));
                }
            }
            Err(e) => {
                let message = e.to_string();
                let line = extract_line_from_error(&message)
                    .map(|relative| raw.start_line + relative - 1)
                    .unwrap_or(raw.start_line);
                let kind = statement_kind_from_words(&raw.leading_words);
                debug!(line, kind = %kind, error = %message, "statement not parsed, keeping as raw");
                statements.push(ParsedStatement::from_fallback(
                    FallbackStatementType::RawStatement { kind, message },
                    raw.text.to_string(),
                    raw.start_line,
                ));
            }
        }
    }

    Ok(statements)
}

fn alter_sequence_fallback(raw: &RawStatement<'_>) -> FallbackStatementType {
    match parse_alter_sequence_tokens(raw.text) {
        Some(parsed) => FallbackStatementType::AlterSequence {
            sequence: parsed.name,
            owned_by: parsed.owned_by,
        },
        None => FallbackStatementType::RawStatement {
            kind: "ALTER SEQUENCE".to_string(),
            message: "unrecognized ALTER SEQUENCE syntax".to_string(),
        },
    }
}

/// Describe a statement by its leading keywords (at most two)
fn statement_kind_from_words(words: &[String]) -> String {
    match words {
        [] => "UNKNOWN".to_string(),
        [first] => first.clone(),
        [first, second, ..] => format!("{} {}", first, second),
    }
}

/// Byte offsets of line starts, for mapping tokenizer locations to text slices
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// Byte offset of a 1-based (line, column) location, column counted in chars
    fn offset(&self, text: &str, location: &Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let Some(&line_start) = self.line_starts.get(line) else {
            return text.len();
        };
        let column = (location.column as usize).saturating_sub(1);
        text[line_start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(text.len())
    }
}

/// Split a document into statements at top-level semicolons.
///
/// Tokenizing first keeps semicolons inside string literals, quoted
/// identifiers, comments and dollar-quoted function bodies from splitting a
/// statement. Leading comments are not part of the statement text.
fn split_statements(sql: &str) -> std::result::Result<Vec<RawStatement<'_>>, SchemaError> {
    let dialect = PostgreSqlDialect {};
    let tokens: Vec<TokenWithSpan> = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(|e| {
            let message = e.to_string();
            SchemaError::TokenizeError {
                line: extract_line_from_error(&message).unwrap_or(1),
                message,
            }
        })?;

    let index = LineIndex::new(sql);
    let mut statements = Vec::new();
    let mut start: Option<&TokenWithSpan> = None;
    let mut leading_words: Vec<String> = Vec::new();
    // Leading words stop at the first non-word token
    let mut collecting_words = true;

    for token in &tokens {
        match &token.token {
            Token::SemiColon => {
                if let Some(first) = start.take() {
                    let from = index.offset(sql, &first.span.start);
                    let to = index.offset(sql, &token.span.start);
                    statements.push(RawStatement {
                        text: sql[from..to].trim_end(),
                        start_line: first.span.start.line as usize,
                        leading_words: std::mem::take(&mut leading_words),
                    });
                }
                leading_words.clear();
                collecting_words = true;
            }
            Token::Whitespace(_) => {}
            other => {
                if start.is_none() {
                    start = Some(token);
                }
                match other {
                    Token::Word(w) if collecting_words && leading_words.len() < 3 => {
                        leading_words.push(w.value.to_uppercase());
                    }
                    _ => collecting_words = false,
                }
            }
        }
    }

    // Add remaining content (final statement without a semicolon)
    if let Some(first) = start {
        let from = index.offset(sql, &first.span.start);
        let text = sql[from..].trim_end();
        if !text.is_empty() {
            statements.push(RawStatement {
                text,
                start_line: first.span.start.line as usize,
                leading_words,
            });
        }
    }

    Ok(statements)
}

/// Read a file as a string, trying UTF-8 first, then Windows-1252 as fallback
fn read_file_with_encoding_fallback(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "File contains invalid characters",
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

/// Read DDL input from a file, or from every `.sql` file under a directory.
///
/// Directory contents are sorted by path and concatenated into one document,
/// so migration folders named by timestamp replay in order.
pub fn read_sql_input(path: &Path) -> Result<String> {
    if !path.is_dir() {
        return read_sql_file(path);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
        })
        .collect();
    files.sort();

    let mut document = String::new();
    for file in &files {
        let content = read_sql_file(file)?;
        document.push_str(&content);
        // Guard against a file whose last statement lacks a semicolon
        if !content.trim_end().ends_with(';') {
            document.push(';');
        }
        document.push('\n');
    }

    debug!(files = files.len(), "read SQL directory");
    Ok(document)
}

/// Read a single SQL file
pub fn read_sql_file(path: &Path) -> Result<String> {
    let content =
        read_file_with_encoding_fallback(path).map_err(|e| SchemaError::SqlFileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(content)
}
