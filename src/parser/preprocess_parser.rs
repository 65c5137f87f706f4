//! Dump preprocessing for PostgreSQL DDL
//!
//! pg_dump output mixes SQL with psql client syntax that no SQL grammar
//! accepts. This pass blanks that syntax out before tokenizing, keeping the
//! line structure intact so statement line numbers still match the input.
//!
//! ## Preprocessing Operations
//!
//! 1. **P1: UTF-8 BOM removal**
//! 2. **P2: psql meta-commands**
//!    - Lines starting with a backslash (`\connect`, `\restrict`, `\set ...`)
//! 3. **P3: COPY data blocks**
//!    - `COPY ... FROM stdin;` through the terminating `\.` line

use crate::util::{ends_with_ci, starts_with_ci};

/// Result of preprocessing a dump
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// SQL with client-only syntax blanked out
    pub sql: String,
    /// Number of lines blanked out
    pub removed_lines: usize,
}

/// Preprocess dump text so that only SQL statements remain
pub fn preprocess_dump(sql: &str) -> PreprocessResult {
    let sql = sql.strip_prefix('\u{FEFF}').unwrap_or(sql);

    let mut output = String::with_capacity(sql.len());
    let mut removed_lines = 0;
    let mut in_copy_data = false;

    for line in sql.split_inclusive('\n') {
        let trimmed = line.trim();
        let newline = if line.ends_with("\r\n") {
            "\r\n"
        } else if line.ends_with('\n') {
            "\n"
        } else {
            ""
        };

        let remove = if in_copy_data {
            if trimmed == "\\." {
                in_copy_data = false;
            }
            true
        } else if is_copy_from_stdin(trimmed) {
            in_copy_data = true;
            true
        } else {
            trimmed.starts_with('\\')
        };

        if remove {
            removed_lines += 1;
            output.push_str(newline);
        } else {
            output.push_str(line);
        }
    }

    PreprocessResult {
        sql: output,
        removed_lines,
    }
}

fn is_copy_from_stdin(trimmed_line: &str) -> bool {
    starts_with_ci(trimmed_line, "COPY ") && ends_with_ci(trimmed_line, "FROM stdin;")
}
