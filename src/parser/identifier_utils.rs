//! Centralized identifier handling utilities for PostgreSQL parsing.
//!
//! PostgreSQL folds unquoted identifiers to lower case and keeps quoted
//! identifiers verbatim. Every name that enters the schema model goes through
//! these helpers so that `Users`, `users` and `"users"` resolve to the same
//! table while `"Users"` stays distinct.
//!
//! # Examples
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! // public.users -> users (default qualifier dropped)
//! assert_eq!(resolve_table_name(vec!["public".into(), "users".into()], &options), "users");
//! // audit.users -> audit.users (other qualifiers kept)
//! assert_eq!(resolve_table_name(vec!["audit".into(), "users".into()], &options), "audit.users");
//! ```

use sqlparser::ast::{Ident, ObjectName};
use sqlparser::tokenizer::Word;

use crate::{ParseOptions, QualifierPolicy};

/// Normalize a parsed identifier the way PostgreSQL resolves it.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_ident(&Ident::new("Users")), "users");
/// assert_eq!(normalize_ident(&Ident::with_quote('"', "Users")), "Users");
/// ```
pub fn normalize_ident(ident: &Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_lowercase()
    }
}

/// Normalize a tokenizer word the same way as [`normalize_ident`].
pub fn normalize_word(word: &Word) -> String {
    if word.quote_style.is_some() {
        word.value.clone()
    } else {
        word.value.to_lowercase()
    }
}

/// Split an object name into normalized parts.
pub fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0.iter().map(normalize_ident).collect()
}

/// Resolve normalized name parts into a model table name.
///
/// A leading catalog part (`db.schema.table`) is always dropped. The schema
/// part is then dropped or kept according to the qualifier policy.
pub fn resolve_table_name(mut parts: Vec<String>, options: &ParseOptions) -> String {
    if parts.len() > 2 {
        parts.drain(..parts.len() - 2);
    }

    match parts.len() {
        0 => String::new(),
        1 => parts.remove(0),
        _ => {
            let table = parts.pop().unwrap_or_default();
            let schema = parts.pop().unwrap_or_default();
            let drop_qualifier = match options.qualifier_policy {
                QualifierPolicy::DropAll => true,
                QualifierPolicy::DropDefault => schema == options.default_schema,
            };
            if drop_qualifier {
                table
            } else {
                format!("{}.{}", schema, table)
            }
        }
    }
}

/// Resolve a parsed object name into a model table name.
pub fn resolve_object_name(name: &ObjectName, options: &ParseOptions) -> String {
    resolve_table_name(object_name_parts(name), options)
}

/// Last part of an object name (index and constraint names are never qualified in the model).
pub fn unqualified_name(name: &ObjectName) -> String {
    name.0.last().map(normalize_ident).unwrap_or_default()
}
