//! Token-based ALTER SEQUENCE parsing for PostgreSQL
//!
//! sqlparser has no ALTER SEQUENCE statement, but pg_dump emits one for every
//! serial column to tie the sequence to the column that owns it:
//!
//! ```sql
//! ALTER SEQUENCE public.users_id_seq OWNED BY public.users.id;
//! ALTER SEQUENCE IF EXISTS orders_id_seq OWNED BY orders.id;
//! ALTER SEQUENCE public.users_id_seq OWNED BY NONE;
//! ALTER SEQUENCE counter RESTART WITH 1000;
//! ```
//!
//! Only the sequence name and the OWNED BY target are extracted; every other
//! clause is ignored.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::identifier_utils::normalize_word;

/// Result of parsing an ALTER SEQUENCE statement using tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenParsedAlterSequence {
    /// Normalized sequence name parts (e.g., ["public", "users_id_seq"])
    pub name: Vec<String>,
    /// Normalized OWNED BY parts, column last (e.g., ["public", "users", "id"]);
    /// None when absent or OWNED BY NONE
    pub owned_by: Option<Vec<String>>,
}

/// Token-based ALTER SEQUENCE parser
pub struct SequenceTokenParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SequenceTokenParser {
    /// Create a new parser for an ALTER SEQUENCE statement
    pub fn new(sql: &str) -> Option<Self> {
        let dialect = PostgreSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize()
            .ok()?
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .collect();

        Some(Self { tokens, pos: 0 })
    }

    /// Parse ALTER SEQUENCE and return sequence info
    pub fn parse_alter_sequence(&mut self) -> Option<TokenParsedAlterSequence> {
        if !self.consume_keyword(Keyword::ALTER) || !self.consume_keyword(Keyword::SEQUENCE) {
            return None;
        }

        if self.check_keyword(Keyword::IF) {
            self.advance();
            if !self.consume_keyword(Keyword::EXISTS) {
                return None;
            }
        }

        let name = self.parse_dotted_name()?;
        let mut owned_by = None;

        while !self.is_at_end() {
            if self.check_keyword(Keyword::OWNED) {
                self.advance();
                if !self.consume_keyword(Keyword::BY) {
                    return None;
                }
                if self.check_keyword(Keyword::NONE) {
                    self.advance();
                    owned_by = None;
                } else {
                    let target = self.parse_dotted_name()?;
                    // OWNED BY requires at least table.column
                    if target.len() < 2 {
                        return None;
                    }
                    owned_by = Some(target);
                }
            } else {
                self.advance();
            }
        }

        Some(TokenParsedAlterSequence { name, owned_by })
    }

    /// Parse `a.b.c` into normalized parts
    fn parse_dotted_name(&mut self) -> Option<Vec<String>> {
        let mut parts = Vec::new();
        loop {
            match self.tokens.get(self.pos) {
                Some(Token::Word(w)) => {
                    parts.push(normalize_word(w));
                    self.advance();
                }
                _ => return None,
            }
            if matches!(self.tokens.get(self.pos), Some(Token::Period)) {
                self.advance();
            } else {
                break;
            }
        }
        Some(parts)
    }

    // === Helper methods ===

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(
            self.tokens.get(self.pos),
            Some(Token::Word(w)) if w.keyword == keyword && w.quote_style.is_none()
        )
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }
}

/// Parse ALTER SEQUENCE using tokens
pub fn parse_alter_sequence_tokens(sql: &str) -> Option<TokenParsedAlterSequence> {
    let mut parser = SequenceTokenParser::new(sql)?;
    parser.parse_alter_sequence()
}
