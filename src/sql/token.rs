//! SQL Tokens - the atomic units of emitted query text.
//!
//! Field expressions and codec-escaped literals arrive as finished text and
//! travel through the stream as [`Token::Raw`]. Everything the builder emits
//! itself is a keyword, punctuation or a dialect-quoted identifier.

use super::dialect::{Dialect, SqlDialect};

/// SQL Token - every element the query builder emits.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    As,
    On,
    Inner,
    Join,
    GroupBy,
    GroupByAll,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    In,
    Between,
    IsNotNull,
    Null,
    Over,

    // === Staging (DDL) Keywords ===
    Create,
    Temporary,
    Drop,
    Table,
    IfExists,

    // === Punctuation / Operators ===
    Comma,
    LParen,
    RParen,
    Eq,
    Star,

    // === Whitespace ===
    Space,

    // === Dynamic ===
    /// Identifier quoted for the target dialect (staging tables, aliases).
    Ident(String),
    /// Unsigned integer literal (row counts).
    LitInt(u64),
    /// Function name, emitted verbatim in lower case.
    FunctionName(String),

    /// Pre-rendered text emitted verbatim.
    ///
    /// Used for field expressions, table names from the schema and literals
    /// that a field codec has already escaped.
    Raw(String),
}

impl Token {
    /// Fixed text of keywords and punctuation; `None` for tokens whose text
    /// depends on the dialect or on their payload.
    pub fn keyword(&self) -> Option<&'static str> {
        let text = match self {
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::And => "AND",
            Token::Or => "OR",
            Token::As => "AS",
            Token::On => "ON",
            Token::Inner => "INNER",
            Token::Join => "JOIN",
            Token::GroupBy => "GROUP BY",
            Token::GroupByAll => "GROUP BY ALL",
            Token::Having => "HAVING",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::In => "IN",
            Token::Between => "BETWEEN",
            Token::IsNotNull => "IS NOT NULL",
            Token::Over => "OVER",
            Token::Create => "CREATE",
            Token::Drop => "DROP",
            Token::Table => "TABLE",
            Token::IfExists => "IF EXISTS",
            Token::Comma => ",",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "=",
            Token::Star => "*",
            Token::Space => " ",
            Token::Null
            | Token::Temporary
            | Token::Ident(_)
            | Token::LitInt(_)
            | Token::FunctionName(_)
            | Token::Raw(_) => return None,
        };
        Some(text)
    }

    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        if let Some(text) = self.keyword() {
            return text.to_string();
        }
        match self {
            Token::Null => dialect.format_null().to_string(),
            Token::Temporary => dialect.temporary_keyword().to_string(),
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::LitInt(n) => n.to_string(),
            Token::FunctionName(name) => name.to_lowercase(),
            Token::Raw(text) => text.clone(),
            // Covered by keyword()
            _ => String::new(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Push pre-rendered text.
    pub fn raw(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Token::Raw(text.into()))
    }

    /// Append each stream, separated by `, `.
    pub fn comma_separated<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a TokenStream>,
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.comma().space();
            }
            self.append(item);
        }
        self
    }

    /// Whether the stream holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

impl From<Token> for TokenStream {
    fn from(token: Token) -> Self {
        Self {
            tokens: vec![token],
        }
    }
}
