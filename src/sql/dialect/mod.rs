//! SQL Dialect definitions and formatting rules.
//!
//! Field expressions are written by the dashboard author in the target
//! database's own syntax, so dialects only cover what the builder emits
//! itself:
//!
//! - Identifier quoting for staging tables and column aliases
//! - Literal formatting used by field codecs (strings, booleans, timestamps)
//! - Implicit grouping: `GROUP BY ALL` vs an explicit expression list
//! - Pagination: LIMIT/OFFSET
//! - Temporary table keyword for staged pagination
//!
//! | Feature | DuckDB | PostgreSQL | MySQL |
//! |---------|--------|------------|-------|
//! | `GROUP BY ALL` | ✓ | ❌ | ❌ |
//! | `DROP TABLE IF EXISTS` | ✓ | ✓ | ✓ |
//! | `row_number() OVER` | ✓ | ✓ | 8.0+ |
//!
//! # Usage
//!
//! ```ignore
//! use panelql::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("c0");  // "c0"
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;

/// SQL dialect trait - defines how builder-emitted constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (staging table, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All supported dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_keyword(b)
    }

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Format a timestamp literal from an ISO-8601 string.
    ///
    /// Defaults to a plain string literal and leaves the cast to the
    /// database, which is what DuckDB and MySQL expect.
    fn format_timestamp(&self, iso: &str) -> String {
        self.quote_string(iso)
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    /// Whether this dialect accepts `GROUP BY ALL`.
    ///
    /// Dialects without it get an explicit list of the selected
    /// non-aggregate expressions.
    fn supports_group_by_all(&self) -> bool {
        false
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Keyword for session-scoped tables.
    fn temporary_keyword(&self) -> &'static str {
        "TEMPORARY"
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    DuckDb,
    Postgres,
    MySql,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn format_timestamp(&self, iso: &str) -> String {
        self.dialect().format_timestamp(iso)
    }

    fn supports_group_by_all(&self) -> bool {
        self.dialect().supports_group_by_all()
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn temporary_keyword(&self) -> &'static str {
        self.dialect().temporary_keyword()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckdb" => Ok(Dialect::DuckDb),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}
