//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (TRUE/FALSE)
//! - Typed literals (`TIMESTAMPTZ '...'`)
//! - No `GROUP BY ALL`; grouping is spelled out

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_timestamp(&self, iso: &str) -> String {
        format!("TIMESTAMPTZ {}", helpers::quote_string_single(iso))
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)
}
