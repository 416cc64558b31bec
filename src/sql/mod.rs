//! SQL generation module.
//!
//! Panels compose field expressions written by the dashboard author; this
//! module turns those fragments into complete statements for one of the
//! supported dialects.
//!
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`query`] - SELECT statement shape and staged pagination batches

pub mod dialect;
pub mod query;
pub mod token;


// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use query::{
    FromClause, Grouping, LimitOffset, OrderByExpr, OrderDirection, Query, SelectExpr,
    StatementBatch,
};
pub use token::{Token, TokenStream};
