//! # panelql
//!
//! Query engine for interactive analytical dashboards: typed fields, a
//! shared cross-filter state, and SQL generation over single tables or star
//! schemas.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            Catalog (described tables/columns)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [FieldFactory]
//! ┌─────────────────────────────────────────────────────────┐
//! │         Fields + Schema (single table or star)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [Dashboard / Panel]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Filter Manager ──notify──▶ update fan-out (visible)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL statements (single or staged pagination)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [QueryTransport]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Positional rows, decoded through codecs         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything except [`QueryTransport::execute`](transport::QueryTransport::execute)
//! is synchronous and single-threaded.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod model;
pub mod query;
pub mod sql;
pub mod transport;

pub use sql::dialect;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Catalog, ColumnDescription, TableDescription};
    pub use crate::config::Settings;
    pub use crate::dashboard::{
        Container, ContainerKind, Dashboard, FetchError, FetchOptions, FetchResult, Panel,
        PanelId, PanelOptions,
    };
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::filter::{Filter, FilterContext, FilterManager, FilterSet, GroupOp};
    pub use crate::model::{
        Codec, DataType, Field, FieldFactory, ModelError, Schema, Template, Value,
    };
    pub use crate::query::{QueryOptions, Record, Selection};
    pub use crate::sql::query::OrderDirection;
    pub use crate::transport::{ProcessTransport, QueryTransport, TransportError};
}

pub use dashboard::{Dashboard, Panel};
pub use dialect::Dialect;
pub use filter::{Filter, FilterManager};
pub use model::{Codec, Field, FieldFactory, Schema, Value};
