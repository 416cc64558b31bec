//! Typed field model.
//!
//! Fields and schemas are declared once, while a dashboard is set up, and
//! are immutable afterwards apart from display configuration.
//!
//! - [`codec`] - per-type escaping, parsing and formatting of values
//! - [`field`] - columns and computed expressions with stable identity
//! - [`schema`] - single-table and star-schema join resolution
//! - [`error`] - build-time configuration errors

pub mod codec;
pub mod error;
pub mod field;
pub mod schema;

pub use codec::{Codec, DataType, DecodeError, Value};
pub use error::{ModelError, ModelResult};
pub use field::{Field, FieldFactory, Formatter, IdStyle, Template};
pub use schema::{JoinMapping, Schema};
