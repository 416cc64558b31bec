//! Build-time configuration errors.
//!
//! Everything here indicates a mistake in the dashboard definition and is
//! reported while fields and schemas are being declared, never at query
//! time.

use thiserror::Error;

/// Result type for field and schema declaration.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while declaring fields and schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A field id was declared twice in one factory.
    #[error("field id '{0}' is already used")]
    DuplicateId(String),

    /// A template references more fields than were supplied.
    #[error("template '{template}' references field #{placeholder} but only {fields} field(s) were given")]
    TemplateArity {
        template: String,
        placeholder: usize,
        fields: usize,
    },

    /// A star schema was declared without any join mapping.
    #[error("invalid star schema: missing table joins")]
    EmptyStar,

    /// A join key field touches zero or several tables.
    #[error("invalid star schema: field '{field}' must reference exactly one table (found: {})", .tables.join(", "))]
    MultiTableJoinField { field: String, tables: Vec<String> },

    /// Fact-side join keys come from different tables.
    #[error("invalid star schema: multiple fact tables {}", .0.join(", "))]
    MultipleFactTables(Vec<String>),

    /// A dimension table is the target of more than one mapping.
    #[error("table {0} cannot be joined with multiple keys to fact table")]
    DuplicateDimension(String),
}
