//! Catalog - declares column fields from described tables.
//!
//! Introspecting a live database is outside the engine. Whatever does it
//! hands over [`TableDescription`]s (the shape of `DESCRIBE <table>`), and
//! [`Catalog::declare`] turns every column into a field with a codec picked
//! from its type name.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::codec::{Codec, DataType};
use crate::model::error::ModelResult;
use crate::model::field::{Field, FieldFactory};

/// One table as described by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
}

/// One column as described by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    /// Database type name, e.g. `BIGINT`, `TIMESTAMP WITH TIME ZONE`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Accepts booleans or `"YES"` / `"NO"`.
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub nullable: bool,
}

impl ColumnDescription {
    pub fn new(name: &str, type_name: &str, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            nullable,
        }
    }

    /// Codec for this column.
    pub fn codec(&self) -> Codec {
        let codec = Codec::of(data_type_for(&self.type_name));
        if self.nullable {
            codec.nullable()
        } else {
            codec
        }
    }
}

/// Type-name prefixes, checked in order. Anything unmatched is a string.
const TYPE_PREFIXES: &[(&str, DataType)] = &[
    ("INTEGER", DataType::Number),
    ("FLOAT", DataType::Number),
    ("BIGINT", DataType::Number),
    ("DOUBLE", DataType::Number),
    ("DECIMAL", DataType::Number),
    ("TIMESTAMP", DataType::Date),
    ("DATE", DataType::Date),
    ("BOOLEAN", DataType::Boolean),
];

/// Map a database type name to a data type by prefix.
pub fn data_type_for(type_name: &str) -> DataType {
    let upper = type_name.trim().to_ascii_uppercase();
    TYPE_PREFIXES
        .iter()
        .find(|(prefix, _)| upper.starts_with(prefix))
        .map(|(_, data_type)| *data_type)
        .unwrap_or(DataType::String)
}

fn deserialize_nullable<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.to_ascii_uppercase().as_str() {
            "YES" | "TRUE" => Ok(true),
            "NO" | "FALSE" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected YES or NO, found {other}"
            ))),
        },
    }
}

/// Column fields grouped per table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, Vec<Field>>,
}

impl Catalog {
    /// Declare one column field per described column.
    ///
    /// Fails on the first duplicate id, as the factory does.
    pub fn declare(factory: &mut FieldFactory, tables: &[TableDescription]) -> ModelResult<Self> {
        let mut catalog = Catalog::default();
        for table in tables {
            let fields = table
                .columns
                .iter()
                .map(|column| factory.column(&table.name, &column.name, column.codec()))
                .collect::<ModelResult<Vec<_>>>()?;
            tracing::debug!(table = %table.name, columns = fields.len(), "declared table fields");
            catalog.tables.insert(table.name.clone(), fields);
        }
        Ok(catalog)
    }

    /// Fields of one table, in column order.
    pub fn table(&self, name: &str) -> Option<&[Field]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// The field for `table.column`.
    pub fn field(&self, table: &str, column: &str) -> Option<&Field> {
        let qualified = format!("{table}.{column}");
        self.table(table)?
            .iter()
            .find(|f| f.expression() == qualified)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.tables.values().flatten()
    }
}
