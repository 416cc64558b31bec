//! Schema resolution - which tables a query reads and how they are joined.

use std::collections::{BTreeSet, HashSet};

use super::error::{ModelError, ModelResult};
use super::field::Field;
use crate::sql::query::FromClause;

/// Maps the set of tables touched by a query to its `FROM` clause.
#[derive(Debug, Clone)]
pub enum Schema {
    /// One table; every query reads from it.
    Table { name: String },
    /// One fact table with dimension tables joined on declared key pairs.
    Star {
        fact_table: String,
        mappings: Vec<JoinMapping>,
    },
}

/// A dimension join: `fact_key = dimension_key`.
#[derive(Debug, Clone)]
pub struct JoinMapping {
    pub fact_key: Field,
    pub dimension_key: Field,
}

impl JoinMapping {
    /// The dimension table this mapping joins in.
    pub fn dimension_table(&self) -> &str {
        single_table(&self.dimension_key).unwrap_or_default()
    }
}

impl Schema {
    /// A single-table schema.
    pub fn table(name: &str) -> Self {
        Schema::Table {
            name: name.to_string(),
        }
    }

    /// A star schema from `(fact_key, dimension_key)` pairs.
    ///
    /// Fails if there are no mappings, if any key touches other than exactly
    /// one table, if the fact keys come from different tables, or if a
    /// dimension table is joined more than once.
    pub fn star(mappings: Vec<(Field, Field)>) -> ModelResult<Self> {
        if mappings.is_empty() {
            return Err(ModelError::EmptyStar);
        }

        for field in mappings.iter().flat_map(|(fact, dim)| [fact, dim]) {
            if field.tables().len() != 1 {
                return Err(ModelError::MultiTableJoinField {
                    field: field.id().to_string(),
                    tables: field.tables().iter().cloned().collect(),
                });
            }
        }

        let fact_tables: BTreeSet<&str> = mappings
            .iter()
            .filter_map(|(fact, _)| single_table(fact))
            .collect();
        if fact_tables.len() != 1 {
            return Err(ModelError::MultipleFactTables(
                fact_tables.into_iter().map(str::to_string).collect(),
            ));
        }
        let fact_table = fact_tables
            .into_iter()
            .next()
            .map(str::to_string)
            .unwrap_or_default();

        let mut seen = HashSet::new();
        for (_, dim) in &mappings {
            let table = single_table(dim).unwrap_or_default();
            if !seen.insert(table) {
                return Err(ModelError::DuplicateDimension(table.to_string()));
            }
        }

        tracing::debug!(
            fact_table = %fact_table,
            dimensions = mappings.len(),
            "declared star schema"
        );

        Ok(Schema::Star {
            fact_table,
            mappings: mappings
                .into_iter()
                .map(|(fact_key, dimension_key)| JoinMapping {
                    fact_key,
                    dimension_key,
                })
                .collect(),
        })
    }

    /// Produce the `FROM` clause for the tables a query touches.
    ///
    /// Dimension joins are applied in declaration order, and only for
    /// dimension tables present in `tables`.
    pub fn resolve_join(&self, tables: &BTreeSet<String>) -> FromClause {
        match self {
            Schema::Table { name } => FromClause::table(name),
            Schema::Star {
                fact_table,
                mappings,
            } => mappings
                .iter()
                .filter(|m| tables.contains(m.dimension_table()))
                .fold(FromClause::table(fact_table), |clause, m| {
                    clause.inner_join(
                        m.dimension_table(),
                        m.fact_key.expression(),
                        m.dimension_key.expression(),
                    )
                }),
        }
    }
}

fn single_table(field: &Field) -> Option<&str> {
    field.tables().iter().next().map(String::as_str)
}
