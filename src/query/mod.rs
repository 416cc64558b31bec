//! Query Builder - fields and filters in, statements out.
//!
//! ```text
//!   Selection + filters + ordering
//!        │
//!        ├─ touched tables ──▶ Schema::resolve_join ──▶ FROM
//!        ├─ non-aggregate filters ─────────────────────▶ WHERE
//!        ├─ selected non-aggregates ───────────────────▶ GROUP BY (ALL)
//!        ├─ aggregate filters ─────────────────────────▶ HAVING
//!        └─ custom order, then every selected field ───▶ ORDER BY
//! ```
//!
//! Building never fails; every well-typed input has a statement, including
//! an empty selection (`SELECT NULL`) and empty membership filters.

use std::collections::BTreeSet;

use serde_json::Value as Cell;

use crate::filter::Filter;
use crate::model::codec::{Codec, DecodeError, Value};
use crate::model::field::Field;
use crate::model::schema::Schema;
use crate::sql::dialect::Dialect;
use crate::sql::query::{
    Grouping, OrderByExpr, OrderDirection, Query, SelectExpr, StatementBatch,
};
use crate::sql::token::{Token, TokenStream};

/// One result row as delivered by the transport: positional cells.
pub type Row = Vec<Cell>;

// =============================================================================
// Selection
// =============================================================================

/// Ordered mapping of result keys to fields.
///
/// The order is the select-list order and the order of decoded cells.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    entries: Vec<(String, Field)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field under `key`. A repeated key replaces the earlier field in
    /// place.
    pub fn with(mut self, key: &str, field: &Field) -> Self {
        self.insert(key, field);
        self
    }

    pub fn insert(&mut self, key: &str, field: &Field) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = field.clone(),
            None => self.entries.push((key.to_string(), field.clone())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.entries.iter().map(|(_, f)| f)
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.iter().find(|(k, _)| *k == key).map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Field)> for Selection {
    fn from_iter<I: IntoIterator<Item = (K, Field)>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for (key, field) in iter {
            selection.insert(&key.into(), &field);
        }
        selection
    }
}

// =============================================================================
// Options
// =============================================================================

/// Everything that shapes one aggregation query.
#[derive(Debug, Clone, Default)]
#[must_use = "options have no effect until passed to build_query"]
pub struct QueryOptions {
    pub select: Selection,
    pub filters: Vec<Filter>,
    pub order_by: Vec<(Field, OrderDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryOptions {
    pub fn new(select: Selection) -> Self {
        Self {
            select,
            ..Self::default()
        }
    }

    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &Field, dir: OrderDirection) -> Self {
        self.order_by.push((field.clone(), dir));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether the caller asked for a page rather than the full result.
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Tables read by selected fields, filters and ordering fields.
    pub fn tables(&self) -> BTreeSet<String> {
        let mut tables: BTreeSet<String> = self
            .select
            .fields()
            .chain(self.order_by.iter().map(|(f, _)| f))
            .flat_map(|f| f.tables().iter().cloned())
            .collect();
        for filter in &self.filters {
            tables.extend(filter.tables());
        }
        tables
    }
}

// =============================================================================
// Building
// =============================================================================

fn raw(text: &str) -> TokenStream {
    TokenStream::from(Token::Raw(text.to_string()))
}

fn non_aggregates(options: &QueryOptions) -> Vec<TokenStream> {
    options
        .select
        .fields()
        .filter(|f| !f.is_aggregate())
        .map(|f| raw(f.expression()))
        .collect()
}

/// Build the aggregation query, including LIMIT/OFFSET when set.
pub fn build_query(schema: &Schema, options: &QueryOptions, dialect: Dialect) -> Query {
    let from = schema.resolve_join(&options.tables());

    let (having, where_): (Vec<&Filter>, Vec<&Filter>) =
        options.filters.iter().partition(|f| f.is_aggregate());

    let select = options
        .select
        .fields()
        .map(|f| SelectExpr::raw(f.expression()))
        .collect();

    let order_by = options
        .order_by
        .iter()
        .map(|(f, dir)| OrderByExpr::new(raw(f.expression())).with_direction(*dir))
        .chain(options.select.fields().map(|f| OrderByExpr::new(raw(f.expression()))))
        .collect();

    let mut query = Query::new()
        .select(select)
        .from(from)
        .group_by(Grouping::implicit(dialect, non_aggregates(options)))
        .order_by(order_by)
        .limit(options.limit)
        .offset(options.offset);
    for filter in where_ {
        query = query.filter(filter.to_tokens_for_dialect(dialect));
    }
    for filter in having {
        query = query.having(filter.to_tokens_for_dialect(dialect));
    }

    tracing::debug!(
        dialect = %dialect,
        sql = %query.to_sql(dialect),
        "built query"
    );
    query
}

/// Build the staged batch: materialize, count, then page.
pub fn build_paginated(
    schema: &Schema,
    options: &QueryOptions,
    staging_table: &str,
    dialect: Dialect,
) -> StatementBatch {
    let query = build_query(schema, options, dialect);
    StatementBatch::staged(&query, non_aggregates(options), staging_table, dialect)
}

/// A single statement when unpaginated, the staged batch otherwise.
pub fn build_statements(
    schema: &Schema,
    options: &QueryOptions,
    staging_table: &str,
    dialect: Dialect,
) -> StatementBatch {
    if options.is_paginated() {
        build_paginated(schema, options, staging_table, dialect)
    } else {
        StatementBatch::single(build_query(schema, options, dialect).to_sql(dialect))
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// A decoded result row, keyed like the [`Selection`] that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&Value::Null)
    }
}

/// Decode positional rows by zipping the selection's keys with cell positions.
///
/// Missing trailing cells decode to `Null`; surplus cells are ignored.
pub fn decode_rows(selection: &Selection, rows: &[Row]) -> Result<Vec<Record>, DecodeError> {
    rows.iter().map(|row| decode_row(selection, row)).collect()
}

fn decode_row(selection: &Selection, row: &Row) -> Result<Record, DecodeError> {
    if row.len() > selection.len() {
        tracing::trace!(
            expected = selection.len(),
            found = row.len(),
            "ignoring surplus cells"
        );
    }
    let entries = selection
        .iter()
        .enumerate()
        .map(|(i, (key, field))| {
            let value = match row.get(i) {
                Some(cell) => field.codec().parse(cell)?,
                None => Value::Null,
            };
            Ok((key.to_string(), value))
        })
        .collect::<Result<_, DecodeError>>()?;
    Ok(Record { entries })
}

/// Decode the single-cell result of a `count(*)` statement.
pub fn decode_count(rows: &[Row]) -> Result<u64, DecodeError> {
    let cell = rows.first().and_then(|row| row.first()).unwrap_or(&Cell::Null);
    match Codec::number().parse(cell)? {
        Value::Number(n) if n >= 0.0 => Ok(n as u64),
        Value::Null => Ok(0),
        _ => Err(DecodeError::UnexpectedCell {
            expected: crate::model::codec::DataType::Number,
            found: cell.to_string(),
        }),
    }
}
