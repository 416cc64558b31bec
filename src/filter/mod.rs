//! Filters - predicates bound to fields.
//!
//! A filter is aggregate if any field it involves is aggregate; aggregate
//! filters end up in `HAVING`, all others in `WHERE`. Literal values are
//! always escaped through the bound field's codec.
//!
//! [`FilterSet`] keeps at most one filter per key (the field id for
//! single-field filters) and iterates in insertion order.

pub mod manager;

pub use manager::{FilterContext, FilterManager};

use std::collections::BTreeSet;

use crate::model::codec::Value;
use crate::model::field::Field;
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::token::{Token, TokenStream};

/// Logical connective of a filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    And,
    Or,
}

/// A predicate over one or more fields.
#[derive(Debug, Clone)]
pub enum Filter {
    /// `field IN (v1, v2, ...)`. An empty list matches nothing.
    Membership { field: Field, values: Vec<Value> },
    /// `field BETWEEN min AND max`, inclusive.
    Range { field: Field, min: Value, max: Value },
    /// `field IS NOT NULL`
    NotNull { field: Field },
    /// Parenthesised children joined by `AND` / `OR`.
    Group { op: GroupOp, filters: Vec<Filter> },
}

impl Filter {
    pub fn membership<V: Into<Value>>(field: &Field, values: impl IntoIterator<Item = V>) -> Self {
        Filter::Membership {
            field: field.clone(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: &Field, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Filter::Range {
            field: field.clone(),
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn not_null(field: &Field) -> Self {
        Filter::NotNull {
            field: field.clone(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::Group {
            op: GroupOp::And,
            filters,
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Group {
            op: GroupOp::Or,
            filters,
        }
    }

    /// Fields this filter involves, in first-seen order, without repeats.
    pub fn fields(&self) -> Vec<&Field> {
        let mut out: Vec<&Field> = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a Field>) {
        match self {
            Filter::Membership { field, .. }
            | Filter::Range { field, .. }
            | Filter::NotNull { field } => {
                if !out.contains(&field) {
                    out.push(field);
                }
            }
            Filter::Group { filters, .. } => {
                for filter in filters {
                    filter.collect_fields(out);
                }
            }
        }
    }

    /// Identity used by [`FilterSet`]: the field id, or the sorted ids of
    /// every involved field for groups.
    pub fn key(&self) -> String {
        match self {
            Filter::Membership { field, .. }
            | Filter::Range { field, .. }
            | Filter::NotNull { field } => field.id().to_string(),
            Filter::Group { .. } => {
                let ids: BTreeSet<&str> = self.fields().into_iter().map(Field::id).collect();
                ids.into_iter().collect::<Vec<_>>().join(",")
            }
        }
    }

    /// Whether this filter must be applied after aggregation.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Filter::Membership { field, .. }
            | Filter::Range { field, .. }
            | Filter::NotNull { field } => field.is_aggregate(),
            Filter::Group { filters, .. } => filters.iter().any(Filter::is_aggregate),
        }
    }

    /// Tables read by the involved fields.
    pub fn tables(&self) -> BTreeSet<String> {
        self.fields()
            .into_iter()
            .flat_map(|f| f.tables().iter().cloned())
            .collect()
    }

    /// Append values to a membership filter.
    ///
    /// Returns `false` (and changes nothing) for other variants.
    pub fn add_values<V: Into<Value>>(&mut self, more: impl IntoIterator<Item = V>) -> bool {
        match self {
            Filter::Membership { values, .. } => {
                values.extend(more.into_iter().map(Into::into));
                true
            }
            _ => false,
        }
    }

    /// Convert to tokens for the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            Filter::Membership { field, values } => {
                let escaped: Vec<TokenStream> = values
                    .iter()
                    .map(|v| Token::Raw(field.codec().escape_for_dialect(v, dialect)).into())
                    .collect();
                ts.raw(field.expression())
                    .space()
                    .push(Token::In)
                    .space()
                    .lparen()
                    .comma_separated(&escaped)
                    .rparen();
            }
            Filter::Range { field, min, max } => {
                let codec = field.codec();
                ts.raw(field.expression())
                    .space()
                    .push(Token::Between)
                    .space()
                    .raw(codec.escape_for_dialect(min, dialect))
                    .space()
                    .push(Token::And)
                    .space()
                    .raw(codec.escape_for_dialect(max, dialect));
            }
            Filter::NotNull { field } => {
                ts.raw(field.expression()).space().push(Token::IsNotNull);
            }
            Filter::Group { op, filters } => match filters.as_slice() {
                [] => {
                    // Identity element of the connective
                    ts.raw(dialect.format_bool(*op == GroupOp::And));
                }
                [only] => {
                    ts.append(&only.to_tokens_for_dialect(dialect));
                }
                _ => {
                    let connective = match op {
                        GroupOp::And => Token::And,
                        GroupOp::Or => Token::Or,
                    };
                    for (i, filter) in filters.iter().enumerate() {
                        if i > 0 {
                            ts.space().push(connective.clone()).space();
                        }
                        ts.lparen()
                            .append(&filter.to_tokens_for_dialect(dialect))
                            .rparen();
                    }
                }
            },
        }
        ts
    }

    /// Predicate text for a dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

// =============================================================================
// FilterSet
// =============================================================================

/// At most one filter per field, in insertion order.
///
/// A group counts as a filter on each of its fields, so inserting a filter
/// evicts every entry that shares a field with it. Replacing a filter moves
/// it to the end.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    entries: Vec<(String, Filter)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a filter, evicting any filter with the same key or an
    /// overlapping field.
    ///
    /// Returns whether anything was evicted.
    pub fn replace(&mut self, filter: Filter) -> bool {
        let key = filter.key();
        let ids: BTreeSet<String> = filter
            .fields()
            .iter()
            .map(|f| f.id().to_string())
            .collect();
        let before = self.entries.len();
        self.entries.retain(|(k, existing)| {
            *k != key && !existing.fields().iter().any(|f| ids.contains(f.id()))
        });
        let replaced = self.entries.len() != before;
        self.entries.push((key, filter));
        replaced
    }

    /// Remove the filter involving `field`, if any. Groups are removed
    /// whole.
    pub fn remove(&mut self, field: &Field) -> Option<Filter> {
        let idx = self.position(field)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn remove_key(&mut self, key: &str) -> Option<Filter> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// The filter involving `field`, if any.
    pub fn get(&self, field: &Field) -> Option<&Filter> {
        self.position(field).map(|idx| &self.entries[idx].1)
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.get(field).is_some()
    }

    fn position(&self, field: &Field) -> Option<usize> {
        self.entries
            .iter()
            .position(|(_, f)| f.fields().iter().any(|g| g.id() == field.id()))
    }

    /// Add values to the membership filter on `field`, creating it if absent.
    ///
    /// A non-membership filter on the same field is replaced.
    pub fn add_values<V: Into<Value>>(&mut self, field: &Field, values: impl IntoIterator<Item = V>) {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| k == field.id()) {
            if existing.add_values(values.iter().cloned()) {
                return;
            }
        }
        self.replace(Filter::membership(field, values));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.entries.iter().map(|(_, f)| f)
    }

    /// Owned copy of the filters, in insertion order.
    pub fn to_vec(&self) -> Vec<Filter> {
        self.iter().cloned().collect()
    }

    /// All filters joined with `AND`.
    pub fn to_filter(&self) -> Filter {
        Filter::and(self.to_vec())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for filter in iter {
            set.replace(filter);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = Box<dyn Iterator<Item = &'a Filter> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
