//! Statement shapes - the aggregation query and its staged pagination batch.
//!
//! Field expressions and filter predicates arrive as token streams that
//! already carry the author's SQL; this module only decides where each
//! piece goes and which keywords join them.

use serde::{Deserialize, Serialize};

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Select Expression (expression with optional alias)
// =============================================================================

/// A SELECT list item.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: TokenStream,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: impl Into<TokenStream>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    /// A select item for pre-rendered expression text.
    pub fn raw(expr: &str) -> Self {
        Self::new(Token::Raw(expr.to_string()))
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.clone();
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// FROM clause
// =============================================================================

/// Table source: a single table, or a left-deep chain of inner joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromClause {
    /// Table name emitted verbatim, as written in the schema.
    Table(String),
    /// Table name quoted for the dialect (staging tables).
    Quoted(String),
    /// `(left INNER JOIN table ON left_key = right_key)`
    InnerJoin {
        left: Box<FromClause>,
        table: String,
        left_key: String,
        right_key: String,
    },
}

impl FromClause {
    pub fn table(name: &str) -> Self {
        FromClause::Table(name.to_string())
    }

    /// Wrap this clause in an inner join with another table.
    pub fn inner_join(self, table: &str, left_key: &str, right_key: &str) -> Self {
        FromClause::InnerJoin {
            left: Box::new(self),
            table: table.to_string(),
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
        }
    }

    /// Every table named by this clause, outermost join last.
    pub fn tables(&self) -> Vec<&str> {
        match self {
            FromClause::Table(name) | FromClause::Quoted(name) => vec![name.as_str()],
            FromClause::InnerJoin { left, table, .. } => {
                let mut tables = left.tables();
                tables.push(table.as_str());
                tables
            }
        }
    }

    /// Number of joins applied.
    pub fn join_count(&self) -> usize {
        match self {
            FromClause::Table(_) | FromClause::Quoted(_) => 0,
            FromClause::InnerJoin { left, .. } => left.join_count() + 1,
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            FromClause::Table(name) => {
                ts.raw(name.as_str());
            }
            FromClause::Quoted(name) => {
                ts.push(Token::Ident(name.clone()));
            }
            FromClause::InnerJoin {
                left,
                table,
                left_key,
                right_key,
            } => {
                ts.lparen()
                    .append(&left.to_tokens())
                    .space()
                    .push(Token::Inner)
                    .space()
                    .push(Token::Join)
                    .space()
                    .raw(table.as_str())
                    .space()
                    .push(Token::On)
                    .space()
                    .raw(left_key.as_str())
                    .space()
                    .push(Token::Eq)
                    .space()
                    .raw(right_key.as_str())
                    .rparen();
            }
        }
        ts
    }
}

// =============================================================================
// GROUP BY / ORDER BY / LIMIT
// =============================================================================

/// How the aggregation groups rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Grouping {
    /// No GROUP BY clause.
    #[default]
    None,
    /// `GROUP BY ALL`
    All,
    /// `GROUP BY e1, e2, ...`; omitted when empty.
    Exprs(Vec<TokenStream>),
}

impl Grouping {
    /// Implicit grouping over the selected non-aggregate expressions.
    ///
    /// Uses `GROUP BY ALL` where the dialect has it, otherwise the explicit
    /// expression list.
    pub fn implicit(dialect: Dialect, non_aggregates: Vec<TokenStream>) -> Self {
        if dialect.supports_group_by_all() {
            Grouping::All
        } else {
            Grouping::Exprs(non_aggregates)
        }
    }

    fn to_tokens(&self) -> Option<TokenStream> {
        match self {
            Grouping::None => None,
            Grouping::All => Some(Token::GroupByAll.into()),
            Grouping::Exprs(exprs) if exprs.is_empty() => None,
            Grouping::Exprs(exprs) => {
                let mut ts = TokenStream::from(Token::GroupBy);
                ts.space().comma_separated(exprs);
                Some(ts)
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: TokenStream,
    pub dir: Option<OrderDirection>,
}

impl OrderByExpr {
    pub fn new(expr: impl Into<TokenStream>) -> Self {
        Self {
            expr: expr.into(),
            dir: None,
        }
    }

    pub fn with_direction(mut self, dir: OrderDirection) -> Self {
        self.dir = Some(dir);
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.clone();
        if let Some(dir) = self.dir {
            ts.space().push(match dir {
                OrderDirection::Asc => Token::Asc,
                OrderDirection::Desc => Token::Desc,
            });
        }
        ts
    }
}

/// LIMIT and OFFSET clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        dialect.emit_limit_offset(self.limit, self.offset)
    }
}

// =============================================================================
// Query
// =============================================================================

/// A single SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql() or to_tokens()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<FromClause>,
    /// Conjunction of predicates, each parenthesised.
    pub where_clause: Vec<TokenStream>,
    pub group_by: Grouping,
    /// Conjunction of predicates, each parenthesised.
    pub having: Vec<TokenStream>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: LimitOffset,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, exprs: Vec<SelectExpr>) -> Self {
        self.select = exprs;
        self
    }

    pub fn from(mut self, from: FromClause) -> Self {
        self.from = Some(from);
        self
    }

    /// Add a WHERE predicate (ANDed with existing ones).
    pub fn filter(mut self, predicate: TokenStream) -> Self {
        self.where_clause.push(predicate);
        self
    }

    pub fn group_by(mut self, grouping: Grouping) -> Self {
        self.group_by = grouping;
        self
    }

    /// Add a HAVING predicate (ANDed with existing ones).
    pub fn having(mut self, predicate: TokenStream) -> Self {
        self.having.push(predicate);
        self
    }

    pub fn order_by(mut self, exprs: Vec<OrderByExpr>) -> Self {
        self.order_by = exprs;
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit_offset.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Self {
        self.limit_offset.offset = offset;
        self
    }

    /// Convert to token stream for the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        self.emit(dialect, None)
    }

    /// Emit the statement, optionally with an extra trailing select item.
    fn emit(&self, dialect: Dialect, extra: Option<&SelectExpr>) -> TokenStream {
        let mut ts = TokenStream::from(Token::Select);
        ts.space();

        let mut items: Vec<TokenStream> = self.select.iter().map(SelectExpr::to_tokens).collect();
        if let Some(extra) = extra {
            items.push(extra.to_tokens());
        }
        if items.is_empty() {
            ts.push(Token::Null);
        } else {
            ts.comma_separated(&items);
        }

        if let Some(from) = &self.from {
            ts.space().push(Token::From).space().append(&from.to_tokens());
        }

        if !self.where_clause.is_empty() {
            ts.space().push(Token::Where).space();
            emit_conjunction(&mut ts, &self.where_clause);
        }

        if let Some(grouping) = self.group_by.to_tokens() {
            ts.space().append(&grouping);
        }

        if !self.having.is_empty() {
            ts.space().push(Token::Having).space();
            emit_conjunction(&mut ts, &self.having);
        }

        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            ts.comma_separated(&self.order_tokens());
        }

        let pagination = self.limit_offset.to_tokens(dialect);
        if !pagination.is_empty() {
            ts.space().append(&pagination);
        }

        ts
    }

    fn order_tokens(&self) -> Vec<TokenStream> {
        self.order_by.iter().map(OrderByExpr::to_tokens).collect()
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl std::fmt::Display for Query {
    /// Formats the query using the default dialect (DuckDB).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

fn emit_conjunction(ts: &mut TokenStream, predicates: &[TokenStream]) {
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            ts.space().push(Token::And).space();
        }
        ts.lparen().append(predicate).rparen();
    }
}

// =============================================================================
// Staged pagination
// =============================================================================

/// Name of the ordering column added to staging tables.
pub const ROW_COLUMN: &str = "panelql_row";

/// Alias given to the i-th selected column inside a staging table.
pub fn staged_column(i: usize) -> String {
    format!("c{i}")
}

/// An ordered group of statements sent to the executor in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "StatementBatch has no effect until sent to a transport"]
pub struct StatementBatch {
    statements: Vec<String>,
    rows_at: usize,
    count_at: Option<usize>,
}

impl StatementBatch {
    /// A batch of one statement whose rows are the result.
    pub fn single(sql: String) -> Self {
        Self {
            statements: vec![sql],
            rows_at: 0,
            count_at: None,
        }
    }

    /// Materialize `query` into `staging_table`, count it, then page it.
    ///
    /// The staged copy is grouped explicitly on every dialect, since a
    /// window column cannot take part in `GROUP BY ALL`.
    pub fn staged(
        query: &Query,
        non_aggregates: Vec<TokenStream>,
        staging_table: &str,
        dialect: Dialect,
    ) -> Self {
        let width = query.select.len();

        let mut inner = query.clone();
        inner.limit_offset = LimitOffset::default();
        inner.order_by = Vec::new();
        if inner.group_by != Grouping::None {
            inner.group_by = Grouping::Exprs(non_aggregates);
        }
        inner.select = query
            .select
            .iter()
            .enumerate()
            .map(|(i, item)| SelectExpr::new(item.expr.clone()).with_alias(&staged_column(i)))
            .collect();

        let mut window = TokenStream::from(Token::FunctionName("row_number".into()));
        window
            .lparen()
            .rparen()
            .space()
            .push(Token::Over)
            .space()
            .lparen();
        if !query.order_by.is_empty() {
            window
                .push(Token::OrderBy)
                .space()
                .comma_separated(&query.order_tokens());
        }
        window.rparen();
        let row_number = SelectExpr::new(window).with_alias(ROW_COLUMN);

        let staging = Token::Ident(staging_table.to_string());

        let mut drop = TokenStream::from(Token::Drop);
        drop.space()
            .push(Token::Table)
            .space()
            .push(Token::IfExists)
            .space()
            .push(staging.clone());

        let mut create = TokenStream::from(Token::Create);
        create
            .space()
            .push(Token::Temporary)
            .space()
            .push(Token::Table)
            .space()
            .push(staging.clone())
            .space()
            .push(Token::As)
            .space()
            .append(&inner.emit(dialect, Some(&row_number)));

        let mut count = TokenStream::from(Token::Select);
        count
            .space()
            .push(Token::FunctionName("count".into()))
            .lparen()
            .push(Token::Star)
            .rparen()
            .space()
            .push(Token::From)
            .space()
            .push(staging);

        let page = Query {
            select: (0..width)
                .map(|i| SelectExpr::new(Token::Ident(staged_column(i))))
                .collect(),
            from: Some(FromClause::Quoted(staging_table.to_string())),
            order_by: vec![OrderByExpr::new(Token::Ident(ROW_COLUMN.to_string()))],
            limit_offset: query.limit_offset,
            ..Query::default()
        };

        Self {
            statements: vec![
                drop.serialize(dialect),
                create.serialize(dialect),
                count.serialize(dialect),
                page.to_sql(dialect),
            ],
            rows_at: 3,
            count_at: Some(2),
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Index of the statement whose rows are the page.
    pub fn rows_index(&self) -> usize {
        self.rows_at
    }

    /// Index of the statement returning the total row count, if staged.
    pub fn count_index(&self) -> Option<usize> {
        self.count_at
    }

    pub fn is_staged(&self) -> bool {
        self.count_at.is_some()
    }
}
