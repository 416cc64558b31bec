#[path = "../common/mod.rs"]
mod common;

use common::{sales_model, validate_sql};
use insta::assert_snapshot;
use panelql::dialect::Dialect;
use panelql::filter::Filter;
use panelql::model::{Codec, FieldFactory, Schema, Value};
use panelql::query::{build_query, build_statements, decode_rows, QueryOptions, Selection};
use panelql::sql::OrderDirection;
use serde_json::json;

const DIALECTS: [Dialect; 3] = [Dialect::DuckDb, Dialect::Postgres, Dialect::MySql];

#[test]
fn test_non_aggregate_filter_goes_to_where() {
    let m = sales_model();
    let options = QueryOptions::new(
        Selection::new()
            .with("a", &m.region)
            .with("b", &m.revenue),
    )
    .filter(Filter::not_null(&m.region));

    let sql = build_query(&m.schema, &options, Dialect::DuckDb).to_sql(Dialect::DuckDb);
    assert_snapshot!(sql, @"SELECT sales.region, sum(sales.amount) FROM sales WHERE (sales.region IS NOT NULL) GROUP BY ALL ORDER BY sales.region, sum(sales.amount)");
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_aggregate_filter_goes_to_having() {
    let m = sales_model();
    let options = QueryOptions::new(
        Selection::new()
            .with("a", &m.region)
            .with("b", &m.revenue),
    )
    .filter(Filter::not_null(&m.region))
    .filter(Filter::range(&m.revenue, 100, 200));

    let sql = build_query(&m.schema, &options, Dialect::DuckDb).to_sql(Dialect::DuckDb);
    assert_snapshot!(sql, @"SELECT sales.region, sum(sales.amount) FROM sales WHERE (sales.region IS NOT NULL) GROUP BY ALL HAVING (sum(sales.amount) BETWEEN 100 AND 200) ORDER BY sales.region, sum(sales.amount)");
    validate_sql(&sql, Dialect::DuckDb).unwrap();
}

#[test]
fn test_dimension_field_adds_join_and_explicit_grouping() {
    let m = sales_model();
    let options = QueryOptions::new(
        Selection::new()
            .with("store", &m.store_name)
            .with("revenue", &m.revenue),
    )
    .order_by(&m.revenue, OrderDirection::Desc);

    let sql = build_query(&m.schema, &options, Dialect::Postgres).to_sql(Dialect::Postgres);
    assert_snapshot!(sql, @"SELECT stores.name, sum(sales.amount) FROM (sales INNER JOIN stores ON sales.store_id = stores.id) GROUP BY stores.name ORDER BY sum(sales.amount) DESC, stores.name, sum(sales.amount)");
    validate_sql(&sql, Dialect::Postgres).unwrap();
}

#[test]
fn test_filter_on_dimension_joins_it() {
    let m = sales_model();
    let options = QueryOptions::new(Selection::new().with("revenue", &m.revenue))
        .filter(Filter::membership(&m.store_name, ["Main St"]));

    let query = build_query(&m.schema, &options, Dialect::DuckDb);
    let sql = query.to_sql(Dialect::DuckDb);
    assert_eq!(sql.matches("stores").count(), 3, "{sql}");
    assert!(sql.contains("INNER JOIN stores ON sales.store_id = stores.id"));
    assert!(sql.contains("WHERE (stores.name IN ('Main St'))"));
}

#[test]
fn test_order_field_touches_its_table() {
    let m = sales_model();
    let options = QueryOptions::new(Selection::new().with("revenue", &m.revenue))
        .order_by(&m.store_name, OrderDirection::Asc);
    let sql = build_query(&m.schema, &options, Dialect::DuckDb).to_sql(Dialect::DuckDb);
    assert!(sql.contains("INNER JOIN stores"), "{sql}");
}

#[test]
fn test_degenerate_inputs_build() {
    let m = sales_model();
    let empty = QueryOptions::new(Selection::new());
    let sql = build_query(&m.schema, &empty, Dialect::MySql).to_sql(Dialect::MySql);
    assert_eq!(sql, "SELECT NULL FROM sales");

    let none_match = QueryOptions::new(Selection::new().with("r", &m.region))
        .filter(Filter::membership(&m.region, Vec::<Value>::new()));
    let sql = build_query(&m.schema, &none_match, Dialect::DuckDb).to_sql(Dialect::DuckDb);
    assert!(sql.contains("WHERE (sales.region IN ())"), "{sql}");
}

#[test]
fn test_every_dialect_parses() {
    let m = sales_model();
    let options = QueryOptions::new(
        Selection::new()
            .with("store", &m.store_name)
            .with("region", &m.region)
            .with("revenue", &m.revenue),
    )
    .filter(Filter::membership(&m.region, ["north", "south"]))
    .filter(Filter::range(&m.revenue, 0, 1_000))
    .order_by(&m.revenue, OrderDirection::Desc)
    .limit(25);

    for dialect in DIALECTS {
        let sql = build_query(&m.schema, &options, dialect).to_sql(dialect);
        validate_sql(&sql, dialect).unwrap();
    }
}

#[test]
fn test_unpaginated_is_single_statement() {
    let m = sales_model();
    let options = QueryOptions::new(Selection::new().with("r", &m.region));
    let batch = build_statements(&m.schema, &options, "page", Dialect::DuckDb);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.count_index(), None);
}

#[test]
fn test_decode_rows_by_position() {
    let mut f = FieldFactory::new();
    let name = f.column("t", "name", Codec::string()).unwrap();
    let active = f.column("t", "active", Codec::boolean().nullable()).unwrap();
    let selection = Selection::new().with("name", &name).with("active", &active);

    let records = decode_rows(
        &selection,
        &[
            vec![json!("a"), json!(true)],
            vec![json!("b")],
            vec![json!("c"), json!(null), json!("extra")],
        ],
    )
    .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["active"], Value::Boolean(true));
    assert_eq!(records[1]["active"], Value::Null);
    assert_eq!(records[2].len(), 2);
    assert_eq!(records[2]["name"], Value::from("c"));
    assert_eq!(records[2]["missing"], Value::Null);
}

#[test]
fn test_single_table_schema_never_joins() {
    let mut f = FieldFactory::new();
    let a = f.column("events", "kind", Codec::string()).unwrap();
    let options = QueryOptions::new(Selection::new().with("kind", &a));
    let sql = build_query(&Schema::table("events"), &options, Dialect::Postgres)
        .to_sql(Dialect::Postgres);
    assert_snapshot!(sql, @"SELECT events.kind FROM events GROUP BY events.kind ORDER BY events.kind");
}
