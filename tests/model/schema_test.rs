use std::collections::BTreeSet;

use panelql::dialect::Dialect;
use panelql::model::{Codec, Field, FieldFactory, ModelError, Schema, Template};

fn tables(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn keys() -> (FieldFactory, Field, Field, Field, Field) {
    let mut f = FieldFactory::new();
    let store_id = f.column("sales", "store_id", Codec::number()).unwrap();
    let store_key = f.column("stores", "id", Codec::number()).unwrap();
    let day_id = f.column("sales", "day_id", Codec::number()).unwrap();
    let day_key = f.column("days", "id", Codec::number()).unwrap();
    (f, store_id, store_key, day_id, day_key)
}

#[test]
fn test_fact_only_query_has_no_join() {
    let (_, store_id, store_key, _, _) = keys();
    let schema = Schema::star(vec![(store_id, store_key)]).unwrap();
    let from = schema.resolve_join(&tables(&["sales"]));
    assert_eq!(from.to_tokens().serialize(Dialect::DuckDb), "sales");
    assert_eq!(from.join_count(), 0);
}

#[test]
fn test_dimension_query_joins_once() {
    let (_, store_id, store_key, _, _) = keys();
    let schema = Schema::star(vec![(store_id, store_key)]).unwrap();
    let from = schema.resolve_join(&tables(&["sales", "stores"]));
    assert_eq!(
        from.to_tokens().serialize(Dialect::DuckDb),
        "(sales INNER JOIN stores ON sales.store_id = stores.id)"
    );
    assert_eq!(from.tables(), vec!["sales", "stores"]);
}

#[test]
fn test_dimension_only_query_still_reads_fact() {
    let (_, store_id, store_key, day_id, day_key) = keys();
    let schema = Schema::star(vec![(store_id, store_key), (day_id, day_key)]).unwrap();
    let from = schema.resolve_join(&tables(&["days"]));
    assert_eq!(
        from.to_tokens().serialize(Dialect::DuckDb),
        "(sales INNER JOIN days ON sales.day_id = days.id)"
    );
}

#[test]
fn test_joins_follow_declaration_order() {
    let (_, store_id, store_key, day_id, day_key) = keys();
    let schema = Schema::star(vec![(day_id, day_key), (store_id, store_key)]).unwrap();
    let from = schema.resolve_join(&tables(&["stores", "days", "sales"]));
    assert_eq!(from.tables(), vec!["sales", "days", "stores"]);
    assert_eq!(from.join_count(), 2);
}

#[test]
fn test_empty_star_rejected() {
    assert_eq!(Schema::star(vec![]).unwrap_err(), ModelError::EmptyStar);
}

#[test]
fn test_multi_table_key_rejected() {
    let (mut f, store_id, store_key, _, _) = keys();
    let mixed = f
        .computed(
            "mixed",
            Template::dimension("{} + {}", &[&store_id, &store_key]),
            Codec::number(),
        )
        .unwrap();
    let err = Schema::star(vec![(mixed, store_key)]).unwrap_err();
    assert_eq!(
        err,
        ModelError::MultiTableJoinField {
            field: "mixed".to_string(),
            tables: vec!["sales".to_string(), "stores".to_string()],
        }
    );
}

#[test]
fn test_multiple_fact_tables_rejected() {
    let (mut f, store_id, store_key, _, day_key) = keys();
    let returns_day = f.column("returns", "day_id", Codec::number()).unwrap();
    let err = Schema::star(vec![(store_id, store_key), (returns_day, day_key)]).unwrap_err();
    assert_eq!(
        err,
        ModelError::MultipleFactTables(vec!["returns".to_string(), "sales".to_string()])
    );
}

#[test]
fn test_dimension_joined_twice_rejected() {
    let (_, store_id, store_key, day_id, _) = keys();
    let err = Schema::star(vec![(store_id, store_key.clone()), (day_id, store_key)]).unwrap_err();
    assert_eq!(err, ModelError::DuplicateDimension("stores".to_string()));
    assert_eq!(
        err.to_string(),
        "table stores cannot be joined with multiple keys to fact table"
    );
}

#[test]
fn test_single_table_ignores_touched_tables() {
    let schema = Schema::table("events");
    let from = schema.resolve_join(&tables(&["anything"]));
    assert_eq!(from.to_tokens().serialize(Dialect::DuckDb), "events");
}
