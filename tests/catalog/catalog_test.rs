use panelql::catalog::{data_type_for, Catalog, TableDescription};
use panelql::model::{DataType, FieldFactory, IdStyle, ModelError, Schema, Value};
use serde_json::json;

fn described() -> Vec<TableDescription> {
    serde_json::from_value(json!([
        {
            "name": "sales",
            "columns": [
                { "name": "store_id", "type": "INTEGER", "nullable": "NO" },
                { "name": "amount", "type": "DECIMAL(18,2)", "nullable": "YES" },
                { "name": "sold_at", "type": "TIMESTAMP WITH TIME ZONE", "nullable": "NO" }
            ]
        },
        {
            "name": "stores",
            "columns": [
                { "name": "id", "type": "BIGINT", "nullable": false },
                { "name": "name", "type": "VARCHAR" },
                { "name": "open", "type": "BOOLEAN", "nullable": true }
            ]
        }
    ]))
    .unwrap()
}

#[test]
fn test_type_prefix_mapping() {
    assert_eq!(data_type_for("INTEGER"), DataType::Number);
    assert_eq!(data_type_for("double"), DataType::Number);
    assert_eq!(data_type_for("DECIMAL(10,2)"), DataType::Number);
    assert_eq!(data_type_for("DATE"), DataType::Date);
    assert_eq!(data_type_for("TIMESTAMP_NS"), DataType::Date);
    assert_eq!(data_type_for("BOOLEAN"), DataType::Boolean);
    assert_eq!(data_type_for("VARCHAR"), DataType::String);
    assert_eq!(data_type_for("HUGEINT"), DataType::String);
}

#[test]
fn test_declare_fields_per_table() {
    let mut factory = FieldFactory::new();
    let catalog = Catalog::declare(&mut factory, &described()).unwrap();

    assert_eq!(catalog.table_names().collect::<Vec<_>>(), vec!["sales", "stores"]);
    assert_eq!(catalog.table("sales").map(<[_]>::len), Some(3));
    assert_eq!(catalog.fields().count(), 6);

    let amount = catalog.field("sales", "amount").unwrap();
    assert_eq!(amount.id(), "sales.amount");
    assert_eq!(amount.codec().data_type(), DataType::Number);
    assert!(amount.codec().is_nullable());
    assert_eq!(amount.codec().parse(&json!(null)).unwrap(), Value::Null);

    let name = catalog.field("stores", "name").unwrap();
    assert_eq!(name.codec().data_type(), DataType::String);
    assert!(!name.codec().is_nullable());
}

#[test]
fn test_declared_fields_build_a_star() {
    let mut factory = FieldFactory::new();
    let catalog = Catalog::declare(&mut factory, &described()).unwrap();
    let schema = Schema::star(vec![(
        catalog.field("sales", "store_id").unwrap().clone(),
        catalog.field("stores", "id").unwrap().clone(),
    )]);
    assert!(schema.is_ok());
}

#[test]
fn test_bare_ids_collide_across_tables() {
    let mut factory = FieldFactory::new().with_id_style(IdStyle::Bare);
    let tables: Vec<TableDescription> = serde_json::from_value(json!([
        { "name": "a", "columns": [{ "name": "id", "type": "INTEGER" }] },
        { "name": "b", "columns": [{ "name": "id", "type": "INTEGER" }] }
    ]))
    .unwrap();
    let err = Catalog::declare(&mut factory, &tables).unwrap_err();
    assert_eq!(err, ModelError::DuplicateId("id".to_string()));
}

#[test]
fn test_rejects_unknown_nullable_text() {
    let result: Result<Vec<TableDescription>, _> = serde_json::from_value(json!([
        { "name": "a", "columns": [{ "name": "x", "type": "INTEGER", "nullable": "maybe" }] }
    ]));
    assert!(result.is_err());
}

#[test]
fn test_descriptions_from_toml() {
    let text = r#"
        name = "events"

        [[columns]]
        name = "kind"
        type = "VARCHAR"
        nullable = "YES"
    "#;
    let table: TableDescription = toml::from_str(text).unwrap();
    assert_eq!(table.columns[0].type_name, "VARCHAR");
    assert!(table.columns[0].nullable);
}
