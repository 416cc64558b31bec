use std::collections::BTreeSet;

use panelql::model::{Codec, FieldFactory, IdStyle, ModelError, Template, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn duplicate_ids_fail_distinct_ids_succeed(
        ids in prop::collection::vec("[a-z]{1,3}", 1..20)
    ) {
        let mut factory = FieldFactory::new().with_id_style(IdStyle::Bare);
        let mut seen = BTreeSet::new();
        for id in ids {
            let result = factory.column("t", &id, Codec::string());
            if seen.insert(id.clone()) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result.unwrap_err(), ModelError::DuplicateId(id));
            }
        }
    }
}

#[test]
fn test_column_and_computed_share_id_space() {
    let mut f = FieldFactory::new();
    let amount = f.column("sales", "amount", Codec::number()).unwrap();
    let err = f
        .computed("sales.amount", Template::metric("sum({})", &[&amount]), Codec::number())
        .unwrap_err();
    assert_eq!(err, ModelError::DuplicateId("sales.amount".to_string()));
}

#[test]
fn test_metric_over_two_tables() {
    let mut f = FieldFactory::new();
    let price = f.column("stores", "markup", Codec::number()).unwrap();
    let amount = f.column("sales", "amount", Codec::number()).unwrap();
    let marked_up = f
        .computed(
            "marked_up",
            Template::metric("sum({} * {})", &[&amount, &price]),
            Codec::number(),
        )
        .unwrap();

    assert_eq!(marked_up.expression(), "sum(sales.amount * stores.markup)");
    assert!(marked_up.is_aggregate());
    assert_eq!(
        marked_up.tables().iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["sales", "stores"]
    );
}

#[test]
fn test_dimension_over_metric_is_aggregate() {
    let mut f = FieldFactory::new();
    let amount = f.column("sales", "amount", Codec::number()).unwrap();
    let total = f
        .computed("total", Template::metric("sum({})", &[&amount]), Codec::number())
        .unwrap();
    let rounded = f
        .computed("rounded", Template::dimension("round({})", &[&total]), Codec::number())
        .unwrap();
    assert!(rounded.is_aggregate());
    assert_eq!(rounded.expression(), "round(sum(sales.amount))");
}

#[test]
fn test_indexed_placeholders() {
    let mut f = FieldFactory::new();
    let a = f.column("t", "a", Codec::number()).unwrap();
    let b = f.column("t", "b", Codec::number()).unwrap();
    let ratio = f
        .computed("ratio", Template::metric("sum({1}) / sum({0})", &[&a, &b]), Codec::number())
        .unwrap();
    assert_eq!(ratio.expression(), "sum(t.b) / sum(t.a)");
}

#[test]
fn test_template_arity_does_not_consume_id() {
    let mut f = FieldFactory::new();
    let a = f.column("t", "a", Codec::number()).unwrap();
    let err = f
        .computed("x", Template::metric("{} + {}", &[&a]), Codec::number())
        .unwrap_err();
    assert!(matches!(err, ModelError::TemplateArity { placeholder: 1, fields: 1, .. }));
    assert!(!f.is_declared("x"));
    assert!(f
        .computed("x", Template::metric("sum({})", &[&a]), Codec::number())
        .is_ok());
}

#[test]
fn test_display_configuration() {
    let mut f = FieldFactory::new();
    let amount = f.column("sales", "amount", Codec::number().nullable()).unwrap();

    assert_eq!(amount.label(), "sales.amount");
    assert_eq!(amount.format(&Value::Number(1500.0)), "1,500");
    assert_eq!(amount.format(&Value::Null), "<NULL>");

    amount.configure("Amount", |v| match v {
        Value::Number(n) => format!("${n:.2}"),
        _ => "-".to_string(),
    });
    assert_eq!(amount.label(), "Amount");
    assert_eq!(amount.format(&Value::Number(3.5)), "$3.50");
    assert_eq!(amount.format(&Value::Null), "-");
}

#[test]
fn test_display_configuration_is_shared_by_clones() {
    let mut f = FieldFactory::new();
    let region = f.column("sales", "region", Codec::string()).unwrap();
    let copy = region.clone();
    region.with_label("Region");
    assert_eq!(copy.label(), "Region");
    assert_eq!(copy, region);
}
