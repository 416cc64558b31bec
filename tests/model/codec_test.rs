use chrono::{TimeZone, Utc};
use panelql::dialect::Dialect;
use panelql::model::{Codec, DataType, DecodeError, Value};
use proptest::prelude::*;
use serde_json::json;

fn any_value_for(data_type: DataType) -> BoxedStrategy<Value> {
    let value = match data_type {
        DataType::String => any::<String>().prop_map(Value::String).boxed(),
        DataType::Number => any::<f64>()
            .prop_filter("finite", |n| n.is_finite())
            .prop_map(Value::Number)
            .boxed(),
        DataType::Boolean => any::<bool>().prop_map(Value::Boolean).boxed(),
        // Nanosecond precision, years 1970..2100
        DataType::Date => (0i64..4_102_444_800_000_000_000)
            .prop_map(|ns| Value::Date(Utc.timestamp_nanos(ns)))
            .boxed(),
    };
    prop_oneof![9 => value, 1 => Just(Value::Null)].boxed()
}

fn any_data_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::String),
        Just(DataType::Number),
        Just(DataType::Boolean),
        Just(DataType::Date),
    ]
}

proptest! {
    #[test]
    fn encode_then_parse_yields_original(
        (data_type, value) in any_data_type().prop_flat_map(|t| (Just(t), any_value_for(t)))
    ) {
        let codec = Codec::of(data_type).nullable();
        let cell = codec.encode(&value);
        prop_assert_eq!(codec.parse(&cell).unwrap(), value);
    }

    #[test]
    fn escaped_strings_never_break_out_of_the_literal(s in ".*") {
        let literal = Codec::string().escape(&Value::String(s.clone()));
        prop_assert!(literal.starts_with('\'') && literal.ends_with('\''));
        let inner = &literal[1..literal.len() - 1];
        prop_assert_eq!(inner.replace("''", ""), s.replace('\'', ""));
    }
}

#[test]
fn test_null_decodes_for_every_codec() {
    for codec in [Codec::string(), Codec::number(), Codec::boolean(), Codec::date()] {
        assert_eq!(codec.parse(&json!(null)).unwrap(), Value::Null);
    }
}

#[test]
fn test_number_accepts_decimal_text() {
    assert_eq!(
        Codec::number().parse(&json!("12345678901234.5")).unwrap(),
        Value::Number(12_345_678_901_234.5)
    );
}

#[test]
fn test_number_rejects_non_numeric_text() {
    let err = Codec::number().parse(&json!("twelve")).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnexpectedCell {
            expected: DataType::Number,
            found: "\"twelve\"".to_string(),
        }
    );
}

#[test]
fn test_date_accepts_database_timestamps() {
    let expected = Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    for raw in [
        "2024-01-02T03:04:05Z",
        "2024-01-02 03:04:05",
        "2024-01-02 03:04:05+00",
    ] {
        assert_eq!(Codec::date().parse(&json!(raw)).unwrap(), expected, "{raw}");
    }
    assert_eq!(
        Codec::date().parse(&json!("2024-01-02")).unwrap(),
        Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_microsecond_dates_survive_escape_and_encode() {
    let codec = Codec::date();
    let fetched = codec.parse(&json!("2024-01-02 03:04:05.123456")).unwrap();
    assert_eq!(codec.parse(&codec.encode(&fetched)).unwrap(), fetched);
    assert_eq!(
        codec.escape_for_dialect(&fetched, Dialect::Postgres),
        "TIMESTAMPTZ '2024-01-02T03:04:05.123456Z'"
    );
}

#[test]
fn test_date_rejects_garbage() {
    assert!(matches!(
        Codec::date().parse(&json!("yesterday")),
        Err(DecodeError::InvalidDate(_))
    ));
}

#[test]
fn test_escape_per_dialect() {
    let value = Value::Boolean(true);
    assert_eq!(Codec::boolean().escape_for_dialect(&value, Dialect::DuckDb), "TRUE");
    assert_eq!(Codec::string().escape_for_dialect(&Value::Null, Dialect::MySql), "NULL");
}

#[test]
fn test_format_for_display() {
    let codec = Codec::number();
    assert_eq!(codec.format(&Value::Number(1234567.891)), "1,234,567.891");
    assert_eq!(codec.format(&Value::Number(-0.5)), "-0.5");
    assert_eq!(codec.format(&Value::Null), "<NULL>");
}
