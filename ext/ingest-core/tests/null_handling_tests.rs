use ingest_core::*;

mod test_helpers;
use test_helpers::*;

fn every_column_type() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("BOOL", ColumnType::Boolean),
        ColumnDescriptor::new("FIXED", ColumnType::Fixed).with_precision_scale(10, 2),
        ColumnDescriptor::new("REAL", ColumnType::Real),
        ColumnDescriptor::new("TEXT", ColumnType::Binary).with_utf8(true),
        ColumnDescriptor::new("ARRAY", ColumnType::JsonArray),
        ColumnDescriptor::new("OBJECT", ColumnType::JsonObject),
        ColumnDescriptor::new("VARIANT", ColumnType::Variant),
        ColumnDescriptor::new("TS", ColumnType::Timestamp),
        ColumnDescriptor::new("TIME", ColumnType::Time),
        ColumnDescriptor::new("DATE", ColumnType::Date),
    ]
}

#[test]
fn test_nullable_columns_accept_nulls() {
    for column in every_column_type() {
        let (results, stats) =
            convert_column(&column, &[RuntimeValue::Null, RuntimeValue::Null]);
        assert_eq!(results, vec![Ok(Cell::Null), Ok(Cell::Null)], "{}", column.name);
        assert_eq!(stats.null_count, 2);
        assert!(!stats.has_values());
    }
}

#[test]
fn test_required_columns_reject_nulls() {
    for column in every_column_type() {
        let column = column.with_nullable(false);
        let err = convert_value(&column, RuntimeValue::Null).unwrap_err();
        assert_eq!(err, ConvertError::NullNotAllowed, "{}", column.name);
        assert_eq!(err.to_string(), "unexpected null value");
    }
}

#[test]
fn test_nulls_in_chunk() {
    let schema = ChunkSchema::new(every_column_type()).unwrap();
    let rows = vec![vec![RuntimeValue::Null; schema.len()]; 3];
    let chunk = build_chunk(schema, &rows).unwrap();

    assert!(chunk.cells().cells().iter().all(Cell::is_null));
    for summary in chunk.summaries() {
        assert_eq!(summary.null_count, 3);
        assert!(summary.min_int.is_none());
        assert!(summary.min_real.is_none());
        assert!(summary.min_str_hex.is_none());
    }
}

#[test]
fn test_null_inside_json_is_a_value() {
    let column = ColumnDescriptor::new("V", ColumnType::Variant).with_nullable(false);
    let cell = convert_value(&column, RuntimeValue::Array(vec![RuntimeValue::Null])).unwrap();
    assert_eq!(cell, Cell::ByteArray(bytes::Bytes::from_static(b"[null]")));
}

#[test]
fn test_missing_keys_become_nulls() {
    let schema = create_test_schema();
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(r#"[{"ID": 1, "ACTIVE": false}]"#).unwrap();
    let rows = project_objects(&schema, &records);
    let chunk = build_chunk(schema, &rows).unwrap();

    let stats = chunk.stats();
    assert_eq!(stats[1].null_count, 1);
    assert_eq!(stats[2].null_count, 1);
    assert_eq!(stats[4].null_count, 1);
    assert_eq!(stats[0].null_count, 0);
}

#[test]
fn test_missing_required_key_fails() {
    let schema = create_test_schema();
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(r#"[{"ID": 1}]"#).unwrap();
    let rows = project_objects(&schema, &records);
    let err = build_chunk(schema, &rows).unwrap_err();

    match err {
        IngestError::Conversion { row, column, source } => {
            assert_eq!(row, 0);
            assert_eq!(column, "ACTIVE");
            assert_eq!(source, ConvertError::NullNotAllowed);
        }
        other => panic!("unexpected error: {other}"),
    }
}
