use ingest_core::int128::{byte_width, POW10_I128};
use ingest_core::*;
use rand::{Rng, SeedableRng};

mod test_helpers;
use test_helpers::*;

#[test]
fn test_decimal_precision_scale_combinations() {
    let cases: &[(i32, i32, &str, i128)] = &[
        (5, 2, "123.45", 12345),
        (5, 2, "-999.99", -99999),
        (9, 2, "1234567.89", 123456789),
        (18, 0, "999999999999999999", 999_999_999_999_999_999),
        (18, 6, "-0.000001", -1),
        (38, 10, "1.5", 15_000_000_000),
        (38, 0, "-99999999999999999999999999999999999999", -(10i128.pow(38) - 1)),
    ];

    for &(precision, scale, input, expected) in cases {
        let column = ColumnDescriptor::new("D", ColumnType::Fixed).with_precision_scale(precision, scale);
        let cell = convert_value(&column, RuntimeValue::from(input)).unwrap();
        assert_eq!(cell_int(&cell), expected, "({precision},{scale}) {input}");
        assert_eq!(cell.physical_type(), Some(column.buffer_kind().physical_type()));
    }
}

#[test]
fn test_precision_overflow_is_rejected() {
    let column = ColumnDescriptor::new("D", ColumnType::Fixed).with_precision_scale(5, 2);

    for input in [
        RuntimeValue::from("1000.00"),
        RuntimeValue::Int64(1000),
        RuntimeValue::from(1000.0f64),
        RuntimeValue::from("-1000"),
    ] {
        let err = convert_value(&column, input.clone()).unwrap_err();
        assert!(
            matches!(err, ConvertError::Decimal(DecimalError::OutOfRange { precision: 5, scale: 2, .. })),
            "{:?} gave {:?}",
            input,
            err
        );
    }

    // 999.995 rounds up past the precision rather than being truncated into it
    let err = convert_value(&column, RuntimeValue::from("999.995")).unwrap_err();
    assert!(matches!(err, ConvertError::Decimal(DecimalError::OutOfRange { .. })));
    let cell = convert_value(&column, RuntimeValue::from("999.994")).unwrap();
    assert_eq!(cell_int(&cell), 99999);
}

#[test]
fn test_rounding_half_away_from_zero() {
    assert_eq!(Int128::from_string("2.675", 10, 2).unwrap().as_i128(), 268);
    assert_eq!(Int128::from_string("-2.675", 10, 2).unwrap().as_i128(), -268);
    assert_eq!(Int128::from_string("2.674", 10, 2).unwrap().as_i128(), 267);
    assert_eq!(Int128::from_string("0.5", 10, 0).unwrap().as_i128(), 1);
    assert_eq!(Int128::from_string("-0.5", 10, 0).unwrap().as_i128(), -1);
    assert_eq!(Int128::from_string("0.49", 10, 0).unwrap().as_i128(), 0);
}

#[test]
fn test_textual_forms() {
    let parse = |s: &str| Int128::from_string(s, 38, 3).map(Int128::as_i128);

    assert_eq!(parse(" 42 "), Ok(42_000));
    assert_eq!(parse("+1.5"), Ok(1_500));
    assert_eq!(parse(".25"), Ok(250));
    assert_eq!(parse("7."), Ok(7_000));
    assert_eq!(parse("1e3"), Ok(1_000_000));
    assert_eq!(parse("1.5E-2"), Ok(15));
    assert!(matches!(parse(""), Err(DecimalError::Parse { .. })));
    assert!(matches!(parse("1.2.3"), Err(DecimalError::Parse { .. })));
    assert!(matches!(parse("12abc"), Err(DecimalError::Parse { .. })));
    assert!(matches!(parse("e5"), Err(DecimalError::Parse { .. })));
}

#[test]
fn test_float_inputs_use_shortest_text() {
    let column = ColumnDescriptor::new("D", ColumnType::Fixed).with_precision_scale(10, 2);
    let cell = convert_value(&column, RuntimeValue::from(3.3f32)).unwrap();
    assert_eq!(cell_int(&cell), 330);
    let cell = convert_value(&column, RuntimeValue::from(0.1f64 + 0.2f64)).unwrap();
    assert_eq!(cell_int(&cell), 30);

    let err = convert_value(&column, RuntimeValue::from(f64::INFINITY)).unwrap_err();
    assert!(matches!(err, ConvertError::Decimal(DecimalError::NotFinite { .. })));
}

#[test]
fn test_random_integers_round_trip_through_decimal_text() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    for _ in 0..2_000 {
        let precision = rng.random_range(1..=38);
        let scale = rng.random_range(0..=precision);
        let value: i64 = rng.random();
        let column = ColumnDescriptor::new("D", ColumnType::Fixed).with_precision_scale(precision, scale);

        let scaled = i128::from(value).checked_mul(POW10_I128[scale as usize]);
        let fits = scaled.is_some_and(|v| v.abs() < POW10_I128[precision as usize]);

        match convert_value(&column, RuntimeValue::Int64(value)) {
            Ok(cell) => {
                assert!(fits, "{value} accepted at ({precision},{scale})");
                let encoded = Int128::from_i128(cell_int(&cell));
                // decoding gives back the original integer
                let text = encoded.to_decimal_string(scale);
                let reparsed = Int128::from_string(&text, precision, 0).unwrap();
                assert_eq!(reparsed.as_i128(), i128::from(value));
            }
            Err(err) => {
                assert!(!fits, "{value} rejected at ({precision},{scale}): {err}");
                assert!(matches!(err, ConvertError::Decimal(DecimalError::OutOfRange { .. })));
            }
        }
    }
}

#[test]
fn test_rescale_between_scales() {
    let v = Int128::from_i64(12_345);
    assert_eq!(v.rescale_between(2, 10, 4).unwrap().as_i128(), 1_234_500);
    assert_eq!(v.rescale_between(3, 10, 1).unwrap().as_i128(), 123);
    assert_eq!(v.rescale_between(1, 10, 0).unwrap().as_i128(), 1_235);
    assert!(v.rescale_between(0, 5, 1).is_err());
}

#[test]
fn test_big_endian_widths() {
    assert_eq!(byte_width(9), 4);
    assert_eq!(byte_width(18), 8);
    assert_eq!(byte_width(38), 16);

    let v = Int128::from_i64(-2);
    assert_eq!(v.to_big_endian_sized(5), vec![0xFF, 0xFF, 0xFF, 0xFE]);
    assert_eq!(v.to_big_endian_sized(12).len(), 8);
    assert_eq!(v.to_big_endian()[15], 0xFE);
    assert_eq!(Int128::from_i64(258).to_big_endian_sized(3), vec![0, 0, 1, 2]);
}

#[test]
fn test_decimal_string_rendering() {
    assert_eq!(Int128::from_i64(12_345).to_decimal_string(2), "123.45");
    assert_eq!(Int128::from_i64(-5).to_decimal_string(3), "-0.005");
    assert_eq!(Int128::from_i64(7).to_decimal_string(0), "7");
    assert_eq!(Int128::from_i64(7).to_string(), "7");
}
