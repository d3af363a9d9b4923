//! Best-effort coercion of runtime values into the primitive shapes the
//! converters need
//!
//! Each function accepts every kind that has an obvious reading as the target
//! and otherwise names both the expected and the actual kind in its error.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;

use crate::error::ConvertError;
use crate::value::RuntimeValue;

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn unsupported(expected: &'static str, value: &RuntimeValue) -> ConvertError {
    ConvertError::UnsupportedNativeType {
        expected,
        actual: value.type_name(),
    }
}

fn unparseable(expected: &'static str, input: impl ToString) -> ConvertError {
    ConvertError::Unparseable {
        expected,
        input: input.to_string(),
    }
}

pub fn as_bool(value: &RuntimeValue) -> Result<bool, ConvertError> {
    use RuntimeValue::*;

    Ok(match value {
        Boolean(b) => *b,
        Int8(i) => *i != 0,
        Int16(i) => *i != 0,
        Int32(i) => *i != 0,
        Int64(i) => *i != 0,
        UInt8(i) => *i != 0,
        UInt16(i) => *i != 0,
        UInt32(i) => *i != 0,
        UInt64(i) => *i != 0,
        Float32(f) => f.0 != 0.0,
        Float64(f) => f.0 != 0.0,
        Number(n) => n.trim().parse::<f64>().map_err(|_| unparseable("bool", n))? != 0.0,
        String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(unparseable("bool", s)),
        },
        _ => return Err(unsupported("bool", value)),
    })
}

pub fn as_f64(value: &RuntimeValue) -> Result<f64, ConvertError> {
    use RuntimeValue::*;

    Ok(match value {
        Int8(i) => f64::from(*i),
        Int16(i) => f64::from(*i),
        Int32(i) => f64::from(*i),
        Int64(i) => *i as f64,
        UInt8(i) => f64::from(*i),
        UInt16(i) => f64::from(*i),
        UInt32(i) => f64::from(*i),
        UInt64(i) => *i as f64,
        Float32(f) => f64::from(f.0),
        Float64(f) => f.0,
        Number(s) | String(s) => s.trim().parse::<f64>().map_err(|_| unparseable("number", s))?,
        _ => return Err(unsupported("number", value)),
    })
}

pub fn as_i64(value: &RuntimeValue) -> Result<i64, ConvertError> {
    use RuntimeValue::*;

    Ok(match value {
        Int8(i) => i64::from(*i),
        Int16(i) => i64::from(*i),
        Int32(i) => i64::from(*i),
        Int64(i) => *i,
        UInt8(i) => i64::from(*i),
        UInt16(i) => i64::from(*i),
        UInt32(i) => i64::from(*i),
        UInt64(i) => i64::try_from(*i).map_err(|_| unparseable("int64", i))?,
        Float32(f) => float_to_i64(f64::from(f.0))?,
        Float64(f) => float_to_i64(f.0)?,
        Number(s) | String(s) => s.trim().parse::<i64>().map_err(|_| unparseable("int64", s))?,
        _ => return Err(unsupported("number", value)),
    })
}

fn float_to_i64(f: f64) -> Result<i64, ConvertError> {
    // 2^63 is exactly representable, so the bounds are exact
    if f.fract() != 0.0 || !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&f) {
        return Err(unparseable("int64", f));
    }
    Ok(f as i64)
}

/// Raw bytes for a binary or text column.
///
/// Scalars become their textual form and structured values their canonical
/// JSON, so only a null has no byte reading.
pub fn as_bytes(value: &RuntimeValue) -> Result<Bytes, ConvertError> {
    use RuntimeValue::*;

    Ok(match value {
        Bytes(b) => b.clone(),
        String(s) | Number(s) => bytes::Bytes::copy_from_slice(s.as_bytes()),
        Boolean(b) => bytes::Bytes::from(b.to_string()),
        Int8(i) => bytes::Bytes::from(i.to_string()),
        Int16(i) => bytes::Bytes::from(i.to_string()),
        Int32(i) => bytes::Bytes::from(i.to_string()),
        Int64(i) => bytes::Bytes::from(i.to_string()),
        UInt8(i) => bytes::Bytes::from(i.to_string()),
        UInt16(i) => bytes::Bytes::from(i.to_string()),
        UInt32(i) => bytes::Bytes::from(i.to_string()),
        UInt64(i) => bytes::Bytes::from(i.to_string()),
        Float32(f) => bytes::Bytes::from(f.to_string()),
        Float64(f) => bytes::Bytes::from(f.to_string()),
        Timestamp(t) => bytes::Bytes::from(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Array(_) | Object(_) => bytes::Bytes::from(value.to_canonical_json()?),
        Null => return Err(unsupported("bytes", value)),
    })
}

/// Read a value as an instant.
///
/// Text must be RFC 3339; numbers are seconds since the Unix epoch.
pub fn as_timestamp(value: &RuntimeValue) -> Result<DateTime<FixedOffset>, ConvertError> {
    use RuntimeValue::*;

    match value {
        Timestamp(t) => Ok(*t),
        String(s) => parse_rfc3339(s),
        Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => parse_rfc3339(s),
            Err(_) => Err(ConvertError::TimestampParse {
                input: std::string::String::from_utf8_lossy(b).into_owned(),
            }),
        },
        Int8(i) => from_unix_seconds(i64::from(*i)),
        Int16(i) => from_unix_seconds(i64::from(*i)),
        Int32(i) => from_unix_seconds(i64::from(*i)),
        Int64(i) => from_unix_seconds(*i),
        UInt8(i) => from_unix_seconds(i64::from(*i)),
        UInt16(i) => from_unix_seconds(i64::from(*i)),
        UInt32(i) => from_unix_seconds(i64::from(*i)),
        UInt64(i) => i64::try_from(*i)
            .map_err(|_| unparseable("timestamp", i))
            .and_then(from_unix_seconds),
        Float32(f) => from_fractional_unix_seconds(f64::from(f.0)),
        Float64(f) => from_fractional_unix_seconds(f.0),
        Number(n) => n
            .trim()
            .parse::<f64>()
            .map_err(|_| unparseable("timestamp", n))
            .and_then(from_fractional_unix_seconds),
        _ => Err(unsupported("timestamp", value)),
    }
}

pub fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>, ConvertError> {
    DateTime::parse_from_rfc3339(s.trim()).map_err(|_| ConvertError::TimestampParse {
        input: s.to_string(),
    })
}

/// Parse RFC 3339 text, falling back to a zone-less date-time interpreted in
/// `zone`. Wall-clock times repeated by a DST change resolve to the earlier
/// instant; times skipped by one are rejected.
pub fn parse_timestamp_in_zone(s: &str, zone: Tz) -> Result<DateTime<FixedOffset>, ConvertError> {
    let trimmed = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(t);
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|naive| zone.from_local_datetime(&naive).earliest())
        .map(|t| t.fixed_offset())
        .ok_or_else(|| ConvertError::TimestampParse {
            input: s.to_string(),
        })
}

fn from_unix_seconds(secs: i64) -> Result<DateTime<FixedOffset>, ConvertError> {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.fixed_offset())
        .ok_or_else(|| unparseable("timestamp", secs))
}

fn from_fractional_unix_seconds(secs: f64) -> Result<DateTime<FixedOffset>, ConvertError> {
    if !secs.is_finite() || secs.abs() >= 9.0e15 {
        return Err(unparseable("timestamp", secs));
    }
    let mut whole = secs.floor() as i64;
    let mut nanos = ((secs - secs.floor()) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        whole += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(whole, nanos)
        .map(|t| t.fixed_offset())
        .ok_or_else(|| unparseable("timestamp", secs))
}
