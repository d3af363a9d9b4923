//! Per-column validation and encoding of runtime values
//!
//! Every converter follows the same contract for one value:
//!
//! 1. A null is rejected for NOT NULL columns, otherwise it bumps the null
//!    count and writes a null cell.
//! 2. Anything else is coerced, validated against the column and written as
//!    exactly one cell, after which the statistics are updated.
//!
//! On error nothing is written and the statistics are left untouched.

use bytes::Bytes;
use chrono::{DateTime, Datelike, FixedOffset, Offset, SecondsFormat, Timelike, Utc};
use chrono_tz::Tz;

use crate::buffer::TypedBuffer;
use crate::coerce;
use crate::error::ConvertError;
use crate::int128::{Int128, POW10_I128, POW10_I64};
use crate::schema::{ColumnDescriptor, ColumnType};
use crate::stats::StatsBuffer;
use crate::value::RuntimeValue;

/// Bits reserved for the UTC offset in zone-carrying timestamps
pub const TIMEZONE_BITS: u32 = 14;

const TIMEZONE_MASK: i128 = (1 << TIMEZONE_BITS) - 1;
const MINUTES_PER_DAY: i32 = 1440;
const SECONDS_PER_DAY: i64 = 86_400;

/// Validate one value, write its cell and fold it into the statistics
pub trait ValidateAndConvert {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError>;
}

/// Handles the null path; returns true when `value` was null and is done.
fn write_if_null(
    nullable: bool,
    stats: &mut StatsBuffer,
    value: &RuntimeValue,
    buffer: &mut dyn TypedBuffer,
) -> Result<bool, ConvertError> {
    if !value.is_null() {
        return Ok(false);
    }
    if !nullable {
        return Err(ConvertError::NullNotAllowed);
    }
    stats.record_null();
    buffer.write_null();
    Ok(true)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanConverter {
    pub nullable: bool,
}

impl ValidateAndConvert for BooleanConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let v = coerce::as_bool(value)?;
        buffer.write_bool(v);
        stats.update_int(if v { Int128::ONE } else { Int128::ZERO });
        Ok(())
    }
}

/// Fixed-point numbers of a declared precision and scale
#[derive(Debug, Clone, PartialEq)]
pub struct NumberConverter {
    pub nullable: bool,
    pub precision: i32,
    pub scale: i32,
}

impl NumberConverter {
    fn to_int128(&self, value: &RuntimeValue) -> Result<Int128, ConvertError> {
        let (p, s) = (self.precision, self.scale);
        let v = match value {
            RuntimeValue::Int8(i) => Int128::from_i64(i64::from(*i)).rescale(p, s),
            RuntimeValue::Int16(i) => Int128::from_i64(i64::from(*i)).rescale(p, s),
            RuntimeValue::Int32(i) => Int128::from_i64(i64::from(*i)).rescale(p, s),
            RuntimeValue::Int64(i) => Int128::from_i64(*i).rescale(p, s),
            RuntimeValue::UInt8(i) => Int128::from_u64(u64::from(*i)).rescale(p, s),
            RuntimeValue::UInt16(i) => Int128::from_u64(u64::from(*i)).rescale(p, s),
            RuntimeValue::UInt32(i) => Int128::from_u64(u64::from(*i)).rescale(p, s),
            RuntimeValue::UInt64(i) => Int128::from_u64(*i).rescale(p, s),
            RuntimeValue::Float32(f) => Int128::from_f32(f.0, p, s),
            RuntimeValue::Float64(f) => Int128::from_f64(f.0, p, s),
            RuntimeValue::Number(t) | RuntimeValue::String(t) => Int128::from_string(t, p, s),
            other => Int128::from_i64(coerce::as_i64(other)?).rescale(p, s),
        }?;
        Ok(v)
    }
}

impl ValidateAndConvert for NumberConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let v = self.to_int128(value)?;
        buffer.write_int128(v);
        stats.update_int(v);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealConverter {
    pub nullable: bool,
}

impl ValidateAndConvert for RealConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let v = coerce::as_f64(value)?;
        if v.is_nan() {
            return Err(ConvertError::InvalidFloat {
                value: v.to_string(),
            });
        }
        buffer.write_f64(v);
        stats.update_real(v);
        Ok(())
    }
}

/// Text and raw binary columns
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryConverter {
    pub nullable: bool,
    pub max_length: usize,
    pub utf8: bool,
}

impl ValidateAndConvert for BinaryConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let v = coerce::as_bytes(value)?;
        if v.len() > self.max_length {
            return Err(ConvertError::ValueTooLong {
                length: v.len(),
                max: self.max_length,
            });
        }
        if self.utf8 && std::str::from_utf8(&v).is_err() {
            return Err(ConvertError::InvalidUtf8);
        }
        stats.update_bytes(&v);
        buffer.write_bytes(v);
        Ok(())
    }
}

/// Shape a semi-structured column accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Any,
    Array,
    Object,
}

/// Semi-structured columns stored as canonical JSON text
#[derive(Debug, Clone, PartialEq)]
pub struct JsonConverter {
    pub nullable: bool,
    pub max_length: usize,
    pub shape: JsonShape,
}

impl ValidateAndConvert for JsonConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        match (self.shape, value) {
            (JsonShape::Array, v) if !matches!(v, RuntimeValue::Array(_)) => {
                return Err(ConvertError::NotJsonArray)
            }
            (JsonShape::Object, v) if !matches!(v, RuntimeValue::Object(_)) => {
                return Err(ConvertError::NotJsonObject)
            }
            _ => {}
        }
        let v = Bytes::from(value.to_canonical_json()?);
        if v.len() > self.max_length {
            return Err(ConvertError::ValueTooLong {
                length: v.len(),
                max: self.max_length,
            });
        }
        stats.update_bytes(&v);
        buffer.write_bytes(v);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampConverter {
    pub nullable: bool,
    pub precision: i32,
    pub scale: i32,
    pub include_tz: bool,
    pub trim_tz: bool,
    pub default_tz: Tz,
}

impl TimestampConverter {
    fn to_datetime(&self, value: &RuntimeValue) -> Result<DateTime<FixedOffset>, ConvertError> {
        let t = match value {
            RuntimeValue::String(s) => coerce::parse_timestamp_in_zone(s, self.default_tz)?,
            RuntimeValue::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => coerce::parse_timestamp_in_zone(s, self.default_tz)?,
                Err(_) => coerce::as_timestamp(value)?,
            },
            other => coerce::as_timestamp(other)?,
        };
        Ok(if self.trim_tz {
            t.with_timezone(&Utc).fixed_offset()
        } else {
            t
        })
    }
}

impl ValidateAndConvert for TimestampConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let t = self.to_datetime(value)?;
        let v = timestamp_to_int128(&t, self.scale, self.include_tz);
        if !v.fits_in_precision(self.precision) {
            return Err(ConvertError::TimestampPrecision {
                timestamp: t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                value: v.to_string(),
                precision: self.precision,
            });
        }
        buffer.write_int128(v);
        stats.update_int(v);
        Ok(())
    }
}

/// Encode an instant as `epoch * 10^scale + fraction`.
///
/// With `include_tz` the result is shifted left by [`TIMEZONE_BITS`] and the
/// low bits hold the UTC offset in minutes biased by one day.
pub fn timestamp_to_int128<Tz2: chrono::TimeZone>(
    t: &DateTime<Tz2>,
    scale: i32,
    include_tz: bool,
) -> Int128 {
    let scale = scale.clamp(0, 9) as usize;
    let fraction =
        i128::from(t.timestamp_subsec_nanos()) / i128::from(POW10_I64[9 - scale]);
    let mut v = i128::from(t.timestamp()) * POW10_I128[scale] + fraction;
    if include_tz {
        let offset_minutes = t.offset().fix().local_minus_utc() / 60;
        let packed = i128::from(offset_minutes + MINUTES_PER_DAY) & TIMEZONE_MASK;
        v = (v << TIMEZONE_BITS) + packed;
    }
    Int128::from_i128(v)
}

/// Time of day, in UTC, at the column scale
#[derive(Debug, Clone, PartialEq)]
pub struct TimeConverter {
    pub nullable: bool,
    pub scale: i32,
}

impl ValidateAndConvert for TimeConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let t = coerce::as_timestamp(value)?.with_timezone(&Utc);
        let nanos = i64::from(t.num_seconds_from_midnight()) * 1_000_000_000
            + i64::from(t.nanosecond());
        let divisor = POW10_I64[9 - self.scale.clamp(0, 9) as usize];
        let v = Int128::from_i64(nanos / divisor);
        buffer.write_int128(v);
        stats.update_int(v);
        Ok(())
    }
}

/// Days since the Unix epoch, in UTC
#[derive(Debug, Clone, PartialEq)]
pub struct DateConverter {
    pub nullable: bool,
}

impl ValidateAndConvert for DateConverter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        if write_if_null(self.nullable, stats, value, buffer)? {
            return Ok(());
        }
        let t = coerce::as_timestamp(value)?.with_timezone(&Utc);
        let year = t.year();
        if !(-9999..=9999).contains(&year) {
            return Err(ConvertError::DateOutOfRange { year });
        }
        let v = Int128::from_i64(t.timestamp().div_euclid(SECONDS_PER_DAY));
        buffer.write_int128(v);
        stats.update_int(v);
        Ok(())
    }
}

/// The converter for each column type
#[derive(Debug, Clone, PartialEq)]
pub enum Converter {
    Boolean(BooleanConverter),
    Number(NumberConverter),
    Real(RealConverter),
    Binary(BinaryConverter),
    Json(JsonConverter),
    Timestamp(TimestampConverter),
    Time(TimeConverter),
    Date(DateConverter),
}

impl Converter {
    pub fn for_column(column: &ColumnDescriptor) -> Self {
        let nullable = column.nullable;
        let json = |shape| {
            Converter::Json(JsonConverter {
                nullable,
                max_length: column.max_length,
                shape,
            })
        };

        match column.column_type {
            ColumnType::Boolean => Converter::Boolean(BooleanConverter { nullable }),
            ColumnType::Fixed => Converter::Number(NumberConverter {
                nullable,
                precision: column.precision,
                scale: column.scale,
            }),
            ColumnType::Real => Converter::Real(RealConverter { nullable }),
            ColumnType::Binary => Converter::Binary(BinaryConverter {
                nullable,
                max_length: column.max_length,
                utf8: column.utf8,
            }),
            ColumnType::JsonArray => json(JsonShape::Array),
            ColumnType::JsonObject => json(JsonShape::Object),
            ColumnType::Variant => json(JsonShape::Any),
            ColumnType::Timestamp => Converter::Timestamp(TimestampConverter {
                nullable,
                precision: column.precision,
                scale: column.scale,
                include_tz: column.include_tz,
                trim_tz: column.trim_tz,
                default_tz: column.default_tz,
            }),
            ColumnType::Time => Converter::Time(TimeConverter {
                nullable,
                scale: column.scale,
            }),
            ColumnType::Date => Converter::Date(DateConverter { nullable }),
        }
    }
}

impl ValidateAndConvert for Converter {
    fn validate_and_convert(
        &self,
        stats: &mut StatsBuffer,
        value: &RuntimeValue,
        buffer: &mut dyn TypedBuffer,
    ) -> Result<(), ConvertError> {
        match self {
            Converter::Boolean(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Number(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Real(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Binary(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Json(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Timestamp(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Time(c) => c.validate_and_convert(stats, value, buffer),
            Converter::Date(c) => c.validate_and_convert(stats, value, buffer),
        }
    }
}
