//! Fixed-precision decimal integers backed by a native `i128`
//!
//! An [`Int128`] carries no scale of its own: a value `v` stored in a column
//! declared as `(precision, scale)` means `v / 10^scale`. Every constructor
//! that takes a precision and scale returns a value already scaled for that
//! column and guaranteed to satisfy [`Int128::fits_in_precision`].

use std::fmt;
use thiserror::Error;

/// Largest precision representable by a 128-bit decimal.
pub const MAX_PRECISION: i32 = 38;

/// `10^n` for `n` in `0..=38`.
pub const POW10_I128: [i128; 39] = pow10_i128_table();

/// `10^n` for `n` in `0..=18`.
pub const POW10_I64: [i64; 19] = pow10_i64_table();

const fn pow10_i128_table() -> [i128; 39] {
    let mut table = [0i128; 39];
    let mut value = 1i128;
    let mut i = 0;
    while i < 39 {
        table[i] = value;
        if i < 38 {
            value *= 10;
        }
        i += 1;
    }
    table
}

const fn pow10_i64_table() -> [i64; 19] {
    let mut table = [0i64; 19];
    let mut value = 1i64;
    let mut i = 0;
    while i < 19 {
        table[i] = value;
        if i < 18 {
            value *= 10;
        }
        i += 1;
    }
    table
}

/// Errors produced while building or rescaling a fixed-precision value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// The text is not a decimal number
    #[error("unable to parse decimal value from {input:?}")]
    Parse { input: String },

    /// The value needs more digits than the column precision allows
    #[error("value ({value}) out of range (precision={precision},scale={scale})")]
    OutOfRange {
        value: String,
        precision: i32,
        scale: i32,
    },

    /// NaN and infinities have no fixed-point representation
    #[error("cannot convert non-finite float {value} to a fixed-point number")]
    NotFinite { value: String },
}

/// A 128-bit two's-complement integer interpreted against an external scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int128(i128);

impl Int128 {
    pub const ZERO: Int128 = Int128(0);
    pub const ONE: Int128 = Int128(1);

    pub const fn from_i64(v: i64) -> Self {
        Self(v as i128)
    }

    pub const fn from_u64(v: u64) -> Self {
        Self(v as i128)
    }

    pub const fn from_i128(v: i128) -> Self {
        Self(v)
    }

    pub const fn as_i128(self) -> i128 {
        self.0
    }

    /// Convert a float through its shortest round-trip decimal text.
    ///
    /// Going through text keeps binary noise out of the result: `3.3f32`
    /// is treated as `3.3`, not `3.2999999523162841796875`.
    pub fn from_f32(v: f32, precision: i32, scale: i32) -> Result<Self, DecimalError> {
        if !v.is_finite() {
            return Err(DecimalError::NotFinite {
                value: v.to_string(),
            });
        }
        Self::from_string(&v.to_string(), precision, scale)
    }

    /// Convert a float through its shortest round-trip decimal text.
    pub fn from_f64(v: f64, precision: i32, scale: i32) -> Result<Self, DecimalError> {
        if !v.is_finite() {
            return Err(DecimalError::NotFinite {
                value: v.to_string(),
            });
        }
        Self::from_string(&v.to_string(), precision, scale)
    }

    /// Parse decimal text such as `"-12.50"`, `"1e3"` or `" 0.001 "`.
    ///
    /// Fractional digits beyond `scale` are rounded half away from zero.
    pub fn from_string(s: &str, precision: i32, scale: i32) -> Result<Self, DecimalError> {
        let input = s.trim();
        let parse_error = || DecimalError::Parse {
            input: s.to_string(),
        };

        let (negative, body) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };

        let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
            Some(idx) => {
                let exponent = body[idx + 1..]
                    .parse::<i32>()
                    .map_err(|_| parse_error())?;
                (&body[..idx], exponent)
            }
            None => (body, 0),
        };

        let (int_digits, frac_digits) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(parse_error());
        }
        if !int_digits
            .bytes()
            .chain(frac_digits.bytes())
            .all(|b| b.is_ascii_digit())
        {
            return Err(parse_error());
        }

        // Digits past the 39th significant one cannot change a value that
        // fits in 38 digits, so they only shift the implied scale.
        let mut digits: i128 = 0;
        let mut dropped: i64 = 0;
        for b in int_digits.bytes().chain(frac_digits.bytes()) {
            if dropped > 0 {
                dropped += 1;
                continue;
            }
            match digits
                .checked_mul(10)
                .and_then(|d| d.checked_add(i128::from(b - b'0')))
            {
                Some(d) => digits = d,
                None => dropped = 1,
            }
        }

        let from_scale = frac_digits.len() as i64 - i64::from(exponent) - dropped;
        let signed = if negative { -digits } else { digits };

        rescale_raw(signed, from_scale, scale)
            .map(Int128)
            .filter(|v| v.fits_in_precision(precision))
            .ok_or_else(|| DecimalError::OutOfRange {
                value: input.to_string(),
                precision,
                scale,
            })
    }

    /// Scale an integer (scale 0) up to the column's `(precision, scale)`.
    pub fn rescale(self, precision: i32, scale: i32) -> Result<Self, DecimalError> {
        self.rescale_between(0, precision, scale)
    }

    /// Move a value from `from_scale` to `to_scale`, rounding half away from
    /// zero when digits are removed.
    pub fn rescale_between(
        self,
        from_scale: i32,
        precision: i32,
        to_scale: i32,
    ) -> Result<Self, DecimalError> {
        rescale_raw(self.0, i64::from(from_scale), to_scale)
            .map(Int128)
            .filter(|v| v.fits_in_precision(precision))
            .ok_or_else(|| DecimalError::OutOfRange {
                value: self.to_decimal_string(from_scale),
                precision,
                scale: to_scale,
            })
    }

    /// True when the value has at most `precision` decimal digits.
    pub fn fits_in_precision(self, precision: i32) -> bool {
        match usize::try_from(precision) {
            Ok(p) if p < POW10_I128.len() => {
                let bound = POW10_I128[p];
                self.0 > -bound && self.0 < bound
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }

    /// Low 64 bits, for values already known to fit.
    pub fn to_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn to_big_endian(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Big-endian bytes trimmed to the width used for `precision`.
    pub fn to_big_endian_sized(self, precision: i32) -> Vec<u8> {
        let bytes = self.to_big_endian();
        bytes[16 - byte_width(precision)..].to_vec()
    }

    pub fn checked_add(self, other: Int128) -> Option<Int128> {
        self.0.checked_add(other.0).map(Int128)
    }

    pub fn checked_mul(self, other: Int128) -> Option<Int128> {
        self.0.checked_mul(other.0).map(Int128)
    }

    pub fn shl(self, bits: u32) -> Int128 {
        Int128(self.0.wrapping_shl(bits))
    }

    /// Render `value / 10^scale` as decimal text.
    pub fn to_decimal_string(self, scale: i32) -> String {
        if scale <= 0 {
            if self.0 == 0 {
                return "0".to_string();
            }
            let mut out = self.0.to_string();
            out.push_str(&"0".repeat(scale.unsigned_abs() as usize));
            return out;
        }

        let scale = scale as usize;
        let digits = self.0.unsigned_abs().to_string();
        let mut out = String::with_capacity(digits.len() + scale + 3);
        if self.0 < 0 {
            out.push('-');
        }
        if digits.len() <= scale {
            out.push_str("0.");
            out.push_str(&"0".repeat(scale - digits.len()));
            out.push_str(&digits);
        } else {
            let split = digits.len() - scale;
            out.push_str(&digits[..split]);
            out.push('.');
            out.push_str(&digits[split..]);
        }
        out
    }
}

/// Storage width in bytes for a decimal of the given precision.
pub fn byte_width(precision: i32) -> usize {
    match precision {
        p if p <= 9 => 4,
        p if p <= 18 => 8,
        _ => 16,
    }
}

fn rescale_raw(value: i128, from_scale: i64, to_scale: i32) -> Option<i128> {
    if value == 0 {
        return Some(0);
    }
    let to_scale = i64::from(to_scale);
    if to_scale >= from_scale {
        let diff = usize::try_from(to_scale - from_scale).ok()?;
        return value.checked_mul(*POW10_I128.get(diff)?);
    }

    let diff = usize::try_from(from_scale - to_scale).ok()?;
    // |value| < 10^39, which rounds to zero for any larger divisor
    let Some(&divisor) = POW10_I128.get(diff) else {
        return Some(0);
    };
    let quotient = value / divisor;
    let remainder = value % divisor;
    if remainder.unsigned_abs() * 2 >= divisor.unsigned_abs() {
        Some(quotient + value.signum())
    } else {
        Some(quotient)
    }
}

impl fmt::Display for Int128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Int128 {
    fn from(v: i64) -> Self {
        Int128::from_i64(v)
    }
}

impl From<u64> for Int128 {
    fn from(v: u64) -> Self {
        Int128::from_u64(v)
    }
}
