use bytes::Bytes;
use serde::Serialize;
use std::cmp::Ordering;

use crate::int128::Int128;
use crate::schema::{ColumnDescriptor, StatsFamily};

/// Longest string statistic kept in a summary, in bytes
pub const MAX_LOB_STATS_LEN: usize = 32;

/// Running per-column statistics for one chunk
///
/// Only the family matching the column type is updated; the others stay at
/// their zero values. Min/max are meaningful once [`StatsBuffer::has_values`]
/// is true.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsBuffer {
    pub first: bool,
    pub null_count: i64,
    pub min_int: Int128,
    pub max_int: Int128,
    pub min_real: f64,
    pub max_real: f64,
    pub min_str: Bytes,
    pub max_str: Bytes,
    pub max_str_len: usize,
}

impl Default for StatsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsBuffer {
    pub fn new() -> Self {
        Self {
            first: true,
            null_count: 0,
            min_int: Int128::ZERO,
            max_int: Int128::ZERO,
            min_real: 0.0,
            max_real: 0.0,
            min_str: Bytes::new(),
            max_str: Bytes::new(),
            max_str_len: 0,
        }
    }

    /// True once any non-null value has been recorded
    pub fn has_values(&self) -> bool {
        !self.first
    }

    pub fn record_null(&mut self) {
        self.null_count += 1;
    }

    pub fn update_int(&mut self, value: Int128) {
        if self.first {
            self.min_int = value;
            self.max_int = value;
            self.first = false;
            return;
        }
        self.min_int = self.min_int.min(value);
        self.max_int = self.max_int.max(value);
    }

    pub fn update_real(&mut self, value: f64) {
        if self.first {
            self.min_real = value;
            self.max_real = value;
            self.first = false;
            return;
        }
        if value.total_cmp(&self.min_real) == Ordering::Less {
            self.min_real = value;
        }
        if value.total_cmp(&self.max_real) == Ordering::Greater {
            self.max_real = value;
        }
    }

    /// Track bytewise min/max and the longest length seen
    pub fn update_bytes(&mut self, value: &Bytes) {
        if self.first {
            self.min_str = value.clone();
            self.max_str = value.clone();
            self.max_str_len = value.len();
            self.first = false;
            return;
        }
        if value < &self.min_str {
            self.min_str = value.clone();
        }
        if value > &self.max_str {
            self.max_str = value.clone();
        }
        self.max_str_len = self.max_str_len.max(value.len());
    }

    /// Fold in statistics gathered for the same column elsewhere
    pub fn merge(&mut self, other: &StatsBuffer) {
        self.null_count += other.null_count;
        if other.first {
            return;
        }
        if self.first {
            let null_count = self.null_count;
            *self = other.clone();
            self.null_count = null_count;
            return;
        }

        self.min_int = self.min_int.min(other.min_int);
        self.max_int = self.max_int.max(other.max_int);
        if other.min_real.total_cmp(&self.min_real) == Ordering::Less {
            self.min_real = other.min_real;
        }
        if other.max_real.total_cmp(&self.max_real) == Ordering::Greater {
            self.max_real = other.max_real;
        }
        if other.min_str < self.min_str {
            self.min_str = other.min_str.clone();
        }
        if other.max_str > self.max_str {
            self.max_str = other.max_str.clone();
        }
        self.max_str_len = self.max_str_len.max(other.max_str_len);
    }

    /// Serializable view of the statistics for `column`
    pub fn summary(&self, column: &ColumnDescriptor) -> ColumnSummary {
        let mut summary = ColumnSummary {
            column: column.name.clone(),
            null_count: self.null_count,
            min_int: None,
            max_int: None,
            min_real: None,
            max_real: None,
            min_str_hex: None,
            max_str_hex: None,
            max_length: None,
        };

        match column.column_type.stats_family() {
            StatsFamily::Int if self.has_values() => {
                summary.min_int = Some(self.min_int.to_string());
                summary.max_int = Some(self.max_int.to_string());
            }
            StatsFamily::Real if self.has_values() => {
                summary.min_real = Some(self.min_real);
                summary.max_real = Some(self.max_real);
            }
            StatsFamily::Str => {
                summary.max_length = Some(self.max_str_len);
                if self.has_values() {
                    summary.min_str_hex = Some(truncate_hex(&self.min_str, false));
                    summary.max_str_hex = Some(truncate_hex(&self.max_str, true));
                }
            }
            _ => {}
        }

        summary
    }
}

/// Statistics of one column as exported alongside the chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub null_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_int: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_int: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_real: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_real: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_str_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_str_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Hex of at most [`MAX_LOB_STATS_LEN`] bytes.
///
/// A truncated upper bound is bumped at its last byte below 0xFF so it still
/// sorts after the full value.
fn truncate_hex(bytes: &[u8], round_up: bool) -> String {
    if bytes.len() <= MAX_LOB_STATS_LEN {
        return hex::encode(bytes);
    }
    let prefix = &bytes[..MAX_LOB_STATS_LEN];
    if !round_up {
        return hex::encode(prefix);
    }

    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return hex::encode(&bound);
        }
    }
    // every kept byte is 0xFF: no shorter bound exists
    hex::encode(bytes)
}
