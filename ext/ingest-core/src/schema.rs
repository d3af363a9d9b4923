use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::buffer::BufferKind;
use crate::error::{ErrorContext, IngestError, Result};
use crate::int128::MAX_PRECISION;

/// Default cap for text, binary and semi-structured values (16 MiB)
pub const DEFAULT_MAX_LENGTH: usize = 16 * 1024 * 1024;

/// Environment variable consulted by [`SchemaOptions::from_env`]
pub const DEFAULT_TIMEZONE_ENV: &str = "INGEST_DEFAULT_TIMEZONE";

/// Semantic column types accepted by the ingestion table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    /// Fixed-point number with a declared precision and scale
    Fixed,
    /// IEEE 754 double
    Real,
    /// Text when the descriptor requires UTF-8, raw bytes otherwise
    Binary,
    JsonArray,
    JsonObject,
    /// Any JSON value
    Variant,
    Timestamp,
    Time,
    Date,
}

/// Which part of the statistics buffer a column type feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFamily {
    Int,
    Real,
    Str,
}

impl ColumnType {
    /// Get the logical type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Fixed => "FIXED",
            ColumnType::Real => "REAL",
            ColumnType::Binary => "BINARY",
            ColumnType::JsonArray => "ARRAY",
            ColumnType::JsonObject => "OBJECT",
            ColumnType::Variant => "VARIANT",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Date => "DATE",
        }
    }

    pub fn stats_family(&self) -> StatsFamily {
        match self {
            ColumnType::Real => StatsFamily::Real,
            ColumnType::Binary
            | ColumnType::JsonArray
            | ColumnType::JsonObject
            | ColumnType::Variant => StatsFamily::Str,
            ColumnType::Boolean
            | ColumnType::Fixed
            | ColumnType::Timestamp
            | ColumnType::Time
            | ColumnType::Date => StatsFamily::Int,
        }
    }

    /// Check if values of this type are stored through the integer buffer path
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ColumnType::Fixed | ColumnType::Timestamp | ColumnType::Time | ColumnType::Date
        )
    }

    fn default_precision_scale(&self) -> (i32, i32) {
        match self {
            ColumnType::Fixed => (MAX_PRECISION, 0),
            ColumnType::Timestamp => (MAX_PRECISION, 9),
            ColumnType::Time => (18, 9),
            ColumnType::Date => (9, 0),
            ColumnType::Boolean => (1, 0),
            _ => (0, 0),
        }
    }
}

/// Immutable per-chunk description of one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub precision: i32,
    pub scale: i32,
    /// Maximum encoded length in bytes for binary and JSON columns
    pub max_length: usize,
    /// Reject non UTF-8 bytes (text columns)
    pub utf8: bool,
    /// Pack the UTC offset into encoded timestamps
    pub include_tz: bool,
    /// Normalize timestamps to UTC before encoding
    pub trim_tz: bool,
    /// Zone for timestamp text that carries no offset
    pub default_tz: Tz,
    buffer_kind: Option<BufferKind>,
}

impl ColumnDescriptor {
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType) -> Self {
        let (precision, scale) = column_type.default_precision_scale();
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            precision,
            scale,
            max_length: DEFAULT_MAX_LENGTH,
            utf8: false,
            include_tz: false,
            trim_tz: false,
            default_tz: Tz::UTC,
            buffer_kind: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_precision_scale(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    pub fn with_timezone_flags(mut self, include_tz: bool, trim_tz: bool) -> Self {
        self.include_tz = include_tz;
        self.trim_tz = trim_tz;
        self
    }

    pub fn with_default_timezone(mut self, zone: Tz) -> Self {
        self.default_tz = zone;
        self
    }

    /// Force a storage width instead of deriving it from the precision
    pub fn with_buffer_kind(mut self, kind: BufferKind) -> Self {
        self.buffer_kind = Some(kind);
        self
    }

    /// Storage width for integer-encoded cells
    pub fn buffer_kind(&self) -> BufferKind {
        self.buffer_kind
            .unwrap_or_else(|| BufferKind::for_precision(self.precision))
    }

    /// Check the descriptor is internally consistent
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(IngestError::schema(format!("column {:?}: {}", self.name, msg)));

        if self.name.is_empty() {
            return Err(IngestError::schema("column name must not be empty"));
        }

        match self.column_type {
            ColumnType::Fixed => {
                if !(1..=MAX_PRECISION).contains(&self.precision) {
                    return fail(format!("precision {} outside 1..=38", self.precision));
                }
                if !(0..=self.precision).contains(&self.scale) {
                    return fail(format!(
                        "scale {} outside 0..={}",
                        self.scale, self.precision
                    ));
                }
            }
            ColumnType::Timestamp | ColumnType::Time => {
                if !(0..=9).contains(&self.scale) {
                    return fail(format!("scale {} outside 0..=9", self.scale));
                }
                if !(1..=MAX_PRECISION).contains(&self.precision) {
                    return fail(format!("precision {} outside 1..=38", self.precision));
                }
                // seconds of a day need five digits
                if self.column_type == ColumnType::Time && self.precision < 5 + self.scale {
                    return fail(format!(
                        "precision {} cannot hold a time of day at scale {}",
                        self.precision, self.scale
                    ));
                }
            }
            ColumnType::Date => {
                // days within +/-9999 years need seven digits
                if !(7..=MAX_PRECISION).contains(&self.precision) {
                    return fail(format!("precision {} outside 7..=38", self.precision));
                }
            }
            _ => {}
        }

        if self.column_type.is_integral() {
            let kind = self.buffer_kind();
            if self.precision > kind.max_precision() {
                return fail(format!(
                    "{:?} storage cannot hold precision {}",
                    kind, self.precision
                ));
            }
        }

        Ok(())
    }
}

/// Column description as reported by the ingestion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub logical_type: String,
    #[serde(default)]
    pub physical_type: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub byte_length: Option<i64>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMetadata {
    fn physical_buffer_kind(&self) -> Option<BufferKind> {
        match self.physical_type.as_deref()?.to_ascii_uppercase().as_str() {
            "SB1" | "SB2" | "SB4" => Some(BufferKind::Int32),
            "SB8" => Some(BufferKind::Int64),
            "SB16" => Some(BufferKind::Int128),
            _ => None,
        }
    }

    fn max_length(&self) -> Result<usize> {
        match self.byte_length {
            Some(len) => usize::try_from(len).map_err(|_| {
                IngestError::schema(format!(
                    "column {:?}: negative byte_length {}",
                    self.name, len
                ))
            }),
            None => Ok(DEFAULT_MAX_LENGTH),
        }
    }

    /// Map the service description onto a column descriptor
    pub fn to_descriptor(&self, options: &SchemaOptions) -> Result<ColumnDescriptor> {
        let logical = self.logical_type.to_ascii_uppercase();
        let base = |column_type| ColumnDescriptor::new(&self.name, column_type).with_nullable(self.nullable);

        let descriptor = match logical.as_str() {
            "FIXED" => {
                let precision = self.precision.unwrap_or(MAX_PRECISION);
                let mut column = base(ColumnType::Fixed)
                    .with_precision_scale(precision, self.scale.unwrap_or(0));
                if let Some(kind) = self.physical_buffer_kind() {
                    column = column.with_buffer_kind(kind);
                }
                column
            }
            "TEXT" | "CHAR" | "ANY" => base(ColumnType::Binary)
                .with_utf8(true)
                .with_max_length(self.max_length()?),
            "BINARY" => base(ColumnType::Binary).with_max_length(self.max_length()?),
            "BOOLEAN" => base(ColumnType::Boolean),
            "REAL" => base(ColumnType::Real),
            "ARRAY" => base(ColumnType::JsonArray).with_max_length(options.max_json_size),
            "OBJECT" => base(ColumnType::JsonObject).with_max_length(options.max_json_size),
            "VARIANT" => base(ColumnType::Variant).with_max_length(options.max_json_size),
            "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" | "TIMESTAMP_TZ" => {
                let kind = self.physical_buffer_kind().unwrap_or(BufferKind::Int128);
                let precision = if kind == BufferKind::Int128 { 38 } else { 18 };
                let column = base(ColumnType::Timestamp)
                    .with_precision_scale(precision, self.scale.unwrap_or(9))
                    .with_buffer_kind(kind);
                match logical.as_str() {
                    "TIMESTAMP_NTZ" => column.with_timezone_flags(false, true),
                    "TIMESTAMP_TZ" => column
                        .with_timezone_flags(true, false)
                        .with_default_timezone(options.default_timezone),
                    _ => column.with_default_timezone(options.default_timezone),
                }
            }
            "TIME" => {
                let kind = self.physical_buffer_kind().unwrap_or(BufferKind::Int64);
                base(ColumnType::Time)
                    .with_precision_scale(kind.max_precision(), self.scale.unwrap_or(9))
                    .with_buffer_kind(kind)
            }
            "DATE" => base(ColumnType::Date)
                .with_buffer_kind(self.physical_buffer_kind().unwrap_or(BufferKind::Int32)),
            other => {
                return Err(IngestError::unsupported(format!(
                    "column {:?} has unsupported logical type {}",
                    self.name, other
                )))
            }
        };

        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Settings shared by every column of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOptions {
    pub default_timezone: Tz,
    pub max_json_size: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            default_timezone: Tz::UTC,
            max_json_size: DEFAULT_MAX_LENGTH,
        }
    }
}

impl SchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timezone(mut self, zone: Tz) -> Self {
        self.default_timezone = zone;
        self
    }

    /// Set the default zone from an IANA name such as `"Europe/Paris"`
    pub fn with_default_timezone_name(self, name: &str) -> Result<Self> {
        let zone = name.trim().parse::<Tz>().map_err(|e| {
            IngestError::invalid_argument(format!("unknown timezone {:?}: {}", name, e))
        })?;
        Ok(self.with_default_timezone(zone))
    }

    pub fn with_max_json_size(mut self, size: usize) -> Self {
        self.max_json_size = size;
        self
    }

    /// Defaults, with the zone overridden by `INGEST_DEFAULT_TIMEZONE` when set
    pub fn from_env() -> Result<Self> {
        match std::env::var(DEFAULT_TIMEZONE_ENV) {
            Ok(name) if !name.trim().is_empty() => Self::default()
                .with_default_timezone_name(&name)
                .with_context(|| format!("reading {}", DEFAULT_TIMEZONE_ENV)),
            _ => Ok(Self::default()),
        }
    }
}

/// Ordered columns of one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSchema {
    columns: Vec<ColumnDescriptor>,
}

impl ChunkSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            column.validate()?;
            if !seen.insert(column.name.as_str()) {
                return Err(IngestError::schema(format!(
                    "duplicate column name {:?}",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn from_metadata(metadata: &[ColumnMetadata], options: &SchemaOptions) -> Result<Self> {
        let columns = metadata
            .iter()
            .map(|m| m.to_descriptor(options))
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Parse a JSON array of service column descriptions
    pub fn from_metadata_json(json: &str, options: &SchemaOptions) -> Result<Self> {
        let metadata: Vec<ColumnMetadata> =
            serde_json::from_str(json).context("parsing column metadata")?;
        Self::from_metadata(&metadata, options)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builder for creating chunk schemas
pub struct ChunkSchemaBuilder {
    columns: Vec<ColumnDescriptor>,
}

impl ChunkSchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<ChunkSchema> {
        if self.columns.is_empty() {
            return Err(IngestError::schema("Schema must have at least one column"));
        }
        ChunkSchema::new(self.columns)
    }
}

impl Default for ChunkSchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
