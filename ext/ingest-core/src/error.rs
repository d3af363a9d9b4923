use thiserror::Error;

use crate::int128::DecimalError;

/// Failure to validate or convert a single cell
///
/// Messages are shown to users debugging rejected records, so their wording
/// is part of the public contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// A null reached a column declared NOT NULL
    #[error("unexpected null value")]
    NullNotAllowed,

    /// Encoded value exceeds the column's maximum length
    #[error("value too long, length: {length}, max: {max}")]
    ValueTooLong { length: usize, max: usize },

    /// Bytes for a text column are not valid UTF-8
    #[error("invalid UTF8")]
    InvalidUtf8,

    #[error("not a JSON array")]
    NotJsonArray,

    #[error("not a JSON object")]
    NotJsonObject,

    /// Text could not be read as an RFC 3339 timestamp
    #[error("unable to parse timestamp value from {input:?}")]
    TimestampParse { input: String },

    /// Encoded timestamp needs more digits than the column allows
    #[error("unable to fit timestamp ({timestamp} -> {value}) within required precision: {precision}")]
    TimestampPrecision {
        timestamp: String,
        value: String,
        precision: i32,
    },

    /// Parse or rescale failure from the fixed-point layer, shown verbatim
    #[error(transparent)]
    Decimal(#[from] DecimalError),

    #[error("DATE columns out of range, year: {year}")]
    DateOutOfRange { year: i32 },

    /// NaN has no place in an ordered column
    #[error("invalid floating point value: {value}")]
    InvalidFloat { value: String },

    /// The value's kind cannot be coerced to what the column needs
    #[error("expected {expected} value, got {actual}")]
    UnsupportedNativeType {
        expected: &'static str,
        actual: &'static str,
    },

    /// The value's kind is right but its text is not
    #[error("unable to parse {expected} value from {input:?}")]
    Unparseable {
        expected: &'static str,
        input: String,
    },

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        ConvertError::Json(e.to_string())
    }
}

/// Core error type for chunk construction
#[derive(Error, Debug)]
pub enum IngestError {
    /// IO errors from file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow errors from Arrow operations
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Parquet format errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Malformed JSON documents (schemas, records)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema-related errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// A cell failed conversion; the chunk must be discarded
    #[error("failed to convert value for column {column:?} at row {row}: {source}")]
    Conversion {
        row: usize,
        column: String,
        #[source]
        source: ConvertError,
    },

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unsupported operation errors
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for chunk operations
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Create a new schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        IngestError::Schema(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        IngestError::InvalidArgument(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        IngestError::Unsupported(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        IngestError::Internal(msg.into())
    }

    /// The cell-level cause, when this error came from a converter
    pub fn conversion_source(&self) -> Option<&ConvertError> {
        match self {
            IngestError::Conversion { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<IngestError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            IngestError::InvalidArgument(format!("{}: {}", ctx.into(), base_error))
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            IngestError::InvalidArgument(format!("{}: {}", f().into(), base_error))
        })
    }
}
