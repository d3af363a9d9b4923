//! Typed columnar conversion for streaming ingestion
//!
//! `ingest-core` turns loosely typed records into the typed cells of a
//! columnar chunk, validating every value against its column and gathering
//! per-column statistics on the way.
//!
//! # Key Components
//!
//! - **Values**: [`value::RuntimeValue`], the closed set of kinds a record
//!   field may hold, with JSON interop and a canonical JSON encoding
//!
//! - **Fixed-point**: [`int128::Int128`] scales, rounds and range-checks
//!   decimal input for columns of up to 38 digits
//!
//! - **Schema**: [`schema::ColumnDescriptor`] and [`schema::ChunkSchema`]
//!   - Builder API for describing columns by hand
//!   - Mapping from the ingestion service's column metadata
//!   - Lookups through the [`traits::SchemaInspector`] trait
//!
//! - **Converters**: one [`converter::Converter`] per column type, each
//!   implementing [`converter::ValidateAndConvert`]
//!
//! - **Driver**: [`chunk::ChunkBuilder`] walks rows and columns, stops at the
//!   first bad value and hands back a [`chunk::Chunk`]
//!
//! - **Statistics**: [`stats::StatsBuffer`] tracks null counts and min/max per
//!   column; buffers from independent builders combine with
//!   [`stats::StatsBuffer::merge`]
//!
//! - **Export**: Arrow record batches and in-memory Parquet files with the
//!   column statistics attached as key-value metadata
//!
//! # Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use ingest_core::{ChunkBuilder, ChunkSchemaBuilder, ColumnDescriptor, ColumnType, RuntimeValue};
//!
//! let schema = ChunkSchemaBuilder::new()
//!     .with_column(ColumnDescriptor::new("PRICE", ColumnType::Fixed).with_precision_scale(10, 2))
//!     .build()?;
//!
//! let mut builder = ChunkBuilder::new(Arc::new(schema));
//! let chunk = builder.build(&[vec![RuntimeValue::from("12.345")]])?;
//!
//! assert_eq!(chunk.stats()[0].max_int.as_i128(), 1235);
//! # Ok::<(), ingest_core::IngestError>(())
//! ```

pub mod arrow_conversion;
pub mod buffer;
pub mod chunk;
pub mod coerce;
pub mod converter;
pub mod error;
pub mod int128;
pub mod schema;
pub mod stats;
pub mod traits;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use buffer::{BufferKind, Cell, CellMatrix, ColumnBuffer, TypedBuffer};
pub use chunk::{project_objects, Chunk, ChunkBuilder};
pub use converter::{Converter, ValidateAndConvert};
pub use error::{ConvertError, ErrorContext, IngestError, Result};
pub use int128::{DecimalError, Int128};
pub use schema::{
    ChunkSchema, ChunkSchemaBuilder, ColumnDescriptor, ColumnMetadata, ColumnType, SchemaOptions,
};
pub use stats::{ColumnSummary, StatsBuffer};
pub use value::RuntimeValue;
pub use writer::{write_chunk, ChunkWriter, WriterBuilder};
