//! Parquet encoding of converted chunks

use crate::arrow_conversion::{chunk_schema_to_arrow, chunk_to_record_batch};
use crate::chunk::Chunk;
use crate::error::{IngestError, Result};
use crate::schema::ChunkSchema;
use crate::stats::StatsBuffer;
use arrow_schema::Schema;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// Key-value metadata entry holding the JSON column summaries
pub const COLUMN_STATS_METADATA_KEY: &str = "ingest.column_stats";

/// Builder for creating a configured ChunkWriter
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    compression: Compression,
    metadata: Vec<(String, String)>,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            metadata: Vec::new(),
        }
    }
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Attach an extra key-value metadata entry to every file
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Build a ChunkWriter for chunks of `schema`
    pub fn build<W: std::io::Write + Send>(
        &self,
        writer: W,
        schema: Arc<ChunkSchema>,
    ) -> Result<ChunkWriter<W>> {
        let arrow_schema = chunk_schema_to_arrow(&schema);

        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect::<Vec<_>>();
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_key_value_metadata((!metadata.is_empty()).then_some(metadata))
            .build();

        let arrow_writer = ArrowWriter::try_new(writer, arrow_schema.clone(), Some(props))?;
        let stats = vec![StatsBuffer::new(); schema.len()];

        Ok(ChunkWriter {
            arrow_writer: Some(arrow_writer),
            arrow_schema,
            schema,
            stats,
            rows_written: 0,
        })
    }
}

/// Writes chunks as row groups of one Parquet file
///
/// Statistics of all written chunks are merged and stored under
/// [`COLUMN_STATS_METADATA_KEY`] when the writer is closed.
pub struct ChunkWriter<W: std::io::Write> {
    arrow_writer: Option<ArrowWriter<W>>,
    arrow_schema: Arc<Schema>,
    schema: Arc<ChunkSchema>,
    stats: Vec<StatsBuffer>,
    rows_written: usize,
}

impl<W> ChunkWriter<W>
where
    W: std::io::Write + Send,
{
    pub fn arrow_schema(&self) -> &Arc<Schema> {
        &self.arrow_schema
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Write a chunk as its own row group
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.schema().as_ref() != self.schema.as_ref() {
            return Err(IngestError::schema(
                "chunk schema does not match the writer schema",
            ));
        }

        let writer = self
            .arrow_writer
            .as_mut()
            .ok_or_else(|| IngestError::internal("Writer has been closed"))?;

        let batch = chunk_to_record_batch(chunk)?;
        writer.write(&batch)?;
        writer.flush()?;

        for (total, stats) in self.stats.iter_mut().zip(chunk.stats()) {
            total.merge(stats);
        }
        self.rows_written += chunk.row_count();
        Ok(())
    }

    /// Attach the merged column statistics and finish the file
    pub fn close(mut self) -> Result<()> {
        let mut writer = self
            .arrow_writer
            .take()
            .ok_or_else(|| IngestError::internal("Writer has been closed"))?;

        let summaries = self
            .schema
            .columns()
            .iter()
            .zip(&self.stats)
            .map(|(column, stats)| stats.summary(column))
            .collect::<Vec<_>>();
        writer.append_key_value_metadata(KeyValue::new(
            COLUMN_STATS_METADATA_KEY.to_string(),
            serde_json::to_string(&summaries)?,
        ));

        writer.close()?;
        Ok(())
    }
}

/// Encode one chunk as a complete in-memory Parquet file
pub fn write_chunk(chunk: &Chunk, builder: &WriterBuilder) -> Result<Bytes> {
    let mut buffer = Vec::new();
    {
        let mut writer = builder.build(&mut buffer, Arc::clone(chunk.schema()))?;
        writer.write_chunk(chunk)?;
        writer.close()?;
    }

    tracing::debug!(
        target: "ingest_core::writer",
        rows = chunk.row_count(),
        size_bytes = buffer.len(),
        "Chunk encoded"
    );

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkBuilder;
    use crate::test_utils::test::{sample_rows, sample_schema};
    use parquet::file::reader::{FileReader, SerializedFileReader};

    #[test]
    fn test_write_chunk_in_memory() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let chunk = builder.build(&sample_rows(5)).unwrap();

        let bytes = write_chunk(&chunk, &WriterBuilder::new().with_metadata("origin", "test")).unwrap();
        let reader = SerializedFileReader::new(bytes).unwrap();
        let metadata = reader.metadata();

        assert_eq!(metadata.file_metadata().num_rows(), 5);
        assert_eq!(metadata.num_row_groups(), 1);

        let kv = metadata.file_metadata().key_value_metadata().unwrap();
        let find = |key: &str| {
            kv.iter()
                .find(|e| e.key == key)
                .and_then(|e| e.value.clone())
        };
        assert_eq!(find("origin").as_deref(), Some("test"));

        let stats: serde_json::Value =
            serde_json::from_str(&find(COLUMN_STATS_METADATA_KEY).unwrap()).unwrap();
        assert_eq!(stats[0]["column"], "ID");
        assert_eq!(stats[0]["max_int"], "4");
        assert_eq!(stats[3]["null_count"], 2);
    }

    #[test]
    fn test_multiple_chunks_merge_stats() {
        let schema = Arc::new(sample_schema());
        let mut builder = ChunkBuilder::new(Arc::clone(&schema));
        let first = builder.build(&sample_rows(2)).unwrap();
        let second = builder.build(&sample_rows(4)).unwrap();

        let mut buffer = Vec::new();
        let mut writer = WriterBuilder::new()
            .with_compression(Compression::UNCOMPRESSED)
            .build(&mut buffer, schema)
            .unwrap();
        writer.write_chunk(&first).unwrap();
        writer.write_chunk(&second).unwrap();
        assert_eq!(writer.rows_written(), 6);
        writer.close().unwrap();

        let reader = SerializedFileReader::new(Bytes::from(buffer)).unwrap();
        assert_eq!(reader.metadata().num_row_groups(), 2);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let other = ChunkSchema::new(vec![crate::schema::ColumnDescriptor::new(
            "X",
            crate::schema::ColumnType::Real,
        )])
        .unwrap();
        let chunk = ChunkBuilder::new(Arc::new(other)).build(&[]).unwrap();

        let mut buffer = Vec::new();
        let mut writer = WriterBuilder::new()
            .build(&mut buffer, Arc::new(sample_schema()))
            .unwrap();
        assert!(matches!(
            writer.write_chunk(&chunk),
            Err(IngestError::Schema(_))
        ));
    }
}
