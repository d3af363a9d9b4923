//! Row-by-row conversion of runtime values into a typed chunk

use std::sync::Arc;

use crate::buffer::{Cell, CellMatrix, ColumnBuffer};
use crate::converter::{Converter, ValidateAndConvert};
use crate::error::{IngestError, Result};
use crate::schema::{ChunkSchema, ColumnDescriptor};
use crate::stats::{ColumnSummary, StatsBuffer};
use crate::traits::SchemaInspector;
use crate::value::RuntimeValue;

/// Converts batches of rows against a fixed schema
///
/// A builder keeps one converter and one column buffer per column and can be
/// reused for any number of chunks. Builders are independent of each other,
/// so separate threads may each own one and merge statistics afterwards.
pub struct ChunkBuilder {
    schema: Arc<ChunkSchema>,
    converters: Vec<Converter>,
    buffers: Vec<ColumnBuffer>,
}

impl ChunkBuilder {
    pub fn new(schema: Arc<ChunkSchema>) -> Self {
        let converters = schema.columns().iter().map(Converter::for_column).collect();
        let buffers = schema
            .columns()
            .iter()
            .map(|c| ColumnBuffer::new(c.buffer_kind()))
            .collect();
        Self {
            schema,
            converters,
            buffers,
        }
    }

    pub fn schema(&self) -> &Arc<ChunkSchema> {
        &self.schema
    }

    /// Convert every row, stopping at the first value that fails.
    ///
    /// On error the partially filled chunk is dropped.
    pub fn build(&mut self, rows: &[Vec<RuntimeValue>]) -> Result<Chunk> {
        let width = self.schema.len();
        let span = tracing::debug_span!("chunk.build", rows = rows.len(), columns = width);
        let _guard = span.enter();

        let mut cells = CellMatrix::new(rows.len(), width)?;
        let mut stats = vec![StatsBuffer::new(); width];
        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            buffer.prepare(index, width);
        }

        let result = self.fill(rows, &mut cells, &mut stats);
        for buffer in &mut self.buffers {
            buffer.reset();
        }
        result?;

        tracing::debug!(
            target: "ingest_core::chunk",
            rows = rows.len(),
            columns = width,
            "Chunk built"
        );

        Ok(Chunk {
            schema: Arc::clone(&self.schema),
            cells,
            stats,
        })
    }

    fn fill(
        &mut self,
        rows: &[Vec<RuntimeValue>],
        cells: &mut CellMatrix,
        stats: &mut [StatsBuffer],
    ) -> Result<()> {
        let columns = self.schema.columns();

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(IngestError::schema(format!(
                    "Row {} has {} values but schema has {} columns",
                    row_index,
                    row.len(),
                    columns.len()
                )));
            }

            let targets = self
                .converters
                .iter()
                .zip(self.buffers.iter_mut())
                .zip(stats.iter_mut())
                .zip(columns);

            for ((((converter, buffer), column_stats), column), value) in targets.zip(row) {
                let mut slot = buffer.bind(cells.cells_mut()).ok_or_else(|| {
                    IngestError::internal(format!(
                        "no cell left for column {:?} at row {}",
                        column.name, row_index
                    ))
                })?;

                converter
                    .validate_and_convert(column_stats, value, &mut slot)
                    .map_err(|source| {
                        tracing::warn!(
                            target: "ingest_core::chunk",
                            row = row_index,
                            column = %column.name,
                            error = %source,
                            "Value conversion failed"
                        );
                        IngestError::Conversion {
                            row: row_index,
                            column: column.name.clone(),
                            source,
                        }
                    })?;
            }
        }

        Ok(())
    }
}

/// A fully converted batch of rows
#[derive(Debug, Clone)]
pub struct Chunk {
    schema: Arc<ChunkSchema>,
    cells: CellMatrix,
    stats: Vec<StatsBuffer>,
}

impl Chunk {
    pub fn schema(&self) -> &Arc<ChunkSchema> {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.cells.rows()
    }

    pub fn column_count(&self) -> usize {
        self.cells.columns()
    }

    pub fn cells(&self) -> &CellMatrix {
        &self.cells
    }

    /// Cells of one column, top to bottom
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.column(index)
    }

    /// Look a column up by name
    pub fn column(&self, name: &str) -> Option<(&ColumnDescriptor, impl Iterator<Item = &Cell> + '_)> {
        let index = self.schema.column_index(name)?;
        Some((&self.schema.columns()[index], self.cells.column(index)))
    }

    pub fn stats(&self) -> &[StatsBuffer] {
        &self.stats
    }

    pub fn summaries(&self) -> Vec<ColumnSummary> {
        self.schema
            .columns()
            .iter()
            .zip(&self.stats)
            .map(|(column, stats)| stats.summary(column))
            .collect()
    }

    pub fn into_parts(self) -> (Arc<ChunkSchema>, CellMatrix, Vec<StatsBuffer>) {
        (self.schema, self.cells, self.stats)
    }
}

/// Order keyed records by the schema's columns; missing keys become nulls
pub fn project_objects(
    schema: &ChunkSchema,
    records: &[serde_json::Map<String, serde_json::Value>],
) -> Vec<Vec<RuntimeValue>> {
    let names = schema.column_names();
    records
        .iter()
        .map(|record| {
            names
                .iter()
                .map(|name| {
                    record
                        .get(*name)
                        .cloned()
                        .map_or(RuntimeValue::Null, RuntimeValue::from)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::test_utils::test::{sample_rows, sample_schema};

    #[test]
    fn test_build_sample_chunk() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let chunk = builder.build(&sample_rows(4)).unwrap();

        assert_eq!(chunk.row_count(), 4);
        assert_eq!(chunk.column_count(), 4);
        assert_eq!(
            chunk.column_cells(0).cloned().collect::<Vec<_>>(),
            vec![Cell::Int64(0), Cell::Int64(1), Cell::Int64(2), Cell::Int64(3)]
        );

        let active = &chunk.stats()[3];
        assert_eq!(active.null_count, 2);

        let (column, mut cells) = chunk.column("NAME").unwrap();
        assert!(column.utf8);
        assert_eq!(
            cells.next(),
            Some(&Cell::ByteArray(bytes::Bytes::from_static(b"name_0")))
        );
    }

    #[test]
    fn test_builder_is_reusable() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let first = builder.build(&sample_rows(3)).unwrap();
        let second = builder.build(&sample_rows(2)).unwrap();
        assert_eq!(first.row_count(), 3);
        assert_eq!(second.row_count(), 2);
        assert_eq!(second.stats()[0].max_int.as_i128(), 1);
    }

    #[test]
    fn test_first_error_aborts() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let mut rows = sample_rows(3);
        rows[1][0] = RuntimeValue::Null;
        rows[2][0] = RuntimeValue::from("not a number");

        let err = builder.build(&rows).unwrap_err();
        match err {
            IngestError::Conversion { row, column, source } => {
                assert_eq!(row, 1);
                assert_eq!(column, "ID");
                assert_eq!(source, ConvertError::NullNotAllowed);
            }
            other => panic!("unexpected error: {other}"),
        }

        // still usable after a failure
        assert!(builder.build(&sample_rows(1)).is_ok());
    }

    #[test]
    fn test_row_width_mismatch() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let mut rows = sample_rows(2);
        rows[1].pop();
        let err = builder.build(&rows).unwrap_err();
        assert!(matches!(err, IngestError::Schema(_)));
    }

    #[test]
    fn test_empty_batch() {
        let mut builder = ChunkBuilder::new(Arc::new(sample_schema()));
        let chunk = builder.build(&[]).unwrap();
        assert_eq!(chunk.row_count(), 0);
        assert!(chunk.stats().iter().all(|s| !s.has_values()));
    }

    #[test]
    fn test_project_objects() {
        let schema = sample_schema();
        let record: serde_json::Value =
            serde_json::from_str(r#"{"NAME": "x", "ID": 7, "EXTRA": true}"#).unwrap();
        let serde_json::Value::Object(record) = record else {
            panic!("expected object");
        };

        let rows = project_objects(&schema, &[record]);
        assert_eq!(
            rows,
            vec![vec![
                RuntimeValue::Int64(7),
                RuntimeValue::from("x"),
                RuntimeValue::Null,
                RuntimeValue::Null,
            ]]
        );
    }
}
