//! Test utilities for ingest-core

#[cfg(test)]
pub mod test {
    use crate::buffer::{BufferKind, Cell, TypedBuffer};
    use crate::converter::{Converter, ValidateAndConvert};
    use crate::error::ConvertError;
    use crate::int128::Int128;
    use crate::schema::{ChunkSchema, ChunkSchemaBuilder, ColumnDescriptor, ColumnType};
    use crate::stats::StatsBuffer;
    use crate::value::RuntimeValue;
    use bytes::Bytes;

    /// Appends every write; integers are kept at full width
    pub struct RecordingBuffer {
        pub kind: BufferKind,
        pub values: Vec<Cell>,
    }

    impl Default for RecordingBuffer {
        fn default() -> Self {
            Self {
                kind: BufferKind::Int128,
                values: Vec::new(),
            }
        }
    }

    impl TypedBuffer for RecordingBuffer {
        fn write_null(&mut self) {
            self.values.push(Cell::Null);
        }

        fn write_bool(&mut self, value: bool) {
            self.values.push(Cell::Boolean(value));
        }

        fn write_f64(&mut self, value: f64) {
            self.values.push(Cell::Double(value));
        }

        fn write_int128(&mut self, value: Int128) {
            self.values.push(self.kind.narrow(value));
        }

        fn write_bytes(&mut self, value: Bytes) {
            self.values.push(Cell::ByteArray(value));
        }
    }

    /// Run one value through a fresh buffer and statistics
    pub fn convert_one(
        converter: &Converter,
        value: &RuntimeValue,
    ) -> Result<(Cell, StatsBuffer), ConvertError> {
        let mut stats = StatsBuffer::new();
        let mut buffer = RecordingBuffer::default();
        converter.validate_and_convert(&mut stats, value, &mut buffer)?;
        assert_eq!(buffer.values.len(), 1, "exactly one cell per value");
        let cell = buffer.values.pop().unwrap_or_default();
        Ok((cell, stats))
    }

    /// A small schema with one column of each storage family
    pub fn sample_schema() -> ChunkSchema {
        ChunkSchemaBuilder::new()
            .with_column(
                ColumnDescriptor::new("ID", ColumnType::Fixed)
                    .with_precision_scale(18, 0)
                    .with_nullable(false),
            )
            .with_column(
                ColumnDescriptor::new("NAME", ColumnType::Binary)
                    .with_utf8(true)
                    .with_max_length(64),
            )
            .with_column(ColumnDescriptor::new("SCORE", ColumnType::Real))
            .with_column(ColumnDescriptor::new("ACTIVE", ColumnType::Boolean))
            .build()
            .unwrap()
    }

    /// Rows matching [`sample_schema`]
    pub fn sample_rows(count: usize) -> Vec<Vec<RuntimeValue>> {
        (0..count)
            .map(|i| {
                vec![
                    RuntimeValue::Int64(i as i64),
                    RuntimeValue::from(format!("name_{}", i)),
                    RuntimeValue::from(i as f64 * 1.5),
                    if i % 3 == 0 {
                        RuntimeValue::Null
                    } else {
                        RuntimeValue::Boolean(i % 2 == 0)
                    },
                ]
            })
            .collect()
    }
}
