#![allow(dead_code)]

use bytes::Bytes;
use ingest_core::*;
use std::sync::Arc;

/// Create a test schema with common column types
pub fn create_test_schema() -> ChunkSchema {
    ChunkSchemaBuilder::new()
        .with_column(
            ColumnDescriptor::new("ID", ColumnType::Fixed)
                .with_precision_scale(9, 0)
                .with_nullable(false),
        )
        .with_column(
            ColumnDescriptor::new("NAME", ColumnType::Binary)
                .with_utf8(true)
                .with_max_length(32),
        )
        .with_column(
            ColumnDescriptor::new("AMOUNT", ColumnType::Fixed).with_precision_scale(12, 2),
        )
        .with_column(ColumnDescriptor::new("ACTIVE", ColumnType::Boolean).with_nullable(false))
        .with_column(ColumnDescriptor::new("CREATED", ColumnType::Timestamp))
        .build()
        .unwrap()
}

/// Generate test rows with sequential data
pub fn generate_test_rows(count: usize) -> Vec<Vec<RuntimeValue>> {
    (0..count)
        .map(|i| {
            vec![
                RuntimeValue::Int32(i as i32),
                RuntimeValue::from(format!("name_{}", i)),
                RuntimeValue::from(format!("{}.{:02}", i, i % 100)),
                RuntimeValue::Boolean(i % 2 == 0),
                RuntimeValue::Int64(1_700_000_000 + i as i64),
            ]
        })
        .collect()
}

/// Collects the cells written by a converter
pub struct CellSink {
    pub kind: BufferKind,
    pub cells: Vec<Cell>,
}

impl CellSink {
    pub fn new(kind: BufferKind) -> Self {
        Self {
            kind,
            cells: Vec::new(),
        }
    }
}

impl TypedBuffer for CellSink {
    fn write_null(&mut self) {
        self.cells.push(Cell::Null);
    }

    fn write_bool(&mut self, value: bool) {
        self.cells.push(Cell::Boolean(value));
    }

    fn write_f64(&mut self, value: f64) {
        self.cells.push(Cell::Double(value));
    }

    fn write_int128(&mut self, value: Int128) {
        self.cells.push(self.kind.narrow(value));
    }

    fn write_bytes(&mut self, value: Bytes) {
        self.cells.push(Cell::ByteArray(value));
    }
}

/// Run values through one column's converter with shared statistics,
/// continuing past failures
pub fn convert_column(
    column: &ColumnDescriptor,
    values: &[RuntimeValue],
) -> (Vec<std::result::Result<Cell, ConvertError>>, StatsBuffer) {
    let converter = Converter::for_column(column);
    let mut stats = StatsBuffer::new();
    let mut sink = CellSink::new(column.buffer_kind());

    let results = values
        .iter()
        .map(|value| -> std::result::Result<Cell, ConvertError> {
            let before = sink.cells.len();
            converter.validate_and_convert(&mut stats, value, &mut sink)?;
            assert_eq!(sink.cells.len(), before + 1, "one cell per accepted value");
            Ok(sink.cells[before].clone())
        })
        .collect();

    (results, stats)
}

/// Convert a single value with fresh statistics
pub fn convert_value(
    column: &ColumnDescriptor,
    value: RuntimeValue,
) -> std::result::Result<Cell, ConvertError> {
    let (mut results, _) = convert_column(column, &[value]);
    results.remove(0)
}

/// Build a chunk from rows with a fresh builder
pub fn build_chunk(schema: ChunkSchema, rows: &[Vec<RuntimeValue>]) -> Result<Chunk> {
    ChunkBuilder::new(Arc::new(schema)).build(rows)
}

/// Integer payload of a cell, panicking on anything else
pub fn cell_int(cell: &Cell) -> i128 {
    cell.as_i128()
        .unwrap_or_else(|| panic!("expected an integer cell, got {:?}", cell))
}
