//! Row-major cell storage for one chunk and per-column write cursors
//!
//! A [`CellMatrix`] owns every cell of a chunk. Each column has a
//! [`ColumnBuffer`] that remembers only where its next cell lives; the cells
//! themselves are reached by binding the buffer to the matrix for a single
//! write.

use bytes::Bytes;
use parquet::basic::Type as PhysicalType;

use crate::error::{IngestError, Result};
use crate::int128::Int128;

/// One typed slot of the output matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    ByteArray(Bytes),
    /// Sixteen big-endian bytes of a 128-bit integer
    FixedLenByteArray(Bytes),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "Null",
            Cell::Boolean(_) => "Boolean",
            Cell::Int32(_) => "Int32",
            Cell::Int64(_) => "Int64",
            Cell::Double(_) => "Double",
            Cell::ByteArray(_) => "ByteArray",
            Cell::FixedLenByteArray(_) => "FixedLenByteArray",
        }
    }

    /// Parquet physical type of the cell, `None` for nulls
    pub fn physical_type(&self) -> Option<PhysicalType> {
        match self {
            Cell::Null => None,
            Cell::Boolean(_) => Some(PhysicalType::BOOLEAN),
            Cell::Int32(_) => Some(PhysicalType::INT32),
            Cell::Int64(_) => Some(PhysicalType::INT64),
            Cell::Double(_) => Some(PhysicalType::DOUBLE),
            Cell::ByteArray(_) => Some(PhysicalType::BYTE_ARRAY),
            Cell::FixedLenByteArray(_) => Some(PhysicalType::FIXED_LEN_BYTE_ARRAY),
        }
    }

    /// Integer payload of an integer-encoded cell
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Cell::Int32(v) => Some(i128::from(*v)),
            Cell::Int64(v) => Some(i128::from(*v)),
            Cell::FixedLenByteArray(b) => {
                let raw: [u8; 16] = b.as_ref().try_into().ok()?;
                Some(i128::from_be_bytes(raw))
            }
            _ => None,
        }
    }
}

/// Rows x columns of cells laid out row by row
#[derive(Debug, Clone, PartialEq)]
pub struct CellMatrix {
    cells: Vec<Cell>,
    rows: usize,
    columns: usize,
}

impl CellMatrix {
    /// Allocate a matrix of null cells
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        let len = rows.checked_mul(columns).ok_or_else(|| {
            IngestError::invalid_argument(format!(
                "chunk of {} rows by {} columns is too large",
                rows, columns
            ))
        })?;
        Ok(Self {
            cells: vec![Cell::Null; len],
            rows,
            columns,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Cell> {
        if column >= self.columns {
            return None;
        }
        self.cells.get(row.checked_mul(self.columns)? + column)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        let start = row.checked_mul(self.columns)?;
        self.cells.get(start..start + self.columns)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, column: usize) -> impl Iterator<Item = &Cell> + '_ {
        let (skip, rows) = if column < self.columns {
            (column, self.rows)
        } else {
            (0, 0)
        };
        self.cells
            .iter()
            .skip(skip)
            .step_by(self.columns.max(1))
            .take(rows)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

/// Storage width of integer-encoded cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Int32,
    Int64,
    Int128,
}

impl BufferKind {
    /// Narrowest width holding every value of `precision` digits
    pub fn for_precision(precision: i32) -> Self {
        match precision {
            p if p <= 9 => BufferKind::Int32,
            p if p <= 18 => BufferKind::Int64,
            _ => BufferKind::Int128,
        }
    }

    pub fn max_precision(&self) -> i32 {
        match self {
            BufferKind::Int32 => 9,
            BufferKind::Int64 => 18,
            BufferKind::Int128 => 38,
        }
    }

    pub fn physical_type(&self) -> PhysicalType {
        match self {
            BufferKind::Int32 => PhysicalType::INT32,
            BufferKind::Int64 => PhysicalType::INT64,
            BufferKind::Int128 => PhysicalType::FIXED_LEN_BYTE_ARRAY,
        }
    }

    /// Encode a value already checked against the column precision
    pub fn narrow(&self, value: Int128) -> Cell {
        match self {
            BufferKind::Int32 => Cell::Int32(value.to_i64() as i32),
            BufferKind::Int64 => Cell::Int64(value.to_i64()),
            BufferKind::Int128 => {
                Cell::FixedLenByteArray(Bytes::copy_from_slice(&value.to_big_endian()))
            }
        }
    }
}

/// Sink for exactly one converted cell
pub trait TypedBuffer {
    fn write_null(&mut self);
    fn write_bool(&mut self, value: bool);
    fn write_f64(&mut self, value: f64);
    fn write_int128(&mut self, value: Int128);
    fn write_bytes(&mut self, value: Bytes);
}

/// Write cursor for one column of a [`CellMatrix`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBuffer {
    kind: BufferKind,
    column_index: usize,
    row_width: usize,
    current_row: usize,
}

impl ColumnBuffer {
    pub fn new(kind: BufferKind) -> Self {
        Self {
            kind,
            column_index: 0,
            row_width: 0,
            current_row: 0,
        }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn current_row(&self) -> usize {
        self.current_row
    }

    /// Point the cursor at the first row of `column_index`
    pub fn prepare(&mut self, column_index: usize, row_width: usize) {
        self.column_index = column_index;
        self.row_width = row_width;
        self.current_row = 0;
    }

    pub fn reset(&mut self) {
        self.column_index = 0;
        self.row_width = 0;
        self.current_row = 0;
    }

    /// Borrow the slot for the current row, `None` if the buffer is not
    /// prepared or the matrix has no room left
    pub fn bind<'a>(&'a mut self, cells: &'a mut [Cell]) -> Option<BoundColumn<'a>> {
        if self.column_index >= self.row_width {
            return None;
        }
        let index = self
            .current_row
            .checked_mul(self.row_width)?
            .checked_add(self.column_index)?;
        let slot = cells.get_mut(index)?;
        Some(BoundColumn { buffer: self, slot })
    }
}

/// A column buffer bound to its slot for the current row
pub struct BoundColumn<'a> {
    buffer: &'a mut ColumnBuffer,
    slot: &'a mut Cell,
}

impl BoundColumn<'_> {
    fn write(&mut self, cell: Cell) {
        *self.slot = cell;
        self.buffer.current_row += 1;
    }
}

impl TypedBuffer for BoundColumn<'_> {
    fn write_null(&mut self) {
        self.write(Cell::Null);
    }

    fn write_bool(&mut self, value: bool) {
        self.write(Cell::Boolean(value));
    }

    fn write_f64(&mut self, value: f64) {
        self.write(Cell::Double(value));
    }

    fn write_int128(&mut self, value: Int128) {
        let cell = self.buffer.kind.narrow(value);
        self.write(cell);
    }

    fn write_bytes(&mut self, value: Bytes) {
        self.write(Cell::ByteArray(value));
    }
}
