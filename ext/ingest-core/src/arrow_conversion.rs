//! Export of converted chunks as Arrow record batches
//!
//! Column types map onto Arrow as follows:
//!
//! | Column | Arrow |
//! |---|---|
//! | `Boolean` | `Boolean` |
//! | `Fixed` | `Decimal128(precision, scale)` |
//! | `Real` | `Float64` |
//! | `Binary` with UTF-8, JSON columns | `Utf8` |
//! | `Binary` | `Binary` |
//! | `Timestamp`, `Time`, `Date` | `Int32`, `Int64` or `Decimal128(38, 0)` by storage width |

use crate::buffer::{BufferKind, Cell};
use crate::chunk::Chunk;
use crate::error::{IngestError, Result};
use crate::schema::{ChunkSchema, ColumnDescriptor, ColumnType};
use arrow::record_batch::RecordBatch;
use arrow_array::{builder::*, ArrayRef, Decimal128Array};
use arrow_buffer::{NullBuffer, ScalarBuffer};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Arrow type used to export a column
pub fn column_data_type(column: &ColumnDescriptor) -> DataType {
    match column.column_type {
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Fixed => DataType::Decimal128(column.precision as u8, column.scale as i8),
        ColumnType::Real => DataType::Float64,
        ColumnType::Binary if column.utf8 => DataType::Utf8,
        ColumnType::Binary => DataType::Binary,
        ColumnType::JsonArray | ColumnType::JsonObject | ColumnType::Variant => DataType::Utf8,
        ColumnType::Timestamp | ColumnType::Time | ColumnType::Date => match column.buffer_kind() {
            BufferKind::Int32 => DataType::Int32,
            BufferKind::Int64 => DataType::Int64,
            BufferKind::Int128 => DataType::Decimal128(38, 0),
        },
    }
}

/// Arrow schema with one field per column
pub fn chunk_schema_to_arrow(schema: &ChunkSchema) -> Arc<Schema> {
    let fields: Vec<Field> = schema
        .columns()
        .iter()
        .map(|c| Field::new(&c.name, column_data_type(c), c.nullable))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Build one Arrow array from a column's cells
pub fn cells_to_arrow_array<'a, I>(cells: I, column: &ColumnDescriptor) -> Result<ArrayRef>
where
    I: ExactSizeIterator<Item = &'a Cell>,
{
    match column_data_type(column) {
        DataType::Boolean => build_boolean_array(cells),
        DataType::Float64 => build_float64_array(cells),
        DataType::Utf8 => build_string_array(cells),
        DataType::Binary => build_binary_array(cells),
        DataType::Int32 => build_int32_array(cells),
        DataType::Int64 => build_int64_array(cells),
        DataType::Decimal128(precision, scale) => build_decimal128_array(cells, precision, scale),
        other => Err(IngestError::internal(format!(
            "no array builder for {:?} (column {:?})",
            other, column.name
        ))),
    }
}

/// Convert a finished chunk into a record batch
pub fn chunk_to_record_batch(chunk: &Chunk) -> Result<RecordBatch> {
    let schema = chunk.schema();
    let arrays = schema
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let cells: Vec<&Cell> = chunk.column_cells(index).collect();
            cells_to_arrow_array(cells.into_iter(), column)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordBatch::try_new(chunk_schema_to_arrow(schema), arrays)?)
}

fn unexpected(expected: &str, cell: &Cell) -> IngestError {
    IngestError::internal(format!("Expected {}, got {}", expected, cell.type_name()))
}

fn build_boolean_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = BooleanBuilder::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Cell::Boolean(b) => builder.append_value(*b),
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("Boolean", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_float64_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = Float64Builder::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Cell::Double(f) => builder.append_value(*f),
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("Double", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_string_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = StringBuilder::with_capacity(cells.len(), 0);
    for cell in cells {
        match cell {
            Cell::ByteArray(b) => {
                let text = std::str::from_utf8(b)
                    .map_err(|e| IngestError::internal(format!("text cell is not UTF-8: {}", e)))?;
                builder.append_value(text);
            }
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("ByteArray", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_binary_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = BinaryBuilder::with_capacity(cells.len(), 0);
    for cell in cells {
        match cell {
            Cell::ByteArray(b) => builder.append_value(b),
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("ByteArray", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_int32_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = Int32Builder::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Cell::Int32(i) => builder.append_value(*i),
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("Int32", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_int64_array<'a>(cells: impl ExactSizeIterator<Item = &'a Cell>) -> Result<ArrayRef> {
    let mut builder = Int64Builder::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Cell::Int64(i) => builder.append_value(*i),
            Cell::Null => builder.append_null(),
            other => return Err(unexpected("Int64", other)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Decimal cells may be stored at any width; all widen losslessly to i128
fn build_decimal128_array<'a>(
    cells: impl ExactSizeIterator<Item = &'a Cell>,
    precision: u8,
    scale: i8,
) -> Result<ArrayRef> {
    let mut values = Vec::with_capacity(cells.len());
    let mut validity = Vec::with_capacity(cells.len());
    for cell in cells {
        match cell {
            Cell::Null => {
                values.push(0i128);
                validity.push(false);
            }
            other => {
                let v = other
                    .as_i128()
                    .ok_or_else(|| unexpected("integer cell", other))?;
                values.push(v);
                validity.push(true);
            }
        }
    }

    let nulls = NullBuffer::from(validity);
    let nulls = (nulls.null_count() > 0).then_some(nulls);
    let array = Decimal128Array::try_new(ScalarBuffer::from(values), nulls)?
        .with_precision_and_scale(precision, scale)?;
    Ok(Arc::new(array))
}
