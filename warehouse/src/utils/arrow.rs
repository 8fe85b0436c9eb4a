use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray, StringViewArray, UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use common::{Error, Result};
use serde_json::{Number, Value};

pub fn batches_to_json(batches: &[RecordBatch]) -> Result<Vec<Value>> {
    let mut json_rows = Vec::new();

    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row = serde_json::Map::new();

            for (col_idx, field) in batch.schema().fields().iter().enumerate() {
                let column = batch.column(col_idx);
                let value = arrow_array_to_json(column.as_ref(), row_idx)?;
                row.insert(field.name().clone(), value);
            }

            json_rows.push(Value::Object(row));
        }
    }

    Ok(json_rows)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, type_name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Failed to downcast to {}", type_name)))
}

pub fn arrow_array_to_json(array: &dyn Array, index: usize) -> Result<Value> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    Ok(match array.data_type() {
        DataType::Boolean => {
            Value::Bool(downcast::<BooleanArray>(array, "BooleanArray")?.value(index))
        }
        DataType::Int32 => {
            let array = downcast::<Int32Array>(array, "Int32Array")?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::Int64 => {
            let array = downcast::<Int64Array>(array, "Int64Array")?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::UInt64 => {
            let array = downcast::<UInt64Array>(array, "UInt64Array")?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::Float64 => {
            let array = downcast::<Float64Array>(array, "Float64Array")?;
            Number::from_f64(array.value(index))
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        DataType::Utf8 => {
            let array = downcast::<StringArray>(array, "StringArray")?;
            Value::String(array.value(index).to_string())
        }
        DataType::LargeUtf8 => {
            let array = downcast::<LargeStringArray>(array, "LargeStringArray")?;
            Value::String(array.value(index).to_string())
        }
        DataType::Utf8View => {
            let array = downcast::<StringViewArray>(array, "StringViewArray")?;
            Value::String(array.value(index).to_string())
        }
        // Dates and decimals keep their canonical text form
        _ => Value::String(array_value_to_string(array, index)?),
    })
}

/// Projects `batch` onto `target` by column name, casting each column to the
/// target type. Extra input columns are ignored.
pub fn conform_batch(batch: &RecordBatch, target: &SchemaRef) -> Result<RecordBatch> {
    let source_schema = batch.schema();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(target.fields().len());

    for field in target.fields() {
        let idx = source_schema.index_of(field.name()).map_err(|_| {
            Error::SchemaMismatch(format!(
                "Missing column '{}'. Found: {:?}",
                field.name(),
                source_schema
                    .fields()
                    .iter()
                    .map(|f| f.name().as_str())
                    .collect::<Vec<_>>()
            ))
        })?;

        let column = batch.column(idx);
        if column.data_type() == field.data_type() {
            columns.push(column.clone());
        } else {
            columns.push(cast(column, field.data_type()).map_err(|e| {
                Error::SchemaMismatch(format!(
                    "Column '{}' cannot be read as {:?}: {}",
                    field.name(),
                    field.data_type(),
                    e
                ))
            })?);
        }
    }

    Ok(RecordBatch::try_new(target.clone(), columns)?)
}

pub fn conform_batches(batches: &[RecordBatch], target: &SchemaRef) -> Result<Vec<RecordBatch>> {
    batches
        .iter()
        .filter(|batch| batch.num_rows() > 0)
        .map(|batch| conform_batch(batch, target))
        .collect()
}

pub fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|b| b.num_rows()).sum()
}
