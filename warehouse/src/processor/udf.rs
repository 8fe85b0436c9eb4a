use crate::models::days_to_date;
use chrono::{Datelike, NaiveDate};
use datafusion::arrow::array::{Array, ArrayRef, Date32Array, Int32Array, StringArray};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::DataFusionError;
use datafusion::error::Result as DFResult;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::{ColumnarValue, Volatility, create_udf};
use std::sync::Arc;

/// Registers the calendar UDFs used to derive the date dimension.
///
/// Weeks follow ISO-8601 and weekday indexes run Monday=1..Sunday=7.
pub fn register_udfs(ctx: &SessionContext) {
    let month_name_udf = create_udf(
        "month_name",
        vec![DataType::Date32],
        DataType::Utf8,
        Volatility::Immutable,
        Arc::new(month_name),
    );

    let iso_week_udf = create_udf(
        "iso_week",
        vec![DataType::Date32],
        DataType::Int32,
        Volatility::Immutable,
        Arc::new(iso_week),
    );

    let weekday_name_udf = create_udf(
        "weekday_name",
        vec![DataType::Date32],
        DataType::Utf8,
        Volatility::Immutable,
        Arc::new(weekday_name),
    );

    let weekday_index_udf = create_udf(
        "weekday_index",
        vec![DataType::Date32],
        DataType::Int32,
        Volatility::Immutable,
        Arc::new(weekday_index),
    );

    ctx.register_udf(month_name_udf);
    ctx.register_udf(iso_week_udf);
    ctx.register_udf(weekday_name_udf);
    ctx.register_udf(weekday_index_udf);
}

fn date_values(args: &[ColumnarValue]) -> DFResult<Vec<Option<NaiveDate>>> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let array: &ArrayRef = arrays
        .first()
        .ok_or_else(|| DataFusionError::Internal("Expected one date argument".to_string()))?;

    let dates = array
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| DataFusionError::Internal("Expected date32 array".to_string()))?;

    Ok(dates.iter().map(|d| d.and_then(days_to_date)).collect())
}

fn month_name(args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
    let result: StringArray = date_values(args)?
        .into_iter()
        .map(|d| d.map(|d| d.format("%B").to_string()))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn iso_week(args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
    let result: Int32Array = date_values(args)?
        .into_iter()
        .map(|d| d.map(|d| d.iso_week().week() as i32))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn weekday_name(args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
    let result: StringArray = date_values(args)?
        .into_iter()
        .map(|d| d.map(|d| d.format("%A").to_string()))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn weekday_index(args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
    let result: Int32Array = date_values(args)?
        .into_iter()
        .map(|d| d.map(|d| d.weekday().number_from_monday() as i32))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}
