use crate::schema::{PRICE_PRECISION, PRICE_SCALE, WarehouseTable, get_schema};
use arrow::array::{ArrayRef, Date32Array, Decimal128Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One record of the raw order feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawOrder {
    pub state: Option<String>,
    pub city: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub restaurant_name: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub dish_name: Option<String>,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
}

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn price_to_cents(price: f64) -> Result<i128> {
    let scaled = (price * 10f64.powi(PRICE_SCALE as i32)).round();
    if !scaled.is_finite() || scaled.abs() >= 10f64.powi(PRICE_PRECISION as i32) {
        return Err(Error::InvalidInput(format!(
            "Price {} does not fit Decimal128({}, {})",
            price, PRICE_PRECISION, PRICE_SCALE
        )));
    }
    Ok(scaled as i128)
}

fn text_column<'a>(
    orders: &'a [RawOrder],
    value: impl Fn(&'a RawOrder) -> Option<&'a str>,
) -> ArrayRef {
    Arc::new(StringArray::from_iter(orders.iter().map(value)))
}

/// Builds a batch in the raw feed schema.
pub fn raw_orders_to_batch(orders: &[RawOrder]) -> Result<RecordBatch> {
    let prices = orders
        .iter()
        .map(|o| o.price.map(price_to_cents).transpose())
        .collect::<Result<Vec<Option<i128>>>>()?;

    let columns: Vec<ArrayRef> = vec![
        text_column(orders, |o| o.state.as_deref()),
        text_column(orders, |o| o.city.as_deref()),
        Arc::new(Date32Array::from(
            orders
                .iter()
                .map(|o| o.order_date.map(date_to_days))
                .collect::<Vec<_>>(),
        )),
        text_column(orders, |o| o.restaurant_name.as_deref()),
        text_column(orders, |o| o.location.as_deref()),
        text_column(orders, |o| o.category.as_deref()),
        text_column(orders, |o| o.dish_name.as_deref()),
        Arc::new(
            Decimal128Array::from(prices).with_precision_and_scale(PRICE_PRECISION, PRICE_SCALE)?,
        ),
        Arc::new(Float64Array::from(
            orders.iter().map(|o| o.rating).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            orders.iter().map(|o| o.rating_count).collect::<Vec<_>>(),
        )),
    ];

    Ok(RecordBatch::try_new(
        get_schema(WarehouseTable::RawOrders),
        columns,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn test_epoch_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_to_days(date), 19_723);
        assert_eq!(days_to_date(19_723), Some(date));
    }

    #[test]
    fn test_batch_keeps_nulls_and_scales_price() {
        let orders = vec![
            RawOrder {
                state: Some("TX".into()),
                price: Some(199.99),
                ..Default::default()
            },
            RawOrder::default(),
        ];

        let batch = raw_orders_to_batch(&orders).unwrap();

        assert_eq!(batch.num_rows(), 2);
        let prices = batch
            .column(7)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(prices.value(0), 19_999);
        assert!(prices.is_null(1));
        assert!(batch.column(2).is_null(0));
    }

    #[test]
    fn test_raw_order_serializes_with_feed_column_names() {
        let order = RawOrder {
            city: Some("Austin".into()),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            rating_count: Some(10),
            ..Default::default()
        };

        let json = serde_json::to_value(&order).unwrap();
        let schema = get_schema(WarehouseTable::RawOrders);

        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), schema.fields().len());
        assert!(schema.fields().iter().all(|f| keys.contains(&f.name().as_str())));
        assert_eq!(json["order_date"], "2024-01-01");
        assert!(json["state"].is_null());
    }
}
