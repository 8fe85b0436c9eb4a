use crate::models::{RawFeed, RawOrder};
use crate::processor::{DataTransformer, Deduplicator, MaterializedTable, register_udfs};
use crate::schema::{CLEAN_ORDERS_TABLE, RAW_ORDERS_TABLE};
use chrono::NaiveDate;
use datafusion::prelude::SessionContext;

#[allow(clippy::too_many_arguments)]
pub fn order(
    state: &str,
    city: &str,
    location: &str,
    restaurant: &str,
    category: &str,
    dish: &str,
    date: &str,
    price: f64,
) -> RawOrder {
    RawOrder {
        state: Some(state.to_string()),
        city: Some(city.to_string()),
        order_date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        restaurant_name: Some(restaurant.to_string()),
        location: Some(location.to_string()),
        category: Some(category.to_string()),
        dish_name: Some(dish.to_string()),
        price: Some(price),
        rating: Some(4.5),
        rating_count: Some(10),
    }
}

pub fn staged_table(orders: &[RawOrder]) -> MaterializedTable {
    let feed = RawFeed::from_orders(orders).unwrap();
    DataTransformer::new().stage(&feed).unwrap()
}

/// A session with the UDFs and the staged raw orders registered.
pub async fn staged_context(orders: &[RawOrder]) -> (SessionContext, MaterializedTable) {
    let ctx = SessionContext::new();
    register_udfs(&ctx);
    let staged = staged_table(orders);
    assert_eq!(staged.name(), RAW_ORDERS_TABLE);
    staged.register(&ctx).unwrap();
    (ctx, staged)
}

/// A session holding deduplicated orders as `clean_orders`.
pub async fn clean_context(orders: &[RawOrder]) -> SessionContext {
    let (ctx, _) = staged_context(orders).await;
    Deduplicator::new()
        .deduplicate(&ctx, RAW_ORDERS_TABLE, CLEAN_ORDERS_TABLE)
        .await
        .unwrap();
    ctx
}
