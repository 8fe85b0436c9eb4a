use super::table::MaterializedTable;
use crate::schema::{
    CLEAN_ORDERS_TABLE, DIM_CATEGORY_TABLE, DIM_DATE_TABLE, DIM_DISH_TABLE, DIM_LOCATION_TABLE,
    DIM_RESTAURANT_TABLE, FACT_ORDERS_TABLE, INGEST_SEQ_COLUMN, WarehouseTable, get_schema,
};
use common::Result;
use datafusion::prelude::SessionContext;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct FactLoadMetrics {
    pub candidate_records: usize,
    pub loaded_records: usize,
    /// Records with at least one natural key missing from its dimension.
    pub excluded_records: usize,
}

/// Resolves surrogate keys for every deduplicated order by inner joins on
/// natural-key equality. Orders that miss any dimension produce no fact row.
pub struct FactLoader;

impl FactLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load_sql(&self) -> String {
        format!(
            "SELECT CAST(ROW_NUMBER() OVER (ORDER BY o.{seq}) AS BIGINT) AS order_id, \
                    d.date_id, l.location_id, r.restaurant_id, c.category_id, di.dish_id, \
                    o.price, o.rating, o.rating_count \
             FROM {orders} o \
             JOIN {dim_date} d ON d.full_date = o.order_date \
             JOIN {dim_location} l ON l.state = o.state AND l.city = o.city AND l.location = o.location \
             JOIN {dim_restaurant} r ON r.restaurant_name = o.restaurant_name \
             JOIN {dim_category} c ON c.category = o.category \
             JOIN {dim_dish} di ON di.dish_name = o.dish_name \
             ORDER BY order_id",
            seq = INGEST_SEQ_COLUMN,
            orders = CLEAN_ORDERS_TABLE,
            dim_date = DIM_DATE_TABLE,
            dim_location = DIM_LOCATION_TABLE,
            dim_restaurant = DIM_RESTAURANT_TABLE,
            dim_category = DIM_CATEGORY_TABLE,
            dim_dish = DIM_DISH_TABLE,
        )
    }

    /// Loads `fact_orders` from the registered clean orders and dimensions.
    pub async fn load(&self, ctx: &SessionContext) -> Result<(MaterializedTable, FactLoadMetrics)> {
        let candidate_records = ctx.table(CLEAN_ORDERS_TABLE).await?.count().await?;

        let facts = MaterializedTable::from_sql(
            ctx,
            FACT_ORDERS_TABLE,
            &self.load_sql(),
            get_schema(WarehouseTable::FactOrders),
        )
        .await?;
        facts.register(ctx)?;

        let metrics = FactLoadMetrics {
            candidate_records,
            loaded_records: facts.num_rows(),
            excluded_records: candidate_records.saturating_sub(facts.num_rows()),
        };

        if metrics.excluded_records > 0 {
            debug!(
                excluded = metrics.excluded_records,
                "Orders without a full dimension match were left out of the fact table"
            );
        }
        info!(
            candidate_records = metrics.candidate_records,
            loaded_records = metrics.loaded_records,
            excluded_records = metrics.excluded_records,
            "Fact table loaded"
        );

        Ok((facts, metrics))
    }
}

impl Default for FactLoader {
    fn default() -> Self {
        Self::new()
    }
}
