use super::table::MaterializedTable;
use crate::schema::{
    CLEAN_ORDERS_TABLE, DIM_CATEGORY_TABLE, DIM_DATE_TABLE, DIM_DISH_TABLE, DIM_LOCATION_TABLE,
    DIM_RESTAURANT_TABLE, WarehouseTable, get_schema,
};
use common::Result;
use datafusion::prelude::SessionContext;
use std::collections::BTreeMap;
use tracing::info;

/// The five lookup dimensions of one rebuild.
#[derive(Debug, Clone)]
pub struct Dimensions {
    pub date: MaterializedTable,
    pub location: MaterializedTable,
    pub restaurant: MaterializedTable,
    pub category: MaterializedTable,
    pub dish: MaterializedTable,
}

impl Dimensions {
    pub fn tables(&self) -> [&MaterializedTable; 5] {
        [
            &self.date,
            &self.location,
            &self.restaurant,
            &self.category,
            &self.dish,
        ]
    }

    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.tables()
            .iter()
            .map(|t| (t.name().to_string(), t.num_rows()))
            .collect()
    }
}

/// Derives each dimension from the distinct, non-null natural keys of the
/// deduplicated orders. Surrogate keys are dense and follow natural-key order.
pub struct DimensionBuilder {
    source_table: &'static str,
}

impl DimensionBuilder {
    pub fn new() -> Self {
        Self {
            source_table: CLEAN_ORDERS_TABLE,
        }
    }

    pub fn date_sql(&self) -> String {
        format!(
            "SELECT CAST(ROW_NUMBER() OVER (ORDER BY full_date) AS BIGINT) AS date_id, \
                    full_date, \
                    CAST(date_part('year', full_date) AS INT) AS \"year\", \
                    CAST(date_part('month', full_date) AS INT) AS \"month\", \
                    month_name(full_date) AS month_name, \
                    CAST(date_part('quarter', full_date) AS INT) AS \"quarter\", \
                    iso_week(full_date) AS \"week\", \
                    CAST(date_part('day', full_date) AS INT) AS \"day\", \
                    weekday_name(full_date) AS day_name, \
                    weekday_index(full_date) AS day_of_week \
             FROM (SELECT DISTINCT order_date AS full_date FROM {source} WHERE order_date IS NOT NULL) dates \
             ORDER BY date_id",
            source = self.source_table,
        )
    }

    pub fn location_sql(&self) -> String {
        format!(
            "SELECT CAST(ROW_NUMBER() OVER (ORDER BY state, city, location) AS BIGINT) AS location_id, \
                    state, city, location \
             FROM ( \
                 SELECT DISTINCT state, city, location FROM {source} \
                 WHERE state IS NOT NULL AND city IS NOT NULL AND location IS NOT NULL \
             ) locations \
             ORDER BY location_id",
            source = self.source_table,
        )
    }

    /// Dimension keyed by a single text column.
    pub fn single_key_sql(&self, key_column: &str, natural_key: &str) -> String {
        format!(
            "SELECT CAST(ROW_NUMBER() OVER (ORDER BY {natural_key}) AS BIGINT) AS {key_column}, \
                    {natural_key} \
             FROM (SELECT DISTINCT {natural_key} FROM {source} WHERE {natural_key} IS NOT NULL) natural_keys \
             ORDER BY {key_column}",
            source = self.source_table,
        )
    }

    async fn build_one(
        &self,
        ctx: &SessionContext,
        name: &'static str,
        sql: String,
        table: WarehouseTable,
    ) -> Result<MaterializedTable> {
        let dimension = MaterializedTable::from_sql(ctx, name, &sql, get_schema(table)).await?;
        dimension.register(ctx)?;
        Ok(dimension)
    }

    /// Builds all five dimensions concurrently and registers them in `ctx`.
    pub async fn build(&self, ctx: &SessionContext) -> Result<Dimensions> {
        let (date, location, restaurant, category, dish) = futures::try_join!(
            self.build_one(ctx, DIM_DATE_TABLE, self.date_sql(), WarehouseTable::DimDate),
            self.build_one(
                ctx,
                DIM_LOCATION_TABLE,
                self.location_sql(),
                WarehouseTable::DimLocation
            ),
            self.build_one(
                ctx,
                DIM_RESTAURANT_TABLE,
                self.single_key_sql("restaurant_id", "restaurant_name"),
                WarehouseTable::DimRestaurant
            ),
            self.build_one(
                ctx,
                DIM_CATEGORY_TABLE,
                self.single_key_sql("category_id", "category"),
                WarehouseTable::DimCategory
            ),
            self.build_one(
                ctx,
                DIM_DISH_TABLE,
                self.single_key_sql("dish_id", "dish_name"),
                WarehouseTable::DimDish
            ),
        )?;

        let dimensions = Dimensions {
            date,
            location,
            restaurant,
            category,
            dish,
        };

        info!(row_counts = ?dimensions.row_counts(), "Dimensions built");

        Ok(dimensions)
    }
}

impl Default for DimensionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
