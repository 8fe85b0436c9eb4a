use super::table::MaterializedTable;
use crate::schema::{BUSINESS_COLUMNS, INGEST_SEQ_COLUMN, WarehouseTable, get_schema};
use chrono::{DateTime, Utc};
use common::Result;
use datafusion::prelude::SessionContext;
use serde::Serialize;
use tracing::info;

/// Collapses raw records that agree on every business column.
///
/// The record with the smallest `ingest_seq` represents its group, so
/// repeated runs keep the same survivors.
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn dedup_sql(source_table: &str) -> String {
        let business_columns = BUSINESS_COLUMNS.join(", ");
        format!(
            "SELECT {business_columns}, {seq} \
             FROM ( \
                 SELECT {business_columns}, {seq}, \
                        ROW_NUMBER() OVER (PARTITION BY {business_columns} ORDER BY {seq}) AS dup_rank \
                 FROM {source_table} \
             ) ranked \
             WHERE dup_rank = 1 \
             ORDER BY {seq}",
            seq = INGEST_SEQ_COLUMN,
        )
    }

    /// Deduplicates `source_table` into a new table registered as `target`.
    pub async fn deduplicate(
        &self,
        ctx: &SessionContext,
        source_table: &str,
        target: &'static str,
    ) -> Result<(MaterializedTable, DedupMetrics)> {
        let start_time = Utc::now();

        let total_records = ctx.table(source_table).await?.count().await?;

        let deduped = MaterializedTable::from_sql(
            ctx,
            target,
            &Self::dedup_sql(source_table),
            get_schema(WarehouseTable::StagedOrders),
        )
        .await?;
        deduped.register(ctx)?;

        let unique_count = deduped.num_rows();
        let metrics = DedupMetrics {
            total_records,
            duplicate_count: total_records.saturating_sub(unique_count),
            unique_count,
            processing_time_ms: (Utc::now() - start_time).num_milliseconds(),
            processed_at: Utc::now(),
        };
        self.log_metrics(&metrics);

        Ok((deduped, metrics))
    }

    pub fn log_metrics(&self, metrics: &DedupMetrics) {
        let duplicate_percentage = if metrics.total_records > 0 {
            (metrics.duplicate_count as f64 / metrics.total_records as f64) * 100.0
        } else {
            0.0
        };

        info!(
            total_records = metrics.total_records,
            duplicate_count = metrics.duplicate_count,
            unique_count = metrics.unique_count,
            duplicate_percentage = (duplicate_percentage * 100.0).round() / 100.0,
            processing_time_ms = metrics.processing_time_ms,
            "Deduplication complete"
        );
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupMetrics {
    pub total_records: usize,
    pub duplicate_count: usize,
    pub unique_count: usize,
    pub processing_time_ms: i64,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawOrder;
    use crate::schema::RAW_ORDERS_TABLE;
    use crate::test_support::{order, staged_context};
    use crate::utils::arrow::batches_to_json;

    #[tokio::test]
    async fn test_exact_duplicates_collapse_to_first_ingested() {
        let base = order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0);
        let (ctx, _) = staged_context(&[
            base.clone(),
            order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 250.0),
            base.clone(),
            base,
        ])
        .await;

        let (deduped, metrics) = Deduplicator::new()
            .deduplicate(&ctx, RAW_ORDERS_TABLE, "clean_orders")
            .await
            .unwrap();

        assert_eq!(metrics.total_records, 4);
        assert_eq!(metrics.duplicate_count, 2);
        assert_eq!(metrics.unique_count, 2);

        let rows = batches_to_json(deduped.batches()).unwrap();
        let seqs: Vec<i64> = rows.iter().map(|r| r["ingest_seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_null_columns_group_together() {
        let with_nulls = RawOrder {
            order_date: None,
            rating: None,
            ..order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0)
        };
        let (ctx, _) = staged_context(&[with_nulls.clone(), with_nulls]).await;

        let (deduped, _) = Deduplicator::new()
            .deduplicate(&ctx, RAW_ORDERS_TABLE, "clean_orders")
            .await
            .unwrap();

        assert_eq!(deduped.num_rows(), 1);
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let (ctx, _) = staged_context(&[
            order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0),
            order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0),
            order("TX", "Austin", "L2", "R1", "Pizza", "Margherita", "2024-01-01", 200.0),
            order("CA", "Fresno", "L9", "R7", "Thai", "Pad Thai", "2024-02-11", 320.0),
        ])
        .await;
        let dedup = Deduplicator::new();

        let (once, _) = dedup
            .deduplicate(&ctx, RAW_ORDERS_TABLE, "clean_orders")
            .await
            .unwrap();
        let (twice, metrics) = dedup
            .deduplicate(&ctx, "clean_orders", "clean_orders_again")
            .await
            .unwrap();

        assert_eq!(metrics.duplicate_count, 0);
        assert_eq!(
            batches_to_json(once.batches()).unwrap(),
            batches_to_json(twice.batches()).unwrap()
        );
    }
}
