use super::table::MaterializedTable;
use crate::models::RawFeed;
use crate::schema::{RAW_ORDERS_TABLE, WarehouseTable, get_schema};
use crate::utils::arrow::conform_batches;
use arrow::array::{ArrayRef, Int64Array};
use arrow::record_batch::RecordBatch;
use common::Result;
use std::sync::Arc;
use tracing::debug;

pub struct DataTransformer;

impl DataTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Conforms the feed to the raw schema and numbers every record with its
    /// 0-based ingestion position (`ingest_seq`).
    pub fn stage(&self, feed: &RawFeed) -> Result<MaterializedTable> {
        let raw_schema = get_schema(WarehouseTable::RawOrders);
        let staged_schema = get_schema(WarehouseTable::StagedOrders);

        let mut next_seq = 0i64;
        let mut staged = Vec::with_capacity(feed.batches().len());

        for batch in conform_batches(feed.batches(), &raw_schema)? {
            let rows = batch.num_rows() as i64;
            let seq: ArrayRef = Arc::new(Int64Array::from_iter_values(next_seq..next_seq + rows));
            next_seq += rows;

            let mut columns = batch.columns().to_vec();
            columns.push(seq);
            staged.push(RecordBatch::try_new(staged_schema.clone(), columns)?);
        }

        debug!(records = next_seq, "Staged raw feed");

        Ok(MaterializedTable::new(RAW_ORDERS_TABLE, staged_schema, staged))
    }
}

impl Default for DataTransformer {
    fn default() -> Self {
        Self::new()
    }
}
