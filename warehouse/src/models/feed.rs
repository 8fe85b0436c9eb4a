use super::order::{RawOrder, raw_orders_to_batch};
use crate::utils::arrow::total_rows;
use arrow::record_batch::RecordBatch;
use common::Result;

/// The raw order feed handed to a rebuild, in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    batches: Vec<RecordBatch>,
}

impl RawFeed {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    pub fn from_orders(orders: &[RawOrder]) -> Result<Self> {
        Ok(Self::new(vec![raw_orders_to_batch(orders)?]))
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        total_rows(&self.batches)
    }
}
