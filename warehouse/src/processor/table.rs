use crate::utils::arrow::{conform_batches, total_rows};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use common::Result;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::debug;

/// A fully computed relation held as Arrow batches.
#[derive(Debug, Clone)]
pub struct MaterializedTable {
    name: &'static str,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl MaterializedTable {
    pub fn new(name: &'static str, schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self {
            name,
            schema,
            batches,
        }
    }

    /// Runs `sql` and materializes its result in the `target` schema.
    pub async fn from_sql(
        ctx: &SessionContext,
        name: &'static str,
        sql: &str,
        target: SchemaRef,
    ) -> Result<Self> {
        let batches = ctx.sql(sql).await?.collect().await?;
        let batches = conform_batches(&batches, &target)?;

        debug!(table = name, rows = total_rows(&batches), "Materialized table");

        Ok(Self::new(name, target, batches))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        total_rows(&self.batches)
    }

    /// Registers the table under its name, replacing any previous registration.
    pub fn register(&self, ctx: &SessionContext) -> Result<()> {
        let _ = ctx.deregister_table(self.name);

        let table = MemTable::try_new(self.schema.clone(), vec![self.batches.clone()])?;
        ctx.register_table(self.name, Arc::new(table))?;

        Ok(())
    }
}
