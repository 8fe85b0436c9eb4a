use super::catalog::Report;
use crate::processor::Snapshot;
use crate::utils::arrow::batches_to_json;
use common::Result;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub report: Report,
    pub generation: u64,
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

/// Evaluates catalog reports against a single snapshot.
pub struct ReportEngine<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> ReportEngine<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    pub async fn run(&self, report: Report) -> Result<ReportResult> {
        let started = Instant::now();
        debug!(report = %report, generation = self.snapshot.generation(), "Running report");

        let df = self.snapshot.context().sql(&report.sql()).await?;
        let columns = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let batches = df.collect().await?;
        let rows = batches_to_json(&batches)?;

        info!(
            report = %report,
            generation = self.snapshot.generation(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report complete"
        );

        Ok(ReportResult {
            report,
            generation: self.snapshot.generation(),
            columns,
            rows,
        })
    }

    /// Runs `reports` concurrently; results keep the requested order.
    pub async fn run_many(&self, reports: &[Report]) -> Result<Vec<ReportResult>> {
        try_join_all(reports.iter().map(|report| self.run(*report))).await
    }
}
