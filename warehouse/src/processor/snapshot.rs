use super::dedup::DedupMetrics;
use super::facts::FactLoadMetrics;
use super::table::MaterializedTable;
use super::udf::register_udfs;
use super::validation::ValidationReport;
use chrono::{DateTime, Utc};
use common::Result;
use datafusion::prelude::SessionContext;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// What one completed rebuild produced.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub generation: u64,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub raw_records: usize,
    pub validation: ValidationReport,
    pub dedup: DedupMetrics,
    pub dimensions: BTreeMap<String, usize>,
    pub facts: FactLoadMetrics,
    /// Where the generation was persisted, when persistence is configured.
    pub persisted_to: Option<String>,
}

/// One immutable generation of the star schema.
///
/// Holds its own session with the five dimensions and the fact table
/// registered, so reports never observe a model that is still being built.
pub struct Snapshot {
    summary: RebuildSummary,
    tables: Vec<MaterializedTable>,
    ctx: SessionContext,
}

impl Snapshot {
    pub fn new(summary: RebuildSummary, tables: Vec<MaterializedTable>) -> Result<Self> {
        let ctx = SessionContext::new();
        register_udfs(&ctx);
        for table in &tables {
            table.register(&ctx)?;
        }

        Ok(Self {
            summary,
            tables,
            ctx,
        })
    }

    pub fn generation(&self) -> u64 {
        self.summary.generation
    }

    pub fn build_id(&self) -> Uuid {
        self.summary.build_id
    }

    pub fn summary(&self) -> &RebuildSummary {
        &self.summary
    }

    pub fn set_persisted_to(&mut self, location: String) {
        self.summary.persisted_to = Some(location);
    }

    pub fn tables(&self) -> &[MaterializedTable] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&MaterializedTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.summary.generation)
            .field("build_id", &self.summary.build_id)
            .field(
                "tables",
                &self.tables.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
