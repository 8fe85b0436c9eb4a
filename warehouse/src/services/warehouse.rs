use crate::models::RawFeed;
use crate::processor::{RebuildSummary, Snapshot, WarehouseProcessor};
use crate::reports::{Report, ReportEngine, ReportResult};
use crate::storage::{ParquetSnapshotStore, RawSource, SnapshotStore};
use common::config::{Settings, SourceConfig};
use common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

/// Owns the published star schema and the rebuild lifecycle.
///
/// Readers clone the current `Arc<Snapshot>` and keep using it even while a
/// rebuild publishes a newer generation. Rebuilds are serialized; the mutex
/// also guards the last published generation number.
pub struct WarehouseService {
    processor: WarehouseProcessor,
    source: Option<SourceConfig>,
    store: Option<Arc<dyn SnapshotStore>>,
    current: RwLock<Option<Arc<Snapshot>>>,
    rebuild_lock: Mutex<u64>,
}

impl WarehouseService {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let store = settings
            .warehouse
            .output_dir
            .as_ref()
            .map(|dir| {
                let store = ParquetSnapshotStore::new(dir)
                    .with_retention(settings.warehouse.keep_generations);
                Arc::new(store) as Arc<dyn SnapshotStore>
            });

        Self::with_store(Some(settings.source.clone()), store).await
    }

    /// Generation numbers continue from the store's current manifest.
    pub async fn with_store(
        source: Option<SourceConfig>,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> Result<Self> {
        let last_generation = match &store {
            Some(store) => store
                .current_manifest()
                .await?
                .map(|manifest| manifest.generation)
                .unwrap_or(0),
            None => 0,
        };

        Ok(Self {
            processor: WarehouseProcessor::new(),
            source,
            store,
            current: RwLock::new(None),
            rebuild_lock: Mutex::new(last_generation),
        })
    }

    /// A service with no configured source and no persistence.
    pub fn in_memory() -> Self {
        Self {
            processor: WarehouseProcessor::new(),
            source: None,
            store: None,
            current: RwLock::new(None),
            rebuild_lock: Mutex::new(0),
        }
    }

    /// Rebuilds the model from `feed` and publishes it.
    pub async fn rebuild(&self, feed: &RawFeed) -> Result<RebuildSummary> {
        let mut last_generation = self.rebuild_lock.lock().await;
        self.rebuild_locked(&mut last_generation, feed).await
    }

    /// Reloads the configured source and rebuilds from it.
    pub async fn rebuild_from_source(&self) -> Result<RebuildSummary> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| Error::InvalidInput("No raw source configured".to_string()))?;

        let mut last_generation = self.rebuild_lock.lock().await;
        let generation = *last_generation + 1;

        let feed = RawSource::new(source)
            .load()
            .await
            .map_err(|e| Self::failed(generation, e))?;

        self.rebuild_locked(&mut last_generation, &feed).await
    }

    async fn rebuild_locked(
        &self,
        last_generation: &mut u64,
        feed: &RawFeed,
    ) -> Result<RebuildSummary> {
        let generation = *last_generation + 1;

        let mut snapshot = self
            .processor
            .build(feed, generation)
            .await
            .map_err(|e| Self::failed(generation, e))?;

        if let Some(store) = &self.store {
            let location = store
                .persist(&snapshot)
                .await
                .map_err(|e| Self::failed(generation, e))?;
            snapshot.set_persisted_to(location);
        }

        let summary = snapshot.summary().clone();
        *self.current.write().await = Some(Arc::new(snapshot));
        *last_generation = generation;

        info!(
            generation,
            build_id = %summary.build_id,
            fact_rows = summary.facts.loaded_records,
            "Published warehouse snapshot"
        );

        Ok(summary)
    }

    fn failed(generation: u64, source: Error) -> Error {
        error!(generation, error = %source, "Rebuild failed, keeping previous snapshot");
        Error::rebuild_failed(generation, source)
    }

    /// The currently published snapshot.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(Error::ModelNotBuilt)
    }

    pub async fn summary(&self) -> Result<RebuildSummary> {
        Ok(self.snapshot().await?.summary().clone())
    }

    pub async fn run_report(&self, name: &str) -> Result<ReportResult> {
        let report: Report = name.parse()?;
        let snapshot = self.snapshot().await?;
        ReportEngine::new(&snapshot).run(report).await
    }

    /// Runs the whole catalog against one snapshot.
    pub async fn run_all(&self) -> Result<Vec<ReportResult>> {
        let snapshot = self.snapshot().await?;
        ReportEngine::new(&snapshot).run_many(&Report::ALL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SnapshotManifest;
    use crate::test_support::order;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FailingStore;

    #[async_trait]
    impl SnapshotStore for FailingStore {
        async fn persist(&self, _snapshot: &Snapshot) -> Result<String> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn current_manifest(&self) -> Result<Option<SnapshotManifest>> {
            Ok(None)
        }
    }

    fn feed() -> RawFeed {
        let base = order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0);
        RawFeed::from_orders(&[base.clone(), base]).unwrap()
    }

    #[tokio::test]
    async fn test_reports_before_first_rebuild_fail() {
        let service = WarehouseService::in_memory();

        let err = service.run_report("kpis").await.unwrap_err();
        assert!(matches!(err, Error::ModelNotBuilt));
        assert!(matches!(service.run_all().await, Err(Error::ModelNotBuilt)));
    }

    #[tokio::test]
    async fn test_unknown_report_is_rejected_before_snapshot_lookup() {
        let service = WarehouseService::in_memory();

        let err = service.run_report("top_drivers").await.unwrap_err();
        assert!(matches!(err, Error::UnknownReport(_)));
    }

    #[tokio::test]
    async fn test_rebuild_publishes_next_generation() {
        let service = WarehouseService::in_memory();

        let first = service.rebuild(&feed()).await.unwrap();
        let held = service.snapshot().await.unwrap();
        let second = service.rebuild(&feed()).await.unwrap();

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_ne!(first.build_id, second.build_id);
        // A reader keeps its generation after a newer one is published
        assert_eq!(held.generation(), 1);
        assert_eq!(service.snapshot().await.unwrap().generation(), 2);

        let kpis = service.run_report("kpis").await.unwrap();
        assert_eq!(kpis.generation, 2);
        assert_eq!(kpis.rows[0]["total_orders"], 1);
        assert_eq!(kpis.rows[0]["total_revenue"], 200.0);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_snapshot() {
        let service = WarehouseService::in_memory();
        service.rebuild(&feed()).await.unwrap();

        let failing = WarehouseService {
            store: Some(Arc::new(FailingStore)),
            ..service
        };
        let err = failing.rebuild(&feed()).await.unwrap_err();

        match err {
            Error::RebuildFailed { generation, source } => {
                assert_eq!(generation, 2);
                assert!(matches!(*source, Error::Storage(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(failing.snapshot().await.unwrap().generation(), 1);

        let retry = failing.rebuild(&feed()).await.unwrap_err();
        assert!(matches!(retry, Error::RebuildFailed { generation: 2, .. }));
    }

    #[tokio::test]
    async fn test_rebuild_without_source_is_invalid_input() {
        let service = WarehouseService::in_memory();

        let err = service.rebuild_from_source().await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unreadable_source_is_a_rebuild_failure() {
        let dir = TempDir::new().unwrap();
        let source = SourceConfig {
            path: dir.path().join("missing.csv").to_string_lossy().into_owned(),
            format: common::config::SourceFormat::Csv,
            has_header: true,
            delimiter: ',',
        };
        let service = WarehouseService::with_store(Some(source), None).await.unwrap();

        let err = service.rebuild_from_source().await.unwrap_err();
        assert!(matches!(err, Error::RebuildFailed { generation: 1, .. }));
        assert!(matches!(service.snapshot().await, Err(Error::ModelNotBuilt)));
    }

    #[tokio::test]
    async fn test_generations_continue_from_persisted_store() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn SnapshotStore> = Arc::new(ParquetSnapshotStore::new(dir.path()));

        let first = WarehouseService::with_store(None, Some(store.clone())).await.unwrap();
        let summary = first.rebuild(&feed()).await.unwrap();
        assert_eq!(summary.generation, 1);
        assert!(summary.persisted_to.unwrap().ends_with("generation-000001"));

        let restarted = WarehouseService::with_store(None, Some(store)).await.unwrap();
        let summary = restarted.rebuild(&feed()).await.unwrap();
        assert_eq!(summary.generation, 2);
    }

    #[tokio::test]
    async fn test_run_all_returns_every_report_for_one_generation() {
        let service = WarehouseService::in_memory();
        service.rebuild(&feed()).await.unwrap();

        let results = service.run_all().await.unwrap();

        assert_eq!(results.len(), Report::ALL.len());
        assert!(results.iter().all(|r| r.generation == 1));
    }
}
