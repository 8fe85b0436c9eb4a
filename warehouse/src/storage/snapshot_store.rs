use crate::processor::{MaterializedTable, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

const CURRENT_POINTER: &str = "CURRENT";
const MANIFEST_FILE: &str = "manifest.json";
const GENERATION_DIR_PREFIX: &str = "generation-";

/// Generations kept on disk when no retention is configured.
pub const DEFAULT_KEEP_GENERATIONS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableManifest {
    pub name: String,
    pub file: String,
    pub rows: usize,
}

/// Describes one persisted generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotManifest {
    pub generation: u64,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub tables: Vec<TableManifest>,
    /// SHA-256 over the table files in manifest order.
    pub checksum: String,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persists `snapshot` and makes it the current generation. Returns the
    /// location it was written to.
    async fn persist(&self, snapshot: &Snapshot) -> Result<String>;

    /// Manifest of the current generation, if one was ever persisted.
    async fn current_manifest(&self) -> Result<Option<SnapshotManifest>>;
}

/// Writes each generation as a directory of Parquet files under `root`:
///
/// ```text
/// root/
///   CURRENT                  -> "generation-000002"
///   generation-000001/
///   generation-000002/
///     dim_date.parquet ... fact_orders.parquet
///     manifest.json
/// ```
///
/// A generation is assembled in a staging directory and renamed into place
/// before `CURRENT` is swapped, so readers of `CURRENT` only ever see
/// complete generations. After each publish only the newest
/// `keep_generations` generation directories are kept.
pub struct ParquetSnapshotStore {
    root: PathBuf,
    keep_generations: usize,
}

impl ParquetSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_generations: DEFAULT_KEEP_GENERATIONS,
        }
    }

    /// The published generation always survives, so values below 1 act as 1.
    pub fn with_retention(mut self, keep_generations: usize) -> Self {
        self.keep_generations = keep_generations.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generation_dir_name(generation: u64) -> String {
        format!("{GENERATION_DIR_PREFIX}{generation:06}")
    }

    fn parse_generation_dir(name: &str) -> Option<u64> {
        name.strip_prefix(GENERATION_DIR_PREFIX)?.parse().ok()
    }

    /// Removes generation directories older than the retention window
    /// ending at `current`. Returns the generations removed.
    async fn prune(&self, current: u64) -> Result<Vec<u64>> {
        let oldest_kept = current.saturating_sub(self.keep_generations as u64 - 1);

        let mut entries = fs::read_dir(&self.root).await?;
        let mut removed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(generation) = name.to_str().and_then(Self::parse_generation_dir) else {
                continue;
            };
            if generation < oldest_kept && entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
                removed.push(generation);
            }
        }
        removed.sort_unstable();

        Ok(removed)
    }

    fn encode_table(table: &MaterializedTable, snapshot: &Snapshot) -> Result<Vec<u8>> {
        let props = WriterProperties::builder()
            .set_key_value_metadata(Some(vec![
                KeyValue::new("generation".to_string(), snapshot.generation().to_string()),
                KeyValue::new("build_id".to_string(), snapshot.build_id().to_string()),
            ]))
            .build();

        let mut buffer: Vec<u8> = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, table.schema(), Some(props))?;
        for batch in table.batches() {
            writer.write(batch)?;
        }
        writer.close()?;

        Ok(buffer)
    }

    async fn write_generation(&self, staging: &Path, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(staging).await?;

        let mut hasher = Sha256::new();
        let mut tables = Vec::with_capacity(snapshot.tables().len());

        for table in snapshot.tables() {
            let file = format!("{}.parquet", table.name());
            let bytes = Self::encode_table(table, snapshot)?;
            hasher.update(&bytes);
            fs::write(staging.join(&file), &bytes).await?;

            tables.push(TableManifest {
                name: table.name().to_string(),
                file,
                rows: table.num_rows(),
            });
        }

        let summary = snapshot.summary();
        let manifest = SnapshotManifest {
            generation: summary.generation,
            build_id: summary.build_id,
            built_at: summary.built_at,
            tables,
            checksum: format!("{:x}", hasher.finalize()),
        };
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;

        Ok(())
    }

    async fn publish(&self, staging: &Path, generation: u64) -> Result<PathBuf> {
        let dir_name = Self::generation_dir_name(generation);
        let target = self.root.join(&dir_name);

        // Leftover from an interrupted run that never reached CURRENT
        if fs::try_exists(&target).await? {
            fs::remove_dir_all(&target).await?;
        }
        fs::rename(staging, &target).await?;

        let pointer_tmp = self.root.join(format!("{CURRENT_POINTER}.tmp"));
        fs::write(&pointer_tmp, format!("{dir_name}\n")).await?;
        fs::rename(&pointer_tmp, self.root.join(CURRENT_POINTER)).await?;

        Ok(target)
    }
}

#[async_trait]
impl SnapshotStore for ParquetSnapshotStore {
    async fn persist(&self, snapshot: &Snapshot) -> Result<String> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Storage(format!(
                "Cannot create snapshot root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let staging = self.root.join(format!(".staging-{}", snapshot.build_id()));

        let written = match self.write_generation(&staging, snapshot).await {
            Ok(()) => self.publish(&staging, snapshot.generation()).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(target) => {
                let location = target.to_string_lossy().into_owned();
                info!(
                    generation = snapshot.generation(),
                    location = %location,
                    "Snapshot persisted"
                );

                // The new generation is already current; pruning is best effort
                match self.prune(snapshot.generation()).await {
                    Ok(removed) if !removed.is_empty() => {
                        info!(removed = ?removed, "Pruned old snapshot generations");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to prune old snapshot generations"),
                }

                Ok(location)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        warn!(
                            staging = %staging.display(),
                            error = %cleanup,
                            "Failed to remove staging directory"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn current_manifest(&self) -> Result<Option<SnapshotManifest>> {
        let pointer = match fs::read_to_string(self.root.join(CURRENT_POINTER)).await {
            Ok(pointer) => pointer,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let manifest_path = self.root.join(pointer.trim()).join(MANIFEST_FILE);
        let manifest = serde_json::from_slice(&fs::read(&manifest_path).await?)?;

        Ok(Some(manifest))
    }
}
