mod snapshot_store;
mod source;

pub use snapshot_store::{ParquetSnapshotStore, SnapshotManifest, SnapshotStore, TableManifest};
pub use source::RawSource;
