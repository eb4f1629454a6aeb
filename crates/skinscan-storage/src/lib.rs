//! skinscan-storage — Capture artifacts on disk and scan history in SQLite.

pub mod artifacts;
pub mod repository;

pub use artifacts::FsArtifactStore;
pub use repository::{ScanRepository, StorageError};
