//! Artifact store contract: where captured images go.

use crate::types::{ArtifactRef, CaptureAngle};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image data is empty")]
    EmptyImage,
    #[error("store rejected capture: {0}")]
    Rejected(String),
}

/// Persists a captured image for one angle and hands back a stable reference.
///
/// Saving the same angle twice must be safe; the session keeps only the
/// most recent reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save(&self, angle: CaptureAngle, image: Vec<u8>) -> Result<ArtifactRef, StoreError>;
}
