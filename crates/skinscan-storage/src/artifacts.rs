//! Capture images on the local filesystem.

use async_trait::async_trait;
use skinscan_core::{ArtifactRef, ArtifactStore, CaptureAngle, StoreError};
use std::path::{Path, PathBuf};

/// Writes each capture to its own file under a single directory.
///
/// File names are `scan_<uuid>_<angle>.jpg`, so re-capturing an angle never
/// clobbers an image an earlier record still points at.
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete a saved capture. A file that is already gone is not an error.
    pub async fn remove(&self, artifact: &ArtifactRef) -> Result<(), StoreError> {
        match tokio::fs::remove_file(artifact.as_str()).await {
            Ok(()) => {
                tracing::debug!(%artifact, "artifact removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, angle: CaptureAngle, image: Vec<u8>) -> Result<ArtifactRef, StoreError> {
        if image.is_empty() {
            return Err(StoreError::EmptyImage);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!("scan_{}_{}.jpg", uuid::Uuid::new_v4(), angle.slug());
        let path = self.dir.join(filename);
        tokio::fs::write(&path, &image).await?;

        tracing::debug!(%angle, path = %path.display(), bytes = image.len(), "artifact saved");
        Ok(ArtifactRef::new(path.to_string_lossy().into_owned()))
    }
}
