//! Result synthesizer contract: turns a full set of captures into an analysis.

use crate::types::{AnalysisRecord, ArtifactRef};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("no captured images to analyse")]
    NoArtifacts,
    #[error("{0}")]
    Failed(String),
}

/// Strategy for producing an [`AnalysisRecord`] from captured artifacts.
///
/// Artifacts arrive in required-angle order. Implementations may be slow;
/// the capture session bounds them with a timeout.
#[async_trait]
pub trait ResultSynthesizer: Send + Sync {
    async fn synthesize(&self, artifacts: &[ArtifactRef]) -> Result<AnalysisRecord, SynthesisError>;
}
