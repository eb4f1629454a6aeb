//! skinscan-core — Multi-angle face capture and skin analysis model.
//!
//! The capture session sequences Front / Left / Right shots, gates them on a
//! live detection signal, and hands the finished set to a result synthesizer.
//! Storage and analysis are collaborators behind traits.

pub mod analysis;
pub mod session;
pub mod store;
pub mod synthesizer;
pub mod types;

pub use analysis::MockSynthesizer;
pub use session::{
    CaptureOutcome, CaptureSession, SessionConfig, SessionError, SessionSnapshot, SessionStatus,
};
pub use store::{ArtifactStore, StoreError};
pub use synthesizer::{ResultSynthesizer, SynthesisError};
pub use types::{
    AnalysisRecord, ArtifactRef, CaptureAngle, ConcernType, Recommendation, RecommendationType,
    ScoreBand, Severity, SkinConcern, SkinType,
};
