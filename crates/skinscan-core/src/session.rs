//! Multi-angle capture session.
//!
//! The session walks the user through a fixed, ordered set of head poses.
//! Capture is gated on the live detection signal, each capture is handed to
//! an [`ArtifactStore`], and once every angle has an artifact the session
//! asks a [`ResultSynthesizer`] for the finished analysis.
//!
//! State lives in a `watch` channel: every mutation is an atomic
//! read-modify-write on the current [`SessionSnapshot`], and consumers
//! observe progress by subscribing rather than by polling. Each in-flight
//! store or synthesizer call carries the epoch it started in; a completion
//! that arrives after [`CaptureSession::reset`] no longer matches and is
//! dropped.

use crate::store::ArtifactStore;
use crate::synthesizer::ResultSynthesizer;
use crate::types::{AnalysisRecord, ArtifactRef, CaptureAngle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Upper bound on a single synthesizer call.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

const TIMEOUT_REASON: &str = "timeout";

/// Errors surfaced through [`SessionSnapshot::error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Saving a capture failed. The angle stays pending and may be retried.
    #[error("could not save {angle} capture: {reason}")]
    Store { angle: CaptureAngle, reason: String },
    /// Analysis failed or timed out. The session must be reset.
    #[error("analysis failed: {0}")]
    Synthesis(String),
}

impl SessionError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Store { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AngleSetError {
    #[error("at least one capture angle is required")]
    Empty,
    #[error("capture angle listed twice: {0}")]
    Duplicate(CaptureAngle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Finalizing,
    Complete,
    Failed(String),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Complete | SessionStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Poses to capture, in the order they should be offered.
    pub required_angles: Vec<CaptureAngle>,
    pub synthesis_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_angles: CaptureAngle::ALL.to_vec(),
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        }
    }
}

/// Immutable view of the session at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Generation counter; bumped by every reset.
    pub epoch: u64,
    pub required_angles: Arc<[CaptureAngle]>,
    /// Next pose to capture. `None` once every angle is captured.
    pub current_angle: Option<CaptureAngle>,
    pub captured: BTreeMap<CaptureAngle, ArtifactRef>,
    pub subject_detected: bool,
    pub capture_in_flight: bool,
    pub status: SessionStatus,
    pub error: Option<SessionError>,
    /// Present only when `status` is `Complete`.
    pub result: Option<AnalysisRecord>,
}

impl SessionSnapshot {
    fn initial(required_angles: Arc<[CaptureAngle]>, epoch: u64) -> Self {
        let current_angle = required_angles.first().copied();
        Self {
            epoch,
            required_angles,
            current_angle,
            captured: BTreeMap::new(),
            subject_detected: false,
            capture_in_flight: false,
            status: SessionStatus::InProgress,
            error: None,
            result: None,
        }
    }

    /// Whether the capture button should be enabled.
    pub fn can_capture(&self) -> bool {
        self.status == SessionStatus::InProgress && self.subject_detected && !self.capture_in_flight
    }

    /// Captured artifacts in required-angle order.
    pub fn ordered_artifacts(&self) -> Vec<ArtifactRef> {
        self.required_angles
            .iter()
            .filter_map(|angle| self.captured.get(angle).cloned())
            .collect()
    }

    /// Angles still waiting for a capture, in required order.
    pub fn remaining(&self) -> Vec<CaptureAngle> {
        self.required_angles
            .iter()
            .copied()
            .filter(|angle| !self.captured.contains_key(angle))
            .collect()
    }

    /// `(captured, required)` counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.captured.len(), self.required_angles.len())
    }
}

/// What a single [`CaptureSession::request_capture`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The image was saved for `angle`. `finalizing` is set when it was the
    /// last missing angle and analysis has started.
    Captured {
        angle: CaptureAngle,
        artifact: ArtifactRef,
        finalizing: bool,
    },
    /// Not eligible: another capture is in flight or the session is past
    /// the capture phase.
    Ignored,
    /// The store failed; the same angle can be retried.
    Failed(SessionError),
    /// The session was reset while the save was pending; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    epoch: u64,
    angle: CaptureAngle,
}

struct Inner {
    required: Arc<[CaptureAngle]>,
    synthesis_timeout: Duration,
    store: Arc<dyn ArtifactStore>,
    synthesizer: Arc<dyn ResultSynthesizer>,
    state: watch::Sender<SessionSnapshot>,
}

/// Clone-safe handle to one capture flow.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Inner>,
}

impl CaptureSession {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn ArtifactStore>,
        synthesizer: Arc<dyn ResultSynthesizer>,
    ) -> Result<Self, AngleSetError> {
        validate_angles(&config.required_angles)?;
        let required: Arc<[CaptureAngle]> = config.required_angles.into();
        let (state, _) = watch::channel(SessionSnapshot::initial(Arc::clone(&required), 0));

        tracing::debug!(angles = ?required, "capture session created");

        Ok(Self {
            inner: Arc::new(Inner {
                required,
                synthesis_timeout: config.synthesis_timeout,
                store,
                synthesizer,
                state,
            }),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Snapshot stream for consumers that prefer `Stream` over `watch`.
    pub fn updates(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Record the latest framing signal. Never blocks and never changes status.
    pub fn on_detection_signal(&self, detected: bool) {
        self.inner.state.send_if_modified(|s| {
            if s.subject_detected == detected {
                return false;
            }
            s.subject_detected = detected;
            true
        });
    }

    /// Save `image` for the current angle and advance.
    ///
    /// A request made while another capture is in flight, or once the session
    /// has left `InProgress`, is dropped and reported as
    /// [`CaptureOutcome::Ignored`]. Store failures are returned and also
    /// surfaced in the snapshot; they never leave the angle marked done.
    pub async fn request_capture(&self, image: Vec<u8>) -> CaptureOutcome {
        let Some(ticket) = self.claim() else {
            tracing::debug!("capture request ignored");
            return CaptureOutcome::Ignored;
        };
        tracing::info!(angle = %ticket.angle, epoch = ticket.epoch, "capture started");

        // Detached so that dropping this future cannot strand the in-flight flag.
        let task = tokio::spawn(self.clone().run_capture(ticket, image));
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "capture task aborted");
                CaptureOutcome::Failed(SessionError::Store {
                    angle: ticket.angle,
                    reason: "capture task aborted".into(),
                })
            }
        }
    }

    /// Abandon everything and return to the initial state under a new epoch.
    pub fn reset(&self) {
        let required = Arc::clone(&self.inner.required);
        self.inner.state.send_modify(|s| {
            let epoch = s.epoch.wrapping_add(1);
            *s = SessionSnapshot::initial(required, epoch);
        });
        tracing::info!("capture session reset");
    }

    /// Dismiss a surfaced error without changing anything else.
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Atomically check eligibility and mark a capture in flight.
    fn claim(&self) -> Option<Ticket> {
        let mut ticket = None;
        self.inner.state.send_if_modified(|s| {
            if s.status != SessionStatus::InProgress || s.capture_in_flight {
                return false;
            }
            let Some(angle) = s.current_angle else {
                return false;
            };
            s.capture_in_flight = true;
            s.error = None;
            ticket = Some(Ticket {
                epoch: s.epoch,
                angle,
            });
            true
        });
        ticket
    }

    async fn run_capture(self, ticket: Ticket, image: Vec<u8>) -> CaptureOutcome {
        let angle = ticket.angle;
        let store = Arc::clone(&self.inner.store);
        let saved = match tokio::spawn(async move { store.save(angle, image).await }).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(err) => Err(format!("store task failed: {err}")),
        };

        let mut outcome = CaptureOutcome::Superseded;
        let mut finalize_with = None;
        self.inner.state.send_if_modified(|s| {
            if s.epoch != ticket.epoch {
                return false;
            }
            s.capture_in_flight = false;
            match saved {
                Ok(artifact) => {
                    s.captured.insert(angle, artifact.clone());
                    s.current_angle = next_angle(&s.required_angles, &s.captured);
                    let finalizing = s.current_angle.is_none();
                    if finalizing {
                        s.status = SessionStatus::Finalizing;
                        finalize_with = Some(s.ordered_artifacts());
                    }
                    outcome = CaptureOutcome::Captured {
                        angle,
                        artifact,
                        finalizing,
                    };
                }
                Err(reason) => {
                    let error = SessionError::Store { angle, reason };
                    s.error = Some(error.clone());
                    outcome = CaptureOutcome::Failed(error);
                }
            }
            true
        });

        match &outcome {
            CaptureOutcome::Captured { artifact, .. } => {
                tracing::info!(%angle, %artifact, "capture saved");
            }
            CaptureOutcome::Failed(err) => {
                tracing::warn!(%angle, error = %err, "capture failed; angle can be retried");
            }
            CaptureOutcome::Superseded => {
                tracing::debug!(%angle, epoch = ticket.epoch, "discarding capture from a previous epoch");
            }
            CaptureOutcome::Ignored => {}
        }

        if let Some(artifacts) = finalize_with {
            tokio::spawn(self.finalize(ticket.epoch, artifacts));
        }
        outcome
    }

    async fn finalize(self, epoch: u64, artifacts: Vec<ArtifactRef>) {
        tracing::info!(epoch, artifacts = artifacts.len(), "all angles captured; analysing");

        let synthesizer = Arc::clone(&self.inner.synthesizer);
        let mut task = tokio::spawn(async move { synthesizer.synthesize(&artifacts).await });
        let verdict = match tokio::time::timeout(self.inner.synthesis_timeout, &mut task).await {
            Ok(Ok(Ok(record))) => Ok(record),
            Ok(Ok(Err(err))) => Err(err.to_string()),
            Ok(Err(err)) => Err(format!("analysis task failed: {err}")),
            Err(_) => {
                task.abort();
                Err(TIMEOUT_REASON.to_string())
            }
        };

        let mut failure = None;
        let applied = self.inner.state.send_if_modified(|s| {
            if s.epoch != epoch || s.status != SessionStatus::Finalizing {
                return false;
            }
            match verdict {
                Ok(record) => {
                    s.result = Some(record);
                    s.status = SessionStatus::Complete;
                }
                Err(reason) => {
                    s.error = Some(SessionError::Synthesis(reason.clone()));
                    s.status = SessionStatus::Failed(reason.clone());
                    failure = Some(reason);
                }
            }
            true
        });

        match (applied, failure) {
            (false, _) => tracing::debug!(epoch, "discarding analysis from a previous epoch"),
            (true, Some(reason)) => tracing::warn!(epoch, %reason, "analysis failed"),
            (true, None) => tracing::info!(epoch, "capture session complete"),
        }
    }
}

/// Earliest required angle that has no artifact yet.
fn next_angle(
    required: &[CaptureAngle],
    captured: &BTreeMap<CaptureAngle, ArtifactRef>,
) -> Option<CaptureAngle> {
    required.iter().copied().find(|angle| !captured.contains_key(angle))
}

fn validate_angles(angles: &[CaptureAngle]) -> Result<(), AngleSetError> {
    if angles.is_empty() {
        return Err(AngleSetError::Empty);
    }
    for (i, angle) in angles.iter().enumerate() {
        if angles[..i].contains(angle) {
            return Err(AngleSetError::Duplicate(*angle));
        }
    }
    Ok(())
}
