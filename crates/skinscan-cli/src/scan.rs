//! Drives a capture session from image files on disk.

use anyhow::{bail, Context, Result};
use skinscan_core::{
    AnalysisRecord, CaptureAngle, CaptureOutcome, CaptureSession, MockSynthesizer, SessionStatus,
};
use skinscan_storage::{FsArtifactStore, ScanRepository};
use skinscan_vision::{Frame, FramingPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;

/// Store attempts per angle before giving up.
const MAX_CAPTURE_ATTEMPTS: usize = 3;

/// Run a full scan, persist the result, and return it.
pub async fn run_scan(
    config: &Config,
    repo: &ScanRepository,
    images: &[(CaptureAngle, PathBuf)],
) -> Result<AnalysisRecord> {
    let store = Arc::new(FsArtifactStore::new(&config.artifact_dir));
    let synthesizer = Arc::new(MockSynthesizer::new(config.processing_delay()));
    let session = CaptureSession::new(config.session_config(), store.clone(), synthesizer)?;

    let record = match drive_session(&session, &config.framing, images).await {
        Ok(record) => record,
        Err(err) => {
            discard_captures(&store, &session).await;
            return Err(err);
        }
    };
    repo.insert(&record).await.context("saving scan")?;
    Ok(record)
}

/// Remove the images of a scan that will never be saved.
async fn discard_captures(store: &FsArtifactStore, session: &CaptureSession) {
    for artifact in session.snapshot().captured.values() {
        if let Err(err) = store.remove(artifact).await {
            tracing::warn!(%artifact, error = %err, "could not remove abandoned capture");
        }
    }
}

/// Feed each angle's image through the framing gate and the session, then
/// wait for the analysis.
pub async fn drive_session(
    session: &CaptureSession,
    framing: &FramingPolicy,
    images: &[(CaptureAngle, PathBuf)],
) -> Result<AnalysisRecord> {
    let mut updates = session.subscribe();
    let mut attempts = 0;
    let mut last_angle = None;

    loop {
        let snapshot = session.snapshot();
        let Some(angle) = snapshot.current_angle else {
            break;
        };
        if last_angle != Some(angle) {
            attempts = 0;
            last_angle = Some(angle);
        }
        attempts += 1;

        let path = images
            .iter()
            .find(|(a, _)| *a == angle)
            .map(|(_, p)| p.as_path())
            .with_context(|| format!("no image supplied for {angle}"))?;
        let (done, total) = snapshot.progress();
        println!("[{}/{}] {angle}: {}", done + 1, total, angle.instruction());

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let frame = decode_frame(&bytes, path)?;
        let verdict = framing.assess_exposure(&frame);
        tracing::debug!(%angle, brightness = frame.avg_brightness(), ?verdict, "framing checked");
        session.on_detection_signal(verdict.is_well_framed());
        if !verdict.is_well_framed() {
            bail!("{angle} image {} rejected: {verdict}", path.display());
        }

        match session.request_capture(bytes).await {
            CaptureOutcome::Captured { .. } => {}
            CaptureOutcome::Failed(err) if attempts < MAX_CAPTURE_ATTEMPTS => {
                tracing::warn!(%angle, attempts, error = %err, "retrying capture");
            }
            CaptureOutcome::Failed(err) => return Err(err.into()),
            CaptureOutcome::Ignored | CaptureOutcome::Superseded => {
                bail!("{angle} capture was not accepted")
            }
        }
    }

    println!("Analysing your skin...");
    let finished = updates
        .wait_for(|s| s.status.is_terminal())
        .await
        .context("capture session closed")?
        .clone();

    match finished.status {
        SessionStatus::Complete => finished.result.context("complete session without a result"),
        SessionStatus::Failed(reason) => bail!("analysis failed: {reason}"),
        SessionStatus::InProgress | SessionStatus::Finalizing => {
            bail!("capture session stopped before finishing")
        }
    }
}

fn decode_frame(bytes: &[u8], path: &Path) -> Result<Frame> {
    let gray = image::load_from_memory(bytes)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_luma8();
    let (width, height) = gray.dimensions();
    Ok(Frame::from_gray(gray.into_raw(), width, height)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinscan_core::SessionConfig;
    use std::io::Cursor;
    use std::time::Duration;

    fn write_png(dir: &Path, name: &str, value: u8) -> PathBuf {
        let img = image::GrayImage::from_pixel(16, 16, image::Luma([value]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn session(artifacts: &Path) -> CaptureSession {
        CaptureSession::new(
            SessionConfig::default(),
            Arc::new(FsArtifactStore::new(artifacts)),
            Arc::new(MockSynthesizer::seeded(5, Duration::ZERO)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_drive_session_captures_all_angles() {
        let tmp = tempfile::tempdir().unwrap();
        let images = vec![
            (CaptureAngle::Front, write_png(tmp.path(), "f.png", 140)),
            (CaptureAngle::Left, write_png(tmp.path(), "l.png", 150)),
            (CaptureAngle::Right, write_png(tmp.path(), "r.png", 160)),
        ];
        let artifacts = tmp.path().join("face_scans");

        let record = drive_session(&session(&artifacts), &FramingPolicy::default(), &images)
            .await
            .unwrap();

        assert_eq!(record.image_paths.len(), 3);
        assert!(record.image_paths[0].as_str().ends_with("_front.jpg"));
        assert!(record.image_paths[2].as_str().ends_with("_right.jpg"));
        for artifact in &record.image_paths {
            assert!(Path::new(artifact.as_str()).starts_with(&artifacts));
        }
    }

    #[tokio::test]
    async fn test_dark_image_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let images = vec![
            (CaptureAngle::Front, write_png(tmp.path(), "f.png", 3)),
            (CaptureAngle::Left, write_png(tmp.path(), "l.png", 150)),
            (CaptureAngle::Right, write_png(tmp.path(), "r.png", 160)),
        ];
        let session = session(&tmp.path().join("face_scans"));

        let err = drive_session(&session, &FramingPolicy::default(), &images)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Find better lighting"), "{err}");
        assert!(session.snapshot().captured.is_empty());
        assert!(!session.snapshot().subject_detected);
    }

    #[tokio::test]
    async fn test_missing_angle_image() {
        let tmp = tempfile::tempdir().unwrap();
        let images = vec![(CaptureAngle::Front, write_png(tmp.path(), "f.png", 140))];
        let session = session(&tmp.path().join("face_scans"));

        let err = drive_session(&session, &FramingPolicy::default(), &images)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Left Profile"), "{err}");
        assert_eq!(session.snapshot().captured.len(), 1);
    }

    #[tokio::test]
    async fn test_run_scan_persists_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::with_data_dir(tmp.path().to_path_buf());
        config.processing_delay_ms = 0;
        let images = vec![
            (CaptureAngle::Front, write_png(tmp.path(), "f.png", 140)),
            (CaptureAngle::Left, write_png(tmp.path(), "l.png", 150)),
            (CaptureAngle::Right, write_png(tmp.path(), "r.png", 160)),
        ];
        let repo = ScanRepository::open_in_memory().await.unwrap();

        let record = run_scan(&config, &repo, &images).await.unwrap();
        let stored = repo.get(&record.id).await.unwrap().expect("record persisted");
        assert_eq!(stored.image_paths, record.image_paths);
    }

    #[tokio::test]
    async fn test_failed_scan_removes_its_captures() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(tmp.path().to_path_buf());
        let images = vec![
            (CaptureAngle::Front, write_png(tmp.path(), "f.png", 140)),
            (CaptureAngle::Left, write_png(tmp.path(), "l.png", 150)),
            (CaptureAngle::Right, write_png(tmp.path(), "r.png", 2)),
        ];
        let repo = ScanRepository::open_in_memory().await.unwrap();

        let err = run_scan(&config, &repo, &images).await.unwrap_err();
        assert!(err.to_string().contains("Right Profile"), "{err}");

        let mut left_behind = std::fs::read_dir(&config.artifact_dir).unwrap();
        assert!(left_behind.next().is_none(), "captures left on disk");
        assert!(repo.list().await.unwrap().is_empty());
    }
}
