use anyhow::Context;
use serde::Deserialize;
use skinscan_core::SessionConfig;
use skinscan_vision::FramingPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration: defaults, then an optional TOML file, then `SKINSCAN_*` env vars.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root for all local state (default: $XDG_DATA_HOME/skinscan).
    pub data_dir: PathBuf,
    /// Path to the SQLite scan history.
    pub db_path: PathBuf,
    /// Directory for captured images.
    pub artifact_dir: PathBuf,
    /// Upper bound on the analysis step, in seconds.
    pub synthesis_timeout_secs: u64,
    /// Simulated analysis time, in milliseconds.
    pub processing_delay_ms: u64,
    pub framing: FramingPolicy,
}

/// Optional overrides read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    synthesis_timeout_secs: Option<u64>,
    processing_delay_ms: Option<u64>,
    framing: Option<FramingPolicy>,
}

impl Config {
    /// Build the configuration from defaults, the config file and the environment.
    ///
    /// The file is `$SKINSCAN_CONFIG` if set, otherwise `config.toml` in the
    /// data directory when it exists.
    pub fn load() -> anyhow::Result<Self> {
        let data_dir = std::env::var("SKINSCAN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let mut config = Self::with_data_dir(data_dir);

        let file_path = std::env::var("SKINSCAN_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let candidate = config.data_dir.join("config.toml");
                candidate.exists().then_some(candidate)
            });
        if let Some(path) = file_path {
            config.apply_file(read_file_config(&path)?);
            tracing::debug!(path = %path.display(), "config file applied");
        }

        config.apply_env();
        Ok(config)
    }

    pub(crate) fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            db_path: data_dir.join("scans.db"),
            artifact_dir: data_dir.join("face_scans"),
            data_dir,
            synthesis_timeout_secs: 30,
            processing_delay_ms: 2000,
            framing: FramingPolicy::default(),
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(artifact_dir) = file.artifact_dir {
            self.artifact_dir = artifact_dir;
        }
        if let Some(secs) = file.synthesis_timeout_secs {
            self.synthesis_timeout_secs = secs;
        }
        if let Some(ms) = file.processing_delay_ms {
            self.processing_delay_ms = ms;
        }
        if let Some(framing) = file.framing {
            self.framing = framing;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("SKINSCAN_DB_PATH") {
            self.db_path = PathBuf::from(db_path);
        }
        if let Ok(artifact_dir) = std::env::var("SKINSCAN_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(artifact_dir);
        }
        self.synthesis_timeout_secs =
            env_u64("SKINSCAN_SYNTHESIS_TIMEOUT_SECS", self.synthesis_timeout_secs);
        self.processing_delay_ms = env_u64("SKINSCAN_PROCESSING_DELAY_MS", self.processing_delay_ms);
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            synthesis_timeout: Duration::from_secs(self.synthesis_timeout_secs),
            ..SessionConfig::default()
        }
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("skinscan")
}

fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_live_under_data_dir() {
        let config = Config::with_data_dir(PathBuf::from("/data/skinscan"));
        assert_eq!(config.db_path, PathBuf::from("/data/skinscan/scans.db"));
        assert_eq!(config.artifact_dir, PathBuf::from("/data/skinscan/face_scans"));
        assert_eq!(config.processing_delay(), Duration::from_secs(2));
        assert_eq!(config.session_config().synthesis_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_file_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                db_path = "/srv/scans.db"
                processing_delay_ms = 0

                [framing]
                center_tolerance = 0.25
            "#,
        )
        .unwrap();

        let mut config = Config::with_data_dir(tmp.path().to_path_buf());
        config.apply_file(read_file_config(&path).unwrap());

        assert_eq!(config.db_path, PathBuf::from("/srv/scans.db"));
        assert_eq!(config.artifact_dir, tmp.path().join("face_scans"));
        assert_eq!(config.processing_delay_ms, 0);
        assert_eq!(config.synthesis_timeout_secs, 30);
        assert!((config.framing.center_tolerance - 0.25).abs() < 1e-6);
        assert!((config.framing.min_face_ratio - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "camera = \"/dev/video0\"\n").unwrap();
        assert!(read_file_config(&path).is_err());
    }
}
