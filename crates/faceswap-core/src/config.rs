use crate::cascade::CascadeParams;
use crate::decoder::DEFAULT_FETCH_TIMEOUT;
use crate::encoder::DEFAULT_JPEG_QUALITY;
use crate::region::DEFAULT_PADDING_RATIO;
use crate::ssd::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Face detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Boosted Haar cascade scan over grayscale.
    #[default]
    Cascade,
    /// Learned single-shot detector via ONNX Runtime.
    Ssd,
}

impl std::str::FromStr for DetectorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DetectorKind::Cascade),
            "ssd" => Ok(DetectorKind::Ssd),
            other => Err(ConfigError::Invalid(format!(
                "unknown detector {other:?} (expected \"cascade\" or \"ssd\")"
            ))),
        }
    }
}

/// Pipeline configuration: defaults, then an optional TOML file, then
/// `FACESWAP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub detector: DetectorKind,
    /// Directory containing the model files.
    pub model_dir: PathBuf,
    /// Cascade file name inside `model_dir`.
    pub cascade_model: String,
    /// SSD ONNX file name inside `model_dir`.
    pub ssd_model: String,
    /// Face padding as a fraction of the target face width.
    pub padding_ratio: f32,
    pub jpeg_quality: u8,
    /// Upper bound on a remote image fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// SSD only: detections must score strictly above this.
    pub confidence_threshold: f32,
    pub cascade: CascadeParams,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            model_dir: PathBuf::from("models"),
            cascade_model: "haarcascade_frontalface_default.xml".to_string(),
            ssd_model: "res10_300x300_ssd_iter_140000.onnx".to_string(),
            padding_ratio: DEFAULT_PADDING_RATIO,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cascade: CascadeParams::default(),
        }
    }
}

impl SwapConfig {
    /// Defaults with `FACESWAP_*` overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML file, then apply `FACESWAP_*` overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_toml_str(&source)?.with_env_overrides())
    }

    /// Apply `FACESWAP_*` environment variables over the current values.
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(kind) = env_parse::<DetectorKind>("FACESWAP_DETECTOR") {
            self.detector = kind;
        }
        if let Ok(dir) = std::env::var("FACESWAP_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        self.padding_ratio = env_parse("FACESWAP_PADDING_RATIO").unwrap_or(self.padding_ratio);
        self.jpeg_quality = env_parse("FACESWAP_JPEG_QUALITY").unwrap_or(self.jpeg_quality);
        self.fetch_timeout_secs =
            env_parse("FACESWAP_FETCH_TIMEOUT_SECS").unwrap_or(self.fetch_timeout_secs);
        self.confidence_threshold =
            env_parse("FACESWAP_CONFIDENCE_THRESHOLD").unwrap_or(self.confidence_threshold);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.padding_ratio) {
            return Err(ConfigError::Invalid(format!(
                "padding_ratio must be in [0, 1], got {}",
                self.padding_ratio
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        self.cascade
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("cascade: {e}")))?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Path to the Haar cascade.
    pub fn cascade_model_path(&self) -> String {
        self.model_dir
            .join(&self.cascade_model)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the SSD detection model.
    pub fn ssd_model_path(&self) -> String {
        self.model_dir
            .join(&self.ssd_model)
            .to_string_lossy()
            .into_owned()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
