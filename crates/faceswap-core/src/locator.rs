//! The face-locating capability and strategy selection.

use crate::cascade::{CascadeError, HaarCascade};
use crate::config::{DetectorKind, SwapConfig};
use crate::ssd::SsdFaceDetector;
use crate::types::{DetectionResult, PixelGrid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("cascade: {0}")]
    Cascade(#[from] CascadeError),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Finds faces in an image.
///
/// Implementations are constructed once (model weights loaded up front) and
/// reused across requests. Detections are returned in the strategy's native
/// order; callers take the first entry as the face.
pub trait FaceLocator {
    fn locate(&mut self, image: &PixelGrid) -> Result<DetectionResult, LocatorError>;

    /// Short strategy name for logs and diagnostics.
    fn name(&self) -> &'static str;
}

/// Build the locator selected by `config.detector`.
pub fn from_config(config: &SwapConfig) -> Result<Box<dyn FaceLocator + Send>, LocatorError> {
    let locator: Box<dyn FaceLocator + Send> = match config.detector {
        DetectorKind::Cascade => {
            let path = config.cascade_model_path();
            Box::new(HaarCascade::load(&path, config.cascade)?)
        }
        DetectorKind::Ssd => {
            let path = config.ssd_model_path();
            Box::new(SsdFaceDetector::load(&path, config.confidence_threshold)?)
        }
    };
    tracing::info!(strategy = locator.name(), "face locator ready");
    Ok(locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_config_reports_missing_cascade() {
        let config = SwapConfig {
            model_dir: PathBuf::from("/nonexistent"),
            ..SwapConfig::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(
            matches!(err, LocatorError::Cascade(CascadeError::ModelNotFound(_))),
            "{err}"
        );
    }

    #[test]
    fn test_from_config_reports_missing_ssd() {
        let config = SwapConfig {
            detector: DetectorKind::Ssd,
            model_dir: PathBuf::from("/nonexistent"),
            ..SwapConfig::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(matches!(err, LocatorError::ModelNotFound(_)), "{err}");
    }

    #[test]
    fn test_from_config_loads_stock_cascade() {
        let Some(path) = crate::cascade::stock_cascade() else {
            return;
        };
        let path = std::path::Path::new(&path);
        let config = SwapConfig {
            model_dir: path.parent().unwrap().to_path_buf(),
            cascade_model: path.file_name().unwrap().to_string_lossy().into_owned(),
            ..SwapConfig::default()
        };
        let locator = from_config(&config).unwrap();
        assert_eq!(locator.name(), "cascade");
    }
}
