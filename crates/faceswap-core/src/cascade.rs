//! Boosted Haar cascade face detector (classifier scan).
//!
//! Wraps OpenCV's `CascadeClassifier` loaded from a stock cascade XML
//! (e.g. `haarcascade_frontalface_default.xml`) and runs its multi-scale
//! scan over the grayscale image.

use crate::locator::{FaceLocator, LocatorError};
use crate::mat;
use crate::types::{BoundingBox, Detection, DetectionResult, PixelGrid};
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("cascade file not found: {0}")]
    ModelNotFound(String),
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
    #[error("invalid cascade: {0}")]
    Invalid(String),
}

/// Multi-scale scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeParams {
    /// Pyramid step between scan scales; must exceed 1.
    pub scale_factor: f64,
    /// Candidate clusters need more than this many raw hits.
    pub min_neighbors: u32,
    /// Smallest face side, in source pixels.
    pub min_size: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.05,
            min_neighbors: 3,
            min_size: 30,
        }
    }
}

impl CascadeParams {
    pub fn validate(&self) -> Result<(), CascadeError> {
        if !(self.scale_factor > 1.0) {
            return Err(CascadeError::Invalid(format!(
                "scale factor must exceed 1, got {}",
                self.scale_factor
            )));
        }
        if self.min_size == 0 {
            return Err(CascadeError::Invalid("minimum face size must be positive".into()));
        }
        Ok(())
    }
}

/// Haar cascade classifier with its scan parameters.
pub struct HaarCascade {
    classifier: CascadeClassifier,
    params: CascadeParams,
}

impl HaarCascade {
    /// Load a cascade XML from disk.
    pub fn load(model_path: &str, params: CascadeParams) -> Result<Self, CascadeError> {
        params.validate()?;
        if !Path::new(model_path).exists() {
            return Err(CascadeError::ModelNotFound(model_path.to_string()));
        }

        let classifier = CascadeClassifier::new(model_path)?;
        if classifier.empty()? {
            return Err(CascadeError::Invalid(format!("{model_path} holds no cascade")));
        }

        tracing::info!(
            path = model_path,
            scale_factor = params.scale_factor,
            min_neighbors = params.min_neighbors,
            min_size = params.min_size,
            "loaded Haar cascade"
        );

        Ok(Self { classifier, params })
    }

    /// Detect faces in a row-major grayscale buffer, in classifier order.
    pub fn detect_gray(&mut self, gray: &[u8], width: u32, height: u32) -> Result<Vec<BoundingBox>, CascadeError> {
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        let image = mat::from_gray(gray, height)?;
        let min_size = self.params.min_size as i32;

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &image,
            &mut faces,
            self.params.scale_factor,
            self.params.min_neighbors as i32,
            0,
            Size::new(min_size, min_size),
            Size::new(0, 0),
        )?;

        let boxes = clip_rects(faces.iter(), width, height);
        tracing::debug!(raw = faces.len(), kept = boxes.len(), "cascade scan complete");
        Ok(boxes)
    }
}

impl FaceLocator for HaarCascade {
    fn locate(&mut self, image: &PixelGrid) -> Result<DetectionResult, LocatorError> {
        let gray = image.to_gray();
        let detections = self
            .detect_gray(&gray, image.width, image.height)?
            .into_iter()
            .map(|bbox| Detection { bbox, confidence: None })
            .collect();
        Ok(DetectionResult::new(detections))
    }

    fn name(&self) -> &'static str {
        "cascade"
    }
}

/// Convert classifier rectangles to boxes inside the image, keeping order and
/// dropping any that clip to nothing.
fn clip_rects(rects: impl IntoIterator<Item = Rect>, width: u32, height: u32) -> Vec<BoundingBox> {
    rects
        .into_iter()
        .filter_map(|r| {
            let (x, y) = (r.x as i64, r.y as i64);
            BoundingBox::clipped(x, y, x + r.width as i64, y + r.height as i64, width, height)
        })
        .collect()
}

/// The frontal-face cascade shipped with a system OpenCV install, if any.
#[cfg(test)]
pub(crate) fn stock_cascade() -> Option<String> {
    [
        "/usr/share/opencv4/haarcascades",
        "/usr/local/share/opencv4/haarcascades",
        "/usr/share/opencv/haarcascades",
        "/opt/homebrew/share/opencv4/haarcascades",
    ]
    .iter()
    .map(|dir| format!("{dir}/haarcascade_frontalface_default.xml"))
    .find(|path| Path::new(path).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelOrder;

    #[test]
    fn test_default_params() {
        let p = CascadeParams::default();
        assert_eq!(p.scale_factor, 1.05);
        assert_eq!(p.min_neighbors, 3);
        assert_eq!(p.min_size, 30);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_clip_rects_keeps_order_and_clips() {
        let rects = vec![
            Rect::new(50, 40, 30, 30),
            Rect::new(-10, 90, 40, 40),
            Rect::new(200, 0, 20, 20),
        ];
        let boxes = clip_rects(rects, 120, 100);
        assert_eq!(
            boxes,
            vec![BoundingBox::new(50, 40, 30, 30), BoundingBox::new(0, 90, 30, 10)]
        );
    }

    #[test]
    fn test_rejects_scale_factor_of_one() {
        let params = CascadeParams { scale_factor: 1.0, ..CascadeParams::default() };
        assert!(matches!(
            HaarCascade::load("/nonexistent/cascade.xml", params),
            Err(CascadeError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HaarCascade::load("/nonexistent/cascade.xml", CascadeParams::default()),
            Err(CascadeError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_file_without_cascade() {
        let path = std::env::temp_dir().join(format!("faceswap-empty-cascade-{}.xml", std::process::id()));
        std::fs::write(&path, "<?xml version=\"1.0\"?>\n<opencv_storage>\n</opencv_storage>\n").unwrap();
        let result = HaarCascade::load(&path.to_string_lossy(), CascadeParams::default());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_stock_cascade_finds_nothing_in_flat_image() {
        let Some(path) = stock_cascade() else {
            return;
        };
        let mut cascade = HaarCascade::load(&path, CascadeParams::default()).unwrap();
        let grid = PixelGrid::new(160, 120, ChannelOrder::Bgr);
        let result = cascade.locate(&grid).unwrap();
        assert!(result.is_empty());
        assert_eq!(cascade.name(), "cascade");
    }

    #[test]
    fn test_empty_image_has_no_faces() {
        let Some(path) = stock_cascade() else {
            return;
        };
        let mut cascade = HaarCascade::load(&path, CascadeParams::default()).unwrap();
        assert!(cascade.detect_gray(&[], 0, 0).unwrap().is_empty());
    }
}
