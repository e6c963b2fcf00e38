//! ResNet-10 SSD face detector via ONNX Runtime.
//!
//! Runs the 300×300 single-shot detector and decodes its
//! `[image_id, label, confidence, x1, y1, x2, y2]` rows back to source
//! image coordinates.

use crate::locator::{FaceLocator, LocatorError};
use crate::resize;
use crate::types::{BoundingBox, ChannelOrder, Detection, DetectionResult, PixelGrid};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

// --- Named constants ---
const SSD_INPUT_SIZE: usize = 300;
/// Per-channel mean in B, G, R order.
const SSD_MEAN_BGR: [f32; 3] = [104.0, 117.0, 123.0];
const SSD_ROW_LEN: usize = 7;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// SSD-based face detector.
pub struct SsdFaceDetector {
    session: Session,
    threshold: f32,
}

impl SsdFaceDetector {
    /// Load the SSD ONNX model from the given path.
    pub fn load(model_path: &str, threshold: f32) -> Result<Self, LocatorError> {
        if !Path::new(model_path).exists() {
            return Err(LocatorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            threshold,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded SSD face model"
        );

        Ok(Self { session, threshold })
    }
}

impl FaceLocator for SsdFaceDetector {
    fn locate(&mut self, image: &PixelGrid) -> Result<DetectionResult, LocatorError> {
        if image.is_empty() {
            return Ok(DetectionResult::default());
        }

        let input = preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, rows) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LocatorError::InferenceFailed(format!("detections: {e}")))?;

        if rows.len() % SSD_ROW_LEN != 0 {
            return Err(LocatorError::InferenceFailed(format!(
                "detection output length {} is not a multiple of {SSD_ROW_LEN}",
                rows.len()
            )));
        }

        let detections = decode_detections(rows, image.width, image.height, self.threshold);
        tracing::debug!(count = detections.len(), "SSD detections above threshold");
        Ok(DetectionResult::new(detections))
    }

    fn name(&self) -> &'static str {
        "ssd"
    }
}

/// Resize to the 300×300 input frame (aspect not preserved) and build a
/// mean-subtracted NCHW tensor with channels in B, G, R order.
fn preprocess(image: &PixelGrid) -> Array4<f32> {
    let resized = resize::bilinear(
        &image.data,
        image.width as usize,
        image.height as usize,
        3,
        SSD_INPUT_SIZE,
        SSD_INPUT_SIZE,
    );

    // Source channel index feeding each of B, G, R.
    let source_channel: [usize; 3] = match image.order {
        ChannelOrder::Bgr => [0, 1, 2],
        ChannelOrder::Rgb => [2, 1, 0],
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, SSD_INPUT_SIZE, SSD_INPUT_SIZE));
    for y in 0..SSD_INPUT_SIZE {
        for x in 0..SSD_INPUT_SIZE {
            let px = (y * SSD_INPUT_SIZE + x) * 3;
            for c in 0..3 {
                tensor[[0, c, y, x]] = resized[px + source_channel[c]] as f32 - SSD_MEAN_BGR[c];
            }
        }
    }
    tensor
}

/// Keep rows with confidence above `threshold`, scale normalized corners to
/// pixels (truncating), and clip to the image. Row order is preserved.
fn decode_detections(rows: &[f32], width: u32, height: u32, threshold: f32) -> Vec<Detection> {
    rows.chunks_exact(SSD_ROW_LEN)
        .filter(|row| row[2] > threshold)
        .filter_map(|row| {
            let x1 = (row[3] * width as f32) as i64;
            let y1 = (row[4] * height as f32) as i64;
            let x2 = (row[5] * width as f32) as i64;
            let y2 = (row[6] * height as f32) as i64;
            BoundingBox::clipped(x1, y1, x2, y2, width, height).map(|bbox| Detection {
                bbox,
                confidence: Some(row[2]),
            })
        })
        .collect()
}
