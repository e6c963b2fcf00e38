//! The swap pipeline: decode, locate, pad, composite, encode.

use crate::compositor::{self, CompositeResult};
use crate::config::{ConfigError, SwapConfig};
use crate::decoder::{ImageDecoder, ImageSource};
use crate::encoder::{self, EncodedImage};
use crate::error::SwapError;
use crate::locator::{self, FaceLocator, LocatorError};
use crate::region;
use crate::request::SwapRequest;
use crate::types::{DetectionResult, ImageRole, PixelGrid};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("face locator: {0}")]
    Locator(#[from] LocatorError),
}

/// Owns a loaded face locator and runs swaps against it.
///
/// The locator is built once; each call owns its own images, so one
/// `FaceSwapper` per worker is enough for request-level parallelism.
pub struct FaceSwapper {
    locator: Box<dyn FaceLocator + Send>,
    decoder: ImageDecoder,
    padding_ratio: f32,
    jpeg_quality: u8,
}

impl FaceSwapper {
    /// Validate `config` and load the configured locator.
    pub fn new(config: &SwapConfig) -> Result<Self, InitError> {
        config.validate()?;
        let locator = locator::from_config(config)?;
        Ok(Self::with_locator(locator, config))
    }

    /// Use an already-built locator; the rest comes from `config`.
    pub fn with_locator(locator: Box<dyn FaceLocator + Send>, config: &SwapConfig) -> Self {
        Self {
            locator,
            decoder: ImageDecoder::new(config.fetch_timeout()),
            padding_ratio: config.padding_ratio,
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub fn locator_name(&self) -> &'static str {
        self.locator.name()
    }

    /// Run a request body end to end. Missing inputs are rejected before
    /// anything is decoded.
    pub fn swap_request(&mut self, request: &SwapRequest) -> Result<EncodedImage, SwapError> {
        let (target, swap) = request.references()?;
        let target = ImageSource::parse(target).map_err(|e| SwapError::from_source(ImageRole::Target, e))?;
        let swap = ImageSource::parse(swap).map_err(|e| SwapError::from_source(ImageRole::Swap, e))?;
        self.swap_sources(&target, &swap)
    }

    /// Decode both sources, swap, and encode the result as JPEG.
    pub fn swap_sources(&mut self, target: &ImageSource, swap: &ImageSource) -> Result<EncodedImage, SwapError> {
        let started = Instant::now();
        let target = self.load(ImageRole::Target, target)?;
        let swap = self.load(ImageRole::Swap, swap)?;

        let result = self.swap_images(target, &swap)?;
        let encoded = encoder::encode_jpeg(result.image, self.jpeg_quality)?;

        tracing::info!(
            mode = ?result.mode,
            region = ?result.region,
            bytes = encoded.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "face swap complete"
        );
        Ok(encoded)
    }

    /// Decode one source, attributing failures to `role`.
    pub fn load(&self, role: ImageRole, source: &ImageSource) -> Result<PixelGrid, SwapError> {
        self.decoder
            .decode(source)
            .map_err(|e| SwapError::from_source(role, e))
    }

    /// Composite the first swap face onto the first target face.
    ///
    /// The target is located before the swap so a faceless target never
    /// costs a second detection.
    pub fn swap_images(&mut self, target: PixelGrid, swap: &PixelGrid) -> Result<CompositeResult, SwapError> {
        let target_faces = self.detect(&target)?;
        let target_box = target_faces
            .primary()
            .map(|d| d.bbox)
            .ok_or(SwapError::NoFaceDetected(ImageRole::Target))?;

        let swap_faces = self.detect(swap)?;
        let swap_box = swap_faces
            .primary()
            .map(|d| d.bbox)
            .ok_or(SwapError::NoFaceDetected(ImageRole::Swap))?;

        tracing::debug!(
            target_faces = target_faces.len(),
            swap_faces = swap_faces.len(),
            ?target_box,
            ?swap_box,
            "faces located"
        );

        let (target_region, swap_region) = region::pad_pair(
            &target_box,
            (target.width, target.height),
            &swap_box,
            (swap.width, swap.height),
            self.padding_ratio,
        );

        Ok(compositor::composite(target, &target_region, swap, &swap_region)?)
    }

    /// Run the configured locator on one image.
    pub fn detect(&mut self, image: &PixelGrid) -> Result<DetectionResult, SwapError> {
        let started = Instant::now();
        let faces = self.locator.locate(image)?;
        tracing::debug!(
            strategy = self.locator.name(),
            faces = faces.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "locate"
        );
        Ok(faces)
    }
}
