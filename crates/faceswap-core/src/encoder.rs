//! JPEG encoding and data-URI wrapping of the composite.

use crate::types::{ChannelOrder, PixelGrid};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;
use thiserror::Error;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("JPEG quality must be in 1..=100, got {0}")]
    InvalidQuality(u8),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// An encoded image and its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl EncodedImage {
    /// `data:<media type>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode a grid as baseline JPEG, converting to RGB first.
pub fn encode_jpeg(grid: PixelGrid, quality: u8) -> Result<EncodedImage, EncodeError> {
    if !(1..=100).contains(&quality) {
        return Err(EncodeError::InvalidQuality(quality));
    }
    let grid = grid.into_order(ChannelOrder::Rgb);

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
        &grid.data,
        grid.width,
        grid.height,
        image::ExtendedColorType::Rgb8,
    )?;

    tracing::debug!(
        width = grid.width,
        height = grid.height,
        quality,
        bytes = bytes.len(),
        "encoded JPEG"
    );

    Ok(EncodedImage {
        bytes,
        media_type: JPEG_MEDIA_TYPE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg_magic() {
        let grid = PixelGrid::new(16, 8, ChannelOrder::Bgr);
        let encoded = encode_jpeg(grid, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&encoded.bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(encoded.media_type, "image/jpeg");
    }

    #[test]
    fn test_encoded_colors_come_back_in_rgb() {
        let mut grid = PixelGrid::new(8, 8, ChannelOrder::Bgr);
        for px in grid.data.chunks_exact_mut(3) {
            // BGR for pure-ish red
            px.copy_from_slice(&[20, 20, 220]);
        }
        let encoded = encode_jpeg(grid, 95).unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgb8();
        let [r, g, b] = decoded.get_pixel(4, 4).0;
        assert!(r > 180 && g < 60 && b < 60, "got ({r}, {g}, {b})");
    }

    #[test]
    fn test_data_uri_prefix() {
        let grid = PixelGrid::new(2, 2, ChannelOrder::Rgb);
        let uri = encode_jpeg(grid, 95).unwrap().to_data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,/9j/"), "{}", &uri[..40]);
    }

    #[test]
    fn test_rejects_zero_quality() {
        let grid = PixelGrid::new(2, 2, ChannelOrder::Rgb);
        assert!(matches!(encode_jpeg(grid, 0), Err(EncodeError::InvalidQuality(0))));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let data: Vec<u8> = (0..32 * 32 * 3).map(|i| (i % 251) as u8).collect();
        let grid = PixelGrid::from_raw(32, 32, ChannelOrder::Bgr, data).unwrap();
        let a = encode_jpeg(grid.clone(), 95).unwrap();
        let b = encode_jpeg(grid, 95).unwrap();
        assert_eq!(a, b);
    }
}
