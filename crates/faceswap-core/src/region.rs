//! Padded region-of-interest extraction.
//!
//! Expands a face box symmetrically and clamps the result to its image so
//! the region is always safe to crop.

use crate::types::{BoundingBox, PaddedRegion};

pub const DEFAULT_PADDING_RATIO: f32 = 0.15;

/// Padding in pixels for a box of the given width: `round(width * ratio)`.
pub fn padding_amount(width: u32, ratio: f32) -> u32 {
    (width as f64 * ratio as f64).round().max(0.0) as u32
}

/// Pad `bbox` by `ratio` of its own width and clamp to the image.
pub fn extract(bbox: &BoundingBox, image_width: u32, image_height: u32, ratio: f32) -> PaddedRegion {
    extract_with_padding(bbox, image_width, image_height, padding_amount(bbox.width, ratio))
}

/// Pad `bbox` by a fixed pixel amount on every side and clamp to the image.
pub fn extract_with_padding(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    padding: u32,
) -> PaddedRegion {
    let x = bbox.x.saturating_sub(padding).min(image_width);
    let y = bbox.y.saturating_sub(padding).min(image_height);
    let width = (image_width - x).min(bbox.width.saturating_add(padding.saturating_mul(2)));
    let height = (image_height - y).min(bbox.height.saturating_add(padding.saturating_mul(2)));
    PaddedRegion {
        x,
        y,
        width,
        height,
    }
}

/// Pad the target and swap boxes with the same amount, derived from the
/// target box width.
pub fn pad_pair(
    target: &BoundingBox,
    target_dims: (u32, u32),
    swap: &BoundingBox,
    swap_dims: (u32, u32),
    ratio: f32,
) -> (PaddedRegion, PaddedRegion) {
    let padding = padding_amount(target.width, ratio);
    let target_region = extract_with_padding(target, target_dims.0, target_dims.1, padding);
    let swap_region = extract_with_padding(swap, swap_dims.0, swap_dims.1, padding);
    tracing::debug!(padding, ?target_region, ?swap_region, "padded face regions");
    (target_region, swap_region)
}
