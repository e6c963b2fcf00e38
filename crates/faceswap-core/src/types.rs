use serde::{Deserialize, Serialize};

/// Order of the three color samples within each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A dense 8-bit, 3-channel image.
///
/// Samples are stored row-major and interleaved: `data[(y * width + x) * 3 + c]`.
/// The channel order is carried alongside the samples and only ever changes
/// through [`PixelGrid::into_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
}

impl PixelGrid {
    /// Create a black grid.
    pub fn new(width: u32, height: u32, order: ChannelOrder) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * 3],
            width,
            height,
            order,
        }
    }

    /// Wrap raw interleaved samples. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            order,
        })
    }

    /// Take ownership of a decoded RGB image.
    pub fn from_rgb_image(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            order: ChannelOrder::Rgb,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, value: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&value);
    }

    /// Convert to the requested channel order, swapping the outer channels if needed.
    pub fn into_order(mut self, order: ChannelOrder) -> Self {
        if self.order != order {
            for px in self.data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            self.order = order;
        }
        self
    }

    /// Copy out a rectangle. The region must lie inside the grid.
    pub fn crop(&self, region: &PaddedRegion) -> PixelGrid {
        let mut data = Vec::with_capacity(region.area() as usize * 3);
        for y in region.y..region.y + region.height {
            let start = self.offset(region.x, y);
            data.extend_from_slice(&self.data[start..start + region.width as usize * 3]);
        }
        PixelGrid {
            data,
            width: region.width,
            height: region.height,
            order: self.order,
        }
    }

    /// Fixed-point BT.601 luma, one byte per pixel.
    pub fn to_gray(&self) -> Vec<u8> {
        let (r, b) = match self.order {
            ChannelOrder::Rgb => (0, 2),
            ChannelOrder::Bgr => (2, 0),
        };
        self.data
            .chunks_exact(3)
            .map(|px| {
                let y = 4899 * px[r] as u32 + 9617 * px[1] as u32 + 1868 * px[b] as u32 + 8192;
                (y >> 14) as u8
            })
            .collect()
    }
}

/// Axis-aligned face box in pixel units, always inside its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip corner coordinates to `[0, image_width] × [0, image_height]`.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clipped(x1: i64, y1: i64, x2: i64, y2: i64, image_width: u32, image_height: u32) -> Option<Self> {
        let x1 = x1.clamp(0, image_width as i64);
        let y1 = y1.clamp(0, image_height as i64);
        let x2 = x2.clamp(0, image_width as i64);
        let y2 = y2.clamp(0, image_height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

/// A located face. Classifier-scan detections carry no confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: Option<f32>,
}

/// Detections in the order the locator produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// The face the pipeline operates on: always the first entry, never re-ranked.
    pub fn primary(&self) -> Option<&Detection> {
        self.detections.first()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}

/// A bounding box after padding and clamping to its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PaddedRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Integer midpoint `(x + w/2, y + h/2)`.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Which of the two request images a result or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Target,
    Swap,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRole::Target => f.write_str("target"),
            ImageRole::Swap => f.write_str("swap"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_order_swaps_outer_channels() {
        let grid = PixelGrid::from_raw(1, 1, ChannelOrder::Rgb, vec![10, 20, 30]).unwrap();
        let bgr = grid.into_order(ChannelOrder::Bgr);
        assert_eq!(bgr.order, ChannelOrder::Bgr);
        assert_eq!(bgr.data, vec![30, 20, 10]);
        // Converting to the current order is a no-op.
        let same = bgr.clone().into_order(ChannelOrder::Bgr);
        assert_eq!(same, bgr);
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(PixelGrid::from_raw(2, 2, ChannelOrder::Rgb, vec![0; 11]).is_none());
    }

    #[test]
    fn test_gray_is_order_aware() {
        let rgb = PixelGrid::from_raw(1, 1, ChannelOrder::Rgb, vec![255, 0, 0]).unwrap();
        let bgr = rgb.clone().into_order(ChannelOrder::Bgr);
        assert_eq!(rgb.to_gray(), bgr.to_gray());
        // Pure red: (4899 * 255 + 8192) >> 14 = 76
        assert_eq!(rgb.to_gray(), vec![76]);
    }

    #[test]
    fn test_gray_white_stays_white() {
        let grid = PixelGrid::from_raw(1, 1, ChannelOrder::Bgr, vec![255, 255, 255]).unwrap();
        assert_eq!(grid.to_gray(), vec![255]);
    }

    #[test]
    fn test_crop_copies_rectangle() {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|i| i as u8).collect();
        let grid = PixelGrid::from_raw(4, 3, ChannelOrder::Rgb, data).unwrap();
        let region = PaddedRegion { x: 1, y: 1, width: 2, height: 2 };
        let crop = grid.crop(&region);
        assert_eq!(crop.width, 2);
        assert_eq!(crop.height, 2);
        assert_eq!(crop.pixel(0, 0), grid.pixel(1, 1));
        assert_eq!(crop.pixel(1, 1), grid.pixel(2, 2));
    }

    #[test]
    fn test_bbox_clipped() {
        let b = BoundingBox::clipped(-10, 5, 50, 120, 40, 100).unwrap();
        assert_eq!(b, BoundingBox::new(0, 5, 40, 95));
        assert!(BoundingBox::clipped(50, 50, 60, 60, 40, 40).is_none());
        assert!(BoundingBox::clipped(10, 10, 10, 20, 40, 40).is_none());
    }

    #[test]
    fn test_primary_is_first_not_most_confident() {
        let result = DetectionResult::new(vec![
            Detection { bbox: BoundingBox::new(0, 0, 10, 10), confidence: Some(0.6) },
            Detection { bbox: BoundingBox::new(20, 20, 10, 10), confidence: Some(0.99) },
        ]);
        assert_eq!(result.primary().unwrap().bbox, BoundingBox::new(0, 0, 10, 10));
    }

    #[test]
    fn test_region_center_uses_integer_halves() {
        let r = PaddedRegion { x: 70, y: 70, width: 261, height: 259 };
        assert_eq!(r.center(), (200, 199));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ImageRole::Target.to_string(), "target");
        assert_eq!(ImageRole::Swap.to_string(), "swap");
    }
}
