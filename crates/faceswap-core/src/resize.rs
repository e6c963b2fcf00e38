//! Bilinear resampling for interleaved 8-bit buffers.
//!
//! Uses half-pixel centers with edge clamping, so a uniform input stays
//! uniform and the output is a pure function of the input.

use crate::types::PixelGrid;

/// Resize an interleaved buffer of `channels` samples per pixel.
pub fn bilinear(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; new_width * new_height * channels];
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return out;
    }

    let scale_x = width as f32 / new_width as f32;
    let scale_y = height as f32 / new_height as f32;

    for y in 0..new_height {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);
        let fy = if src_y < 0.0 { 0.0 } else { fy };

        for x in 0..new_width {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);
            let fx = if src_x < 0.0 { 0.0 } else { fx };

            for c in 0..channels {
                let tl = src[(y0 * width + x0) * channels + c] as f32;
                let tr = src[(y0 * width + x1) * channels + c] as f32;
                let bl = src[(y1 * width + x0) * channels + c] as f32;
                let br = src[(y1 * width + x1) * channels + c] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                out[(y * new_width + x) * channels + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// Resize a grid to exactly `new_width × new_height`, ignoring aspect ratio.
pub fn resize_grid(src: &PixelGrid, new_width: u32, new_height: u32) -> PixelGrid {
    if src.width == new_width && src.height == new_height {
        return src.clone();
    }
    let data = bilinear(
        &src.data,
        src.width as usize,
        src.height as usize,
        3,
        new_width as usize,
        new_height as usize,
    );
    PixelGrid {
        data,
        width: new_width,
        height: new_height,
        order: src.order,
    }
}

/// Resize a single-channel buffer.
pub fn resize_gray(src: &[u8], width: usize, height: usize, new_width: usize, new_height: usize) -> Vec<u8> {
    bilinear(src, width, height, 1, new_width, new_height)
}
