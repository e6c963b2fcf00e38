//! Face compositing.
//!
//! The swap face is cropped, stretched to the target region and blended in
//! with OpenCV's normal-clone Poisson blend. Any blend failure falls back to
//! a rectangular overwrite of the same region.

use crate::mat;
use crate::resize;
use crate::types::{ImageRole, PaddedRegion, PixelGrid};
use opencv::core::{Mat, Point};
use opencv::photo;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlendError {
    #[error("mask is {mask_width}x{mask_height} but source is {src_width}x{src_height}")]
    MaskSizeMismatch {
        mask_width: u32,
        mask_height: u32,
        src_width: u32,
        src_height: u32,
    },
    #[error("blend region {0}x{1} is too small")]
    Degenerate(u32, u32),
    #[error("blend region at ({x}, {y}) {width}x{height} leaves the {dst_width}x{dst_height} destination")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        dst_width: u32,
        dst_height: u32,
    },
    #[error("mask selects no interior pixels")]
    EmptyMask,
    #[error("source and destination channel orders differ")]
    OrderMismatch,
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("region {region:?} exceeds the {width}x{height} image")]
    RegionOutOfBounds {
        region: PaddedRegion,
        width: u32,
        height: u32,
    },
    #[error("{0} region is empty")]
    EmptyRegion(ImageRole),
    #[error("patch is {patch_width}x{patch_height} but region is {region_width}x{region_height}")]
    SizeMismatch {
        patch_width: u32,
        patch_height: u32,
        region_width: u32,
        region_height: u32,
    },
    #[error("target and swap channel orders differ")]
    OrderMismatch,
}

/// Single-channel blend mask; non-zero pixels take part in blending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Mask {
    /// Every pixel participates.
    pub fn opaque(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![255; width as usize * height as usize],
        }
    }

    /// No pixel participates.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width as usize + x]
    }
}

/// How the swap face ended up in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Seamless,
    Overwrite,
}

/// The target image with the swap face composited into `region`.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub image: PixelGrid,
    pub mode: BlendMode,
    pub region: PaddedRegion,
}

/// Composite with a fully opaque mask.
pub fn composite(
    target: PixelGrid,
    target_region: &PaddedRegion,
    swap: &PixelGrid,
    swap_region: &PaddedRegion,
) -> Result<CompositeResult, CompositeError> {
    let mask = Mask::opaque(target_region.width, target_region.height);
    composite_with_mask(target, target_region, swap, swap_region, &mask)
}

/// Crop `swap_region`, stretch it to `target_region`, and blend it in with
/// `mask`. Falls back to [`overwrite`] when blending fails.
pub fn composite_with_mask(
    mut target: PixelGrid,
    target_region: &PaddedRegion,
    swap: &PixelGrid,
    swap_region: &PaddedRegion,
    mask: &Mask,
) -> Result<CompositeResult, CompositeError> {
    check_region(target_region, &target)?;
    check_region(swap_region, swap)?;
    if target_region.area() == 0 {
        return Err(CompositeError::EmptyRegion(ImageRole::Target));
    }
    if swap_region.area() == 0 {
        return Err(CompositeError::EmptyRegion(ImageRole::Swap));
    }
    if target.order != swap.order {
        return Err(CompositeError::OrderMismatch);
    }

    let face = resize::resize_grid(&swap.crop(swap_region), target_region.width, target_region.height);

    match seamless_clone(&face, &target, mask, target_region.center()) {
        Ok(image) => {
            tracing::debug!(region = ?target_region, "seamless blend applied");
            Ok(CompositeResult {
                image,
                mode: BlendMode::Seamless,
                region: *target_region,
            })
        }
        Err(err) => {
            tracing::warn!(error = %err, region = ?target_region, "seamless blend failed; overwriting region");
            overwrite(&mut target, &face, target_region)?;
            Ok(CompositeResult {
                image: target,
                mode: BlendMode::Overwrite,
                region: *target_region,
            })
        }
    }
}

fn check_region(region: &PaddedRegion, image: &PixelGrid) -> Result<(), CompositeError> {
    if region.fits_within(image.width, image.height) {
        Ok(())
    } else {
        Err(CompositeError::RegionOutOfBounds {
            region: *region,
            width: image.width,
            height: image.height,
        })
    }
}

/// Copy `patch` into `dst` at `region`, replacing every pixel.
pub fn overwrite(dst: &mut PixelGrid, patch: &PixelGrid, region: &PaddedRegion) -> Result<(), CompositeError> {
    check_region(region, dst)?;
    if patch.width != region.width || patch.height != region.height {
        return Err(CompositeError::SizeMismatch {
            patch_width: patch.width,
            patch_height: patch.height,
            region_width: region.width,
            region_height: region.height,
        });
    }
    if patch.order != dst.order {
        return Err(CompositeError::OrderMismatch);
    }

    let row_len = region.width as usize * 3;
    for row in 0..region.height {
        let d = ((region.y + row) as usize * dst.width as usize + region.x as usize) * 3;
        let s = row as usize * row_len;
        dst.data[d..d + row_len].copy_from_slice(&patch.data[s..s + row_len]);
    }
    Ok(())
}

/// Normal-clone Poisson blend of `src` into a copy of `dst`, centered at `center`.
///
/// The outermost ring of the source rectangle is always treated as outside
/// the mask, so the destination supplies the boundary condition. Inside the
/// mask the result keeps the source gradients.
pub fn seamless_clone(
    src: &PixelGrid,
    dst: &PixelGrid,
    mask: &Mask,
    center: (u32, u32),
) -> Result<PixelGrid, BlendError> {
    if mask.width != src.width || mask.height != src.height {
        return Err(BlendError::MaskSizeMismatch {
            mask_width: mask.width,
            mask_height: mask.height,
            src_width: src.width,
            src_height: src.height,
        });
    }
    if src.order != dst.order {
        return Err(BlendError::OrderMismatch);
    }
    if src.width < 3 || src.height < 3 {
        return Err(BlendError::Degenerate(src.width, src.height));
    }

    let ox = center.0 as i64 - (src.width / 2) as i64;
    let oy = center.1 as i64 - (src.height / 2) as i64;
    if ox < 0
        || oy < 0
        || ox + src.width as i64 > dst.width as i64
        || oy + src.height as i64 > dst.height as i64
    {
        return Err(BlendError::OutOfBounds {
            x: ox,
            y: oy,
            width: src.width,
            height: src.height,
            dst_width: dst.width,
            dst_height: dst.height,
        });
    }

    let (w, h) = (src.width as usize, src.height as usize);
    let interior = (1..h - 1).any(|y| (1..w - 1).any(|x| mask.get(x, y) > 0));
    if !interior {
        return Err(BlendError::EmptyMask);
    }

    let src_mat = mat::from_grid(src)?;
    let dst_mat = mat::from_grid(dst)?;
    let mask_mat = mat::from_gray(&mask.data, mask.height)?;

    let mut blended = Mat::default();
    photo::seamless_clone(
        &src_mat,
        &dst_mat,
        &mask_mat,
        Point::new(center.0 as i32, center.1 as i32),
        &mut blended,
        photo::NORMAL_CLONE,
    )?;

    Ok(mat::to_grid(&blended, dst.order)?)
}
