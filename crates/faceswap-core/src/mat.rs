//! Copies between [`PixelGrid`] buffers and OpenCV matrices.

use crate::types::{ChannelOrder, PixelGrid};
use opencv::core::{Mat, StsUnmatchedSizes, CV_8UC3};
use opencv::prelude::*;

/// Owned 8UC3 copy of `grid`. Channel order is carried over unchanged.
pub fn from_grid(grid: &PixelGrid) -> opencv::Result<Mat> {
    Mat::from_slice(&grid.data)?
        .reshape(3, grid.height as i32)?
        .try_clone()
}

/// Owned 8UC1 copy of a row-major single-channel buffer.
pub fn from_gray(gray: &[u8], height: u32) -> opencv::Result<Mat> {
    Mat::from_slice(gray)?.reshape(1, height as i32)?.try_clone()
}

/// Copy an 8UC3 matrix back into a grid tagged with `order`.
pub fn to_grid(mat: &Mat, order: ChannelOrder) -> opencv::Result<PixelGrid> {
    if mat.typ() != CV_8UC3 {
        return Err(opencv::Error::new(
            StsUnmatchedSizes,
            format!("expected an 8-bit 3-channel matrix, got type {}", mat.typ()),
        ));
    }
    let contiguous;
    let mat = if mat.is_continuous() {
        mat
    } else {
        contiguous = mat.try_clone()?;
        &contiguous
    };

    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    PixelGrid::from_raw(width, height, order, mat.data_bytes()?.to_vec()).ok_or_else(|| {
        opencv::Error::new(
            StsUnmatchedSizes,
            format!("matrix data does not fill {width}x{height}x3"),
        )
    })
}
