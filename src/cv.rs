//! Conversions between `image` buffers and OpenCV matrices.

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Scalar, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

pub(crate) fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        dim(gray.height())?,
        dim(gray.width())?,
        CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(gray.as_raw());
    Ok(mat)
}

/// RGB buffer to a BGR matrix, the channel order HighGUI and the drawing
/// functions expect.
pub(crate) fn rgb_to_bgr_mat(rgb: &RgbImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        dim(rgb.height())?,
        dim(rgb.width())?,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    let dst = mat.data_bytes_mut()?;
    for (out, px) in dst.chunks_exact_mut(3).zip(rgb.as_raw().chunks_exact(3)) {
        out[0] = px[2];
        out[1] = px[1];
        out[2] = px[0];
    }
    Ok(mat)
}

/// BGR matrix (as produced by `VideoCapture`) to an RGB buffer.
pub(crate) fn bgr_mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.typ() != CV_8UC3 {
        return Err(anyhow!("expected an 8-bit 3-channel frame, got type {}", mat.typ()));
    }
    let width = u32::try_from(mat.cols()).map_err(|_| anyhow!("negative frame width"))?;
    let height = u32::try_from(mat.rows()).map_err(|_| anyhow!("negative frame height"))?;
    let continuous;
    let src = if mat.is_continuous() {
        mat.data_bytes()?
    } else {
        continuous = mat.try_clone()?;
        continuous.data_bytes()?
    };
    let mut rgb = Vec::with_capacity(src.len());
    for px in src.chunks_exact(3) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))
}

fn dim(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| anyhow!("image dimension {} too large", value))
}
