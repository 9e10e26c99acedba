//! Frame preprocessing: grayscale conversion and CLAHE.
//!
//! Both detectors run on the enhanced grayscale image. CLAHE follows the
//! usual tile scheme: per-tile histograms clipped at `clip_limit` times the
//! mean bin height, the clipped excess spread evenly across all bins, and the
//! per-tile lookup tables blended bilinearly between tile centres.

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

const BINS: usize = 256;

/// CLAHE parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClaheParams {
    /// Contrast limit relative to a flat histogram. Zero or less disables clipping.
    pub clip_limit: f64,
    /// Tiles per axis.
    pub tile_grid: u32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
        }
    }
}

impl ClaheParams {
    pub fn validate(&self) -> Result<()> {
        if !self.clip_limit.is_finite() {
            return Err(anyhow!("clahe clip limit must be finite"));
        }
        if self.tile_grid == 0 {
            return Err(anyhow!("clahe tile grid must be at least 1"));
        }
        Ok(())
    }
}

/// BT.601 luma, fixed-point with the same weights OpenCV uses.
pub fn grayscale(rgb: &RgbImage) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let luma: Vec<u8> = rgb
        .as_raw()
        .chunks_exact(3)
        .map(|px| {
            let y = u32::from(px[0]) * 4899 + u32::from(px[1]) * 9617 + u32::from(px[2]) * 1868;
            ((y + 8192) >> 14) as u8
        })
        .collect();
    // Length is w * h by construction.
    GrayImage::from_raw(w, h, luma).unwrap_or_else(|| GrayImage::new(w, h))
}

/// Grayscale followed by CLAHE.
pub fn enhance(rgb: &RgbImage, params: ClaheParams) -> GrayImage {
    clahe(&grayscale(rgb), params)
}

/// Contrast-limited adaptive histogram equalization.
pub fn clahe(gray: &GrayImage, params: ClaheParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let grid = params.tile_grid.max(1);
    let tile_w = w.div_ceil(grid).max(1);
    let tile_h = h.div_ceil(grid).max(1);
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts.push(tile_lut(&mut hist, area, params.clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let inv_tw = 1.0 / f64::from(tile_w);
    let inv_th = 1.0 / f64::from(tile_h);

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty1, ty2, ya) = tile_coords(f64::from(y) * inv_th - 0.5, tiles_y);
        for x in 0..w {
            let (tx1, tx2, xa) = tile_coords(f64::from(x) * inv_tw - 0.5, tiles_x);
            let v = gray.get_pixel(x, y).0[0] as usize;
            let top = f64::from(lut_at(tx1, ty1)[v]) * (1.0 - xa)
                + f64::from(lut_at(tx2, ty1)[v]) * xa;
            let bottom = f64::from(lut_at(tx1, ty2)[v]) * (1.0 - xa)
                + f64::from(lut_at(tx2, ty2)[v]) * xa;
            let value = top * (1.0 - ya) + bottom * ya;
            out.get_pixel_mut(x, y).0[0] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Neighbouring tile indices and the blend weight toward the second one.
fn tile_coords(pos: f64, tiles: u32) -> (u32, u32, f64) {
    let first = pos.floor();
    let weight = pos - first;
    let last = f64::from(tiles - 1);
    let t1 = first.clamp(0.0, last) as u32;
    let t2 = (first + 1.0).clamp(0.0, last) as u32;
    (t1, t2, weight)
}

fn tile_lut(hist: &mut [u32; BINS], area: u32, clip_limit: f64) -> [u8; BINS] {
    if clip_limit > 0.0 {
        let clip = ((clip_limit * f64::from(area) / BINS as f64) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                clipped += *bin - clip;
                *bin = clip;
            }
        }
        let batch = clipped / BINS as u32;
        let mut residual = clipped - batch * BINS as u32;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (BINS as u32 / residual).max(1) as usize;
            let mut i = 0;
            while i < BINS && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = (BINS - 1) as f64 / f64::from(area.max(1));
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (i, entry) in lut.iter_mut().enumerate() {
        sum += hist[i];
        *entry = (f64::from(sum) * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn stripes(size: u32, low: u8, high: u8) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _| Luma([if x % 2 == 0 { low } else { high }]))
    }

    #[test]
    fn grayscale_uses_bt601_weights() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([90, 90, 90]));
        let gray = grayscale(&rgb);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 90);
    }

    #[test]
    fn constant_image_stays_uniform() {
        let gray = GrayImage::from_pixel(64, 48, Luma([128]));
        let out = clahe(&gray, ClaheParams::default());
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn unclipped_equalization_stretches_two_levels() {
        let gray = stripes(64, 100, 110);
        let out = clahe(
            &gray,
            ClaheParams {
                clip_limit: 0.0,
                tile_grid: 8,
            },
        );
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn clip_limit_bounds_contrast_gain() {
        let gray = stripes(256, 100, 110);
        let clipped = clahe(&gray, ClaheParams::default());
        let low = clipped.get_pixel(0, 0).0[0];
        let high = clipped.get_pixel(1, 0).0[0];
        assert!(high > low);
        assert!(high - low > 10, "contrast should increase: {low}..{high}");
        assert!(high - low < 127, "clip limit should bound the gain: {low}..{high}");
    }

    #[test]
    fn handles_images_smaller_than_grid() {
        let gray = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let out = clahe(&gray, ClaheParams::default());
        assert_eq!(out.dimensions(), (5, 3));
    }

    #[test]
    fn params_validation() {
        assert!(ClaheParams::default().validate().is_ok());
        assert!(ClaheParams {
            clip_limit: 2.0,
            tile_grid: 0
        }
        .validate()
        .is_err());
    }
}
