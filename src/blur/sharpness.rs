//! Sharpness metrics.
//!
//! Two scores are computed on the grayscale center crop of a region:
//!
//! - **Laplacian variance**: population variance of the response to the
//!   4-neighbour kernel `[0,1,0; 1,-4,1; 0,1,0]`, with borders reflected
//!   without repeating the edge pixel.
//! - **Tenengrad**: mean of `gx² + gy²` over 3×3 Sobel gradients.
//!
//! Both fall towards zero as an image loses high-frequency detail. Regions
//! whose crop is smaller than 3×3 pixels score zero on both.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

/// Side length of the tile grid used in tiled mode.
pub const GRID_SIZE: u32 = 3;

/// Number of tiles in tiled mode.
pub const TILE_COUNT: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// Smallest region side on which the 3×3 kernels are meaningful.
const MIN_SIDE: u32 = 3;

/// Pair of sharpness scores for one region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sharpness {
    pub laplacian_variance: f64,
    pub tenengrad: f64,
}

impl Sharpness {
    /// Score of a degenerate region.
    pub const ZERO: Self = Self {
        laplacian_variance: 0.0,
        tenengrad: 0.0,
    };
}

/// Preprocessing parameters shared by every scoring call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessParams {
    /// Fraction of each dimension kept by the center crop, in `(0, 1]`
    pub crop_fraction: f64,
    /// Images wider than this are downscaled to it before scoring
    pub downscale_width: u32,
}

impl Default for SharpnessParams {
    fn default() -> Self {
        Self {
            crop_fraction: 0.7,
            downscale_width: 800,
        }
    }
}

/// Scores for a whole image or for each tile of its 3×3 grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SharpnessAssessment {
    Whole(Sharpness),
    /// Row-major tile scores
    Tiled([Sharpness; TILE_COUNT]),
}

/// Shrink `img` to `max_width` if it is wider, keeping the aspect ratio.
///
/// The new height is `floor(h * max_width / w)`, never less than one.
#[must_use]
pub fn downscale(img: &RgbImage, max_width: u32) -> Cow<'_, RgbImage> {
    let (w, h) = img.dimensions();
    if w <= max_width || max_width == 0 {
        return Cow::Borrowed(img);
    }

    let new_h = (u64::from(h) * u64::from(max_width) / u64::from(w)).max(1);
    let new_h = u32::try_from(new_h).unwrap_or(u32::MAX);
    Cow::Owned(imageops::resize(img, max_width, new_h, FilterType::Triangle))
}

/// Keep the central `fraction` of each dimension.
#[must_use]
pub fn center_crop(img: &RgbImage, fraction: f64) -> RgbImage {
    let (w, h) = img.dimensions();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (cw, ch) = (
        (f64::from(w) * fraction).floor() as u32,
        (f64::from(h) * fraction).floor() as u32,
    );
    let (cw, ch) = (cw.min(w), ch.min(h));
    imageops::crop_imm(img, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image()
}

/// Reflect an out-of-range index back into `0..len` without repeating the
/// edge (`-1 -> 1`, `len -> len - 2`).
fn reflect_101(i: i64, len: i64) -> u32 {
    let r = if i < 0 {
        -i
    } else if i >= len {
        2 * len - i - 2
    } else {
        i
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let r = r.clamp(0, len - 1) as u32;
    r
}

/// Population variance of the 4-neighbour Laplacian response.
#[must_use]
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < MIN_SIDE || h < MIN_SIDE {
        return 0.0;
    }

    let (wi, hi) = (i64::from(w), i64::from(h));
    let px = |x: i64, y: i64| f64::from(gray.get_pixel(reflect_101(x, wi), reflect_101(y, hi))[0]);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..hi {
        for x in 0..wi {
            let v = px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += v;
            sum_sq += v * v;
        }
    }

    let n = f64::from(w) * f64::from(h);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Mean squared Sobel gradient magnitude.
#[must_use]
pub fn tenengrad(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < MIN_SIDE || h < MIN_SIDE {
        return 0.0;
    }

    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let total: f64 = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| {
            let (x, y) = (f64::from(x[0]), f64::from(y[0]));
            x * x + y * y
        })
        .sum();

    total / (f64::from(w) * f64::from(h))
}

/// Center-crop `region` and compute both scores on its grayscale version.
#[must_use]
pub fn score(region: &RgbImage, crop_fraction: f64) -> Sharpness {
    let cropped = center_crop(region, crop_fraction);
    let (w, h) = cropped.dimensions();
    if w < MIN_SIDE || h < MIN_SIDE {
        return Sharpness::ZERO;
    }

    let gray = imageops::grayscale(&cropped);
    Sharpness {
        laplacian_variance: laplacian_variance(&gray),
        tenengrad: tenengrad(&gray),
    }
}

/// Score each tile of a 3×3 grid, row-major.
///
/// Tiles are `(w / 3) × (h / 3)` pixels; the right and bottom remainders are
/// ignored.
#[must_use]
pub fn grid_scores(img: &RgbImage, crop_fraction: f64) -> [Sharpness; TILE_COUNT] {
    let (w, h) = img.dimensions();
    let (tw, th) = (w / GRID_SIZE, h / GRID_SIZE);

    let mut scores = [Sharpness::ZERO; TILE_COUNT];
    for (i, slot) in scores.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let i = i as u32;
        let (row, col) = (i / GRID_SIZE, i % GRID_SIZE);
        let tile = imageops::crop_imm(img, col * tw, row * th, tw, th).to_image();
        *slot = score(&tile, crop_fraction);
    }
    scores
}

/// Downscale `pixels`, then score it whole or per tile.
#[must_use]
pub fn assess(pixels: &RgbImage, params: &SharpnessParams, tiled: bool) -> SharpnessAssessment {
    let img = downscale(pixels, params.downscale_width);
    if tiled {
        SharpnessAssessment::Tiled(grid_scores(&img, params.crop_fraction))
    } else {
        SharpnessAssessment::Whole(score(&img, params.crop_fraction))
    }
}
