//! Image fixtures and decoder doubles shared by the integration tests.

use image::{Rgb, RgbImage};
use picsift::scanner::{DecodeError, DecodedImage, ImageDecoder, StrategyDecoder};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Uniform grey image: zero Laplacian variance and zero gradient.
pub fn flat(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([128, 128, 128]))
}

/// Black and white squares of `cell` pixels.
pub fn checkerboard(w: u32, h: u32, cell: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

/// Horizontal ramp with a diagonal band, structured enough to fingerprint.
pub fn landscape(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let ramp = (x * 255 / w.max(1)) as u8;
        if x.abs_diff(y) < w / 8 {
            Rgb([255 - ramp, 40, ramp])
        } else {
            Rgb([ramp, ramp / 2, 200])
        }
    })
}

/// Top third checkerboard, remainder flat.
pub fn sharp_top_band(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        if y < h / 3 {
            if ((x / 3) + (y / 3)) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        } else {
            Rgb([128, 128, 128])
        }
    })
}

pub fn save(img: &RgbImage, path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    img.save(path).unwrap();
}

/// Real decoder that counts how often it is called.
#[derive(Default)]
pub struct CountingDecoder {
    inner: StrategyDecoder,
    calls: AtomicUsize,
}

impl CountingDecoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(path)
    }
}

/// Returns `shared` the first time each path is decoded and the path's own
/// image afterwards, so that files fingerprint alike but score differently.
pub struct StagedDecoder {
    shared: RgbImage,
    later: HashMap<String, RgbImage>,
    seen: Mutex<HashSet<PathBuf>>,
}

impl StagedDecoder {
    pub fn new(shared: RgbImage, later: HashMap<String, RgbImage>) -> Self {
        Self {
            shared,
            later,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl ImageDecoder for StagedDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let first = self.seen.lock().unwrap().insert(path.to_path_buf());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let pixels = if first {
            self.shared.clone()
        } else {
            self.later
                .get(&name)
                .cloned()
                .ok_or_else(|| DecodeError::Unreadable(path.to_path_buf()))?
        };
        Ok(DecodedImage {
            pixels,
            method: picsift::scanner::ReadMethod::Extension,
        })
    }
}

/// Real decoder that counts decodes happening after `watched` exists.
pub struct MoveWatchDecoder {
    inner: StrategyDecoder,
    watched: PathBuf,
    late: AtomicUsize,
}

impl MoveWatchDecoder {
    pub fn new(watched: PathBuf) -> Self {
        Self {
            inner: StrategyDecoder::new(),
            watched,
            late: AtomicUsize::new(0),
        }
    }

    pub fn late_decodes(&self) -> usize {
        self.late.load(Ordering::SeqCst)
    }
}

impl ImageDecoder for MoveWatchDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        if self.watched.exists() {
            self.late.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.decode(path)
    }
}

/// Vertical black and white stripes of `width` pixels.
pub fn stripes(w: u32, h: u32, width: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, _| {
        if (x / width) % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([235, 235, 235])
        }
    })
}
