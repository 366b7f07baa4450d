//! Multi-scale sliding-window detection
//!
//! The image is turned into an integral image and a squared integral image
//! once. Instead of resizing the image for every scale, the cascade is
//! grown, so every scale reads the same tables.

use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::*;

/// A square window the cascade accepted, in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Detection {
    pub x: usize,
    pub y: usize,
    pub size: usize,
}

/// Scans images with a trained cascade
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
}
impl Detector {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig { &self.config }

    /// Detects every window of `img` that `cascade` accepts
    pub fn detect(&self, cascade: &Cascade, img: &GrayImage) -> Vec<Detection> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        self.detect_values(cascade, &gray_values(img), w, h)
    }

    /// Detects on row-major intensities in `[0, 1]`.
    ///
    /// Detections are ordered by scale, then column, then row. Overlapping
    /// windows are all reported.
    pub fn detect_values(
        &self,
        cascade: &Cascade,
        values: &[f64],
        width: usize,
        height: usize,
    ) -> Vec<Detection> {
        let ii = IntegralImage::new(values, width, height);
        let sq = IntegralImage::squared(values, width, height);

        let pyramid = self.pyramid(cascade, width.min(height));
        info!(
            width,
            height,
            scales = pyramid.len(),
            "Scanning image"
        );

        let per_scale: Vec<Vec<Detection>> = pyramid
            .par_iter()
            .map(|scaled| scan(scaled, &ii, &sq, self.config.slide_step))
            .collect();
        let detections: Vec<Detection> = per_scale.into_iter().flatten().collect();
        info!(detections = detections.len(), "Scan finished");
        detections
    }

    /// Copies of the cascade for every window size that fits in `limit`,
    /// smallest first. Each one is grown from the previous copy so
    /// truncation accumulates the same way across scales.
    fn pyramid(&self, cascade: &Cascade, limit: usize) -> Vec<Cascade> {
        let mut current = cascade.clone();
        current.scale_thresholds(self.config.threshold_scale);

        let mut pyramid = Vec::new();
        while current.size() > 0 && current.size() <= limit {
            let size = current.size();
            let next = current.scaled(self.config.scale_step);
            pyramid.push(current);
            if next.size() <= size {
                warn!(size, step = self.config.scale_step, "Window stopped growing, ending scan");
                break;
            }
            current = next;
        }
        pyramid
    }
}

/// Slides one window size over the image
fn scan(
    cascade: &Cascade,
    ii: &IntegralImage,
    sq: &IntegralImage,
    slide_step: f64,
) -> Vec<Detection> {
    let size = cascade.size();
    let slide = ((size as f64 * slide_step) as usize).max(1);
    let mut found = Vec::new();
    for x in (0..=ii.width() - size).step_by(slide) {
        for y in (0..=ii.height() - size).step_by(slide) {
            let window = Window::normalized(ii, sq, x, y, size);
            if cascade.classify(&window) {
                found.push(Detection { x, y, size });
            }
        }
    }
    debug!(size, slide, detections = found.len(), "Scanned scale");
    found
}
