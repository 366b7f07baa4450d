//! Haar-like rectangle features
//!
//! A feature is a rectangle-difference pattern placed at a fixed offset
//! inside the detection window. Its value is read from an integral image in
//! constant time, so a window is never cropped out of the source image.

use std::fmt;

use crate::{Error, IntegralImage, Result};

/// The four supported rectangle layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Left and right halves, right minus left
    TwoHorizontal,
    /// Top and bottom halves, top minus bottom
    TwoVertical,
    /// Three columns, middle minus both outer columns
    ThreeHorizontal,
    /// Three rows, middle minus both outer rows
    ThreeVertical,
}
impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::TwoHorizontal,
        FeatureKind::TwoVertical,
        FeatureKind::ThreeHorizontal,
        FeatureKind::ThreeVertical,
    ];

    /// The numeric code used in model files
    pub const fn code(self) -> u8 {
        match self {
            FeatureKind::TwoHorizontal => 0,
            FeatureKind::TwoVertical => 1,
            FeatureKind::ThreeHorizontal => 2,
            FeatureKind::ThreeVertical => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(FeatureKind::TwoHorizontal),
            1 => Ok(FeatureKind::TwoVertical),
            2 => Ok(FeatureKind::ThreeHorizontal),
            3 => Ok(FeatureKind::ThreeVertical),
            _ => Err(Error::FeatureTypeInvalid(code)),
        }
    }

    // (min width, min height, width step, height step) used when
    // enumerating every feature of a window
    const fn growth(self) -> (usize, usize, usize, usize) {
        match self {
            FeatureKind::TwoHorizontal => (4, 4, 2, 1),
            FeatureKind::TwoVertical => (4, 4, 1, 2),
            FeatureKind::ThreeHorizontal => (3, 4, 3, 1),
            FeatureKind::ThreeVertical => (4, 3, 1, 3),
        }
    }
}

/// A feature placed inside a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub kind: FeatureKind,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}
impl Feature {
    pub const fn new(kind: FeatureKind, x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { kind, x, y, w, h }
    }

    /// Computes the raw feature value for the window whose top left corner
    /// is `(ox, oy)` in `ii`.
    ///
    /// Halves and thirds use truncating integer division, so a feature whose
    /// sides do not divide evenly leaves the remainder columns/rows out.
    #[inline]
    pub fn value(&self, ii: &IntegralImage, ox: usize, oy: usize) -> f64 {
        let (x, y, w, h) = (ox + self.x, oy + self.y, self.w, self.h);
        match self.kind {
            FeatureKind::TwoHorizontal => {
                let a = ii.rect_sum(x + w / 2, y, w / 2, h);
                let b = ii.rect_sum(x, y, w / 2, h);
                a - b
            }
            FeatureKind::TwoVertical => {
                let a = ii.rect_sum(x, y, w, h / 2);
                let b = ii.rect_sum(x, y + h / 2, w, h / 2);
                a - b
            }
            FeatureKind::ThreeHorizontal => {
                let a = ii.rect_sum(x + w / 3, y, w / 3, h);
                let b = ii.rect_sum(x, y, w / 3, h);
                let c = ii.rect_sum(x + w * 2 / 3, y, w / 3, h);
                a - b - c
            }
            FeatureKind::ThreeVertical => {
                let a = ii.rect_sum(x, y + h / 3, w, h / 3);
                let b = ii.rect_sum(x, y, w, h / 3);
                let c = ii.rect_sum(x, y + h * 2 / 3, w, h / 3);
                a - b - c
            }
        }
    }

    /// Area of one third of a three-rectangle feature, zero for the
    /// two-rectangle kinds.
    ///
    /// A window offset by a constant `m` shifts a three-rectangle value by
    /// `-m * third_area()` while two-rectangle values are unchanged.
    #[inline]
    pub fn third_area(&self) -> f64 {
        match self.kind {
            FeatureKind::ThreeHorizontal => ((self.w / 3) * self.h) as f64,
            FeatureKind::ThreeVertical => (self.w * (self.h / 3)) as f64,
            _ => 0.0,
        }
    }

    /// Scales position and size, truncating toward zero
    pub fn scale(&mut self, factor: f64) {
        self.x = (self.x as f64 * factor) as usize;
        self.y = (self.y as f64 * factor) as usize;
        self.w = (self.w as f64 * factor) as usize;
        self.h = (self.h as f64 * factor) as usize;
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        self.scale(factor);
        self
    }

    /// Gets every feature that fits in a `width` by `height` window
    pub fn generate(width: usize, height: usize) -> Vec<Feature> {
        let mut features = Vec::new();
        for kind in FeatureKind::ALL {
            let (min_w, min_h, step_w, step_h) = kind.growth();
            for h in (min_h..=height).step_by(step_h) {
                for w in (min_w..=width).step_by(step_w) {
                    for y in 0..=(height - h) {
                        for x in 0..=(width - w) {
                            features.push(Feature::new(kind, x, y, w, h));
                        }
                    }
                }
            }
        }
        features
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.kind.code(),
            self.w,
            self.h,
            self.x,
            self.y
        )
    }
}
