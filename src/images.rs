use image::{GrayImage, Rgb, RgbImage};

use crate::{Detection, DETECTION_COLOR};

/// Summed-area table over a row-major grid of values
///
/// Entry `(x, y)` holds the sum of every value in the inclusive rectangle
/// `(0, 0)..=(x, y)`, so there is no padding row or column.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralImage {
    sums: Vec<f64>,
    width: usize,
    height: usize,
}
impl IntegralImage {
    /// Creates the integral image of `values`
    pub fn new(values: &[f64], width: usize, height: usize) -> Self {
        Self::accumulate(values, width, height, |v| v)
    }

    /// Creates the integral image of the squared `values`
    pub fn squared(values: &[f64], width: usize, height: usize) -> Self {
        Self::accumulate(values, width, height, |v| v * v)
    }

    fn accumulate(
        values: &[f64],
        width: usize,
        height: usize,
        f: impl Fn(f64) -> f64,
    ) -> Self {
        debug_assert_eq!(values.len(), width * height);
        let mut sums = Vec::<f64>::with_capacity(width * height);
        for y in 0..height {
            // Running sum of the current row
            let mut row = 0.0;
            for x in 0..width {
                row += f(values[x + width * y]);
                let above = if y == 0 { 0.0 } else { sums[x + width * (y - 1)] };
                sums.push(above + row);
            }
        }
        Self {
            sums,
            width,
            height,
        }
    }

    /// Creates the integral image of a grayscale image scaled to `[0, 1]`
    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        Self::new(&gray_values(img), w, h)
    }

    pub fn width(&self) -> usize { self.width }

    pub fn height(&self) -> usize { self.height }

    /// Gets the sum of the `w` by `h` rectangle whose top left corner is
    /// `(x, y)`. Terms that would fall left of or above the image are
    /// omitted; an empty rectangle sums to zero.
    #[inline]
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        if w == 0 || h == 0 {
            return 0.0;
        }
        let (xbr, ybr) = (x + w - 1, y + h - 1);
        let mut sum = self.sums[xbr + self.width * ybr];
        if x > 0 {
            sum -= self.sums[(x - 1) + self.width * ybr];
        }
        if y > 0 {
            sum -= self.sums[xbr + self.width * (y - 1)];
        }
        if x > 0 && y > 0 {
            sum += self.sums[(x - 1) + self.width * (y - 1)];
        }
        sum
    }
}

/// Converts a grayscale image to row-major intensities in `[0, 1]`
pub fn gray_values(img: &GrayImage) -> Vec<f64> {
    img.as_raw().iter().map(|&p| f64::from(p) / 255.0).collect()
}

/// A square training patch of raw intensities
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    size: usize,
    pixels: Vec<f64>,
}
impl Patch {
    /// Wraps `size * size` row-major intensities, `None` on a length mismatch
    pub fn new(size: usize, pixels: Vec<f64>) -> Option<Self> {
        (pixels.len() == size * size).then_some(Self { size, pixels })
    }

    /// Takes the intensities of a square grayscale image
    pub fn from_gray(img: &GrayImage) -> Option<Self> {
        if img.width() != img.height() {
            return None;
        }
        Self::new(img.width() as usize, gray_values(img))
    }

    pub fn size(&self) -> usize { self.size }

    pub fn pixels(&self) -> &[f64] { &self.pixels }

    /// Shifts and scales the patch to zero mean and unit standard deviation.
    /// A flat patch keeps a divisor of one.
    pub fn normalized(mut self) -> Self {
        let n = self.pixels.len() as f64;
        if n == 0.0 {
            return self;
        }
        let mean = self.pixels.iter().sum::<f64>() / n;
        let var = self.pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let dev = if var == 0.0 { 1.0 } else { var.sqrt() };
        for p in self.pixels.iter_mut() {
            *p = (*p - mean) / dev;
        }
        self
    }

    /// Mirrors the patch around its vertical axis
    pub fn mirrored(&self) -> Self {
        let n = self.size;
        let mut pixels = vec![0.0; n * n];
        for y in 0..n {
            for x in 0..n {
                pixels[(n - 1 - x) + n * y] = self.pixels[x + n * y];
            }
        }
        Self { size: n, pixels }
    }

    /// Rotates the patch clockwise by 90 degrees
    pub fn rotated_90(&self) -> Self {
        let n = self.size;
        let mut pixels = vec![0.0; n * n];
        for y in 0..n {
            for x in 0..n {
                pixels[(n - 1 - y) + n * x] = self.pixels[x + n * y];
            }
        }
        Self { size: n, pixels }
    }

    /// Transforms the patch into its integral image
    pub fn integral(&self) -> IntegralImage {
        IntegralImage::new(&self.pixels, self.size, self.size)
    }
}

/// A view of one square window inside an integral image together with the
/// local statistics used to normalize feature values
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub image: &'a IntegralImage,
    pub x: usize,
    pub y: usize,
    pub mean: f64,
    pub deviation: f64,
}
impl<'a> Window<'a> {
    /// A whole pre-normalized training sample
    pub fn sample(image: &'a IntegralImage) -> Self {
        Self {
            image,
            x: 0,
            y: 0,
            mean: 0.0,
            deviation: 1.0,
        }
    }

    /// A `size` by `size` window of a larger image, normalized with the
    /// statistics read from the plain and squared integral images
    pub fn normalized(
        image: &'a IntegralImage,
        squared: &IntegralImage,
        x: usize,
        y: usize,
        size: usize,
    ) -> Self {
        let area = (size * size) as f64;
        let mean = image.rect_sum(x, y, size, size) / area;
        let var = squared.rect_sum(x, y, size, size) / area - mean * mean;
        Self {
            image,
            x,
            y,
            mean,
            deviation: var.max(0.0).sqrt(),
        }
    }
}

/// Draws a rectangle over an image
pub fn draw_rectangle(img: &mut RgbImage, d: &Detection) {
    let pixel = Rgb::from(DETECTION_COLOR);
    let (w, h) = (img.width() as usize, img.height() as usize);
    if d.x >= w || d.y >= h || d.size == 0 {
        return;
    }
    let right = (d.x + d.size - 1).min(w - 1);
    let bottom = (d.y + d.size - 1).min(h - 1);
    for x in d.x..=right {
        img.put_pixel(x as u32, d.y as u32, pixel);
        img.put_pixel(x as u32, bottom as u32, pixel);
    }
    for y in d.y..=bottom {
        img.put_pixel(d.x as u32, y as u32, pixel);
        img.put_pixel(right as u32, y as u32, pixel);
    }
}

/// Returns an RGB copy of `img` with every detection outlined
pub fn annotate(img: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut out = image::DynamicImage::ImageLuma8(img.clone()).to_rgb8();
    for d in detections {
        draw_rectangle(&mut out, d);
    }
    out
}
