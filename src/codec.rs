//! Plain text model format
//!
//! ```text
//! <window size> <stage count>
//! <weak count> <stage threshold>
//! <vote weight> <feature type> <w> <h> <x> <y> <weak threshold> <polarity bit>
//! ...
//! ```
//!
//! Tokens are whitespace separated, so line breaks only matter to readers.
//! Floats use the shortest representation that parses back to the same
//! value, which makes save followed by load exact.

use std::fs;
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use tracing::info;

use crate::*;

/// Serializes a cascade to the model format
pub fn encode(cascade: &Cascade) -> String { cascade.to_string() }

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    read: usize,
}
impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
            read: 0,
        }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.inner.next().ok_or_else(|| {
            Error::ModelCorrupt(format!(
                "model ends after {} tokens, expected {}",
                self.read, what
            ))
        })?;
        self.read += 1;
        token.parse().map_err(|_| {
            Error::ModelCorrupt(format!(
                "token {} ({:?}) is not a valid {}",
                self.read, token, what
            ))
        })
    }

    fn next_finite(&mut self, what: &str) -> Result<f64> {
        let value: f64 = self.next(what)?;
        if !value.is_finite() {
            return Err(Error::ModelCorrupt(format!(
                "token {} is not a finite {}",
                self.read, what
            )));
        }
        Ok(value)
    }
}

/// Parses a cascade and checks its window size against `bounds`
pub fn decode(text: &str, bounds: &ModelBounds) -> Result<Cascade> {
    let mut tokens = Tokens::new(text);
    let size: usize = tokens.next("window size")?;
    let stage_count: usize = tokens.next("stage count")?;
    if !bounds.contains(size) {
        return Err(Error::ModelOutOfRange(format!(
            "window size {} outside [{}, {}]",
            size, bounds.min_size, bounds.max_size
        )));
    }
    if stage_count == 0 {
        return Err(Error::ModelOutOfRange("model has no stages".to_string()));
    }

    let mut stages = Vec::new();
    for _ in 0..stage_count {
        let weak_count: usize = tokens.next("weak classifier count")?;
        let threshold = tokens.next_finite("stage threshold")?;
        let mut stage = StrongClassifier::new();
        stage.threshold = threshold;
        for _ in 0..weak_count {
            let weight = tokens.next_finite("vote weight")?;
            let wc = decode_weak(&mut tokens, size)?;
            stage.push(wc, weight);
        }
        stages.push(stage);
    }

    if tokens.inner.next().is_some() {
        return Err(Error::ModelCorrupt(format!(
            "unexpected data after token {}",
            tokens.read
        )));
    }
    Ok(Cascade::from_stages(size, stages))
}

fn decode_weak(tokens: &mut Tokens<'_>, size: usize) -> Result<WeakClassifier> {
    let kind = FeatureKind::from_code(tokens.next("feature type")?)?;
    let w: usize = tokens.next("feature width")?;
    let h: usize = tokens.next("feature height")?;
    let x: usize = tokens.next("feature x")?;
    let y: usize = tokens.next("feature y")?;
    let inside =
        |start: usize, extent: usize| start.checked_add(extent).map_or(false, |end| end <= size);
    if !inside(x, w) || !inside(y, h) {
        return Err(Error::ModelCorrupt(format!(
            "feature {}x{} at ({}, {}) leaves the {}x{} window",
            w, h, x, y, size, size
        )));
    }
    let threshold = tokens.next_finite("weak threshold")?;
    let bit: u8 = tokens.next("polarity bit")?;
    let polarity = Polarity::from_bit(bit)
        .ok_or_else(|| Error::ModelCorrupt(format!("polarity bit must be 0 or 1, got {}", bit)))?;
    Ok(WeakClassifier::new(
        Feature::new(kind, x, y, w, h),
        threshold,
        polarity,
    ))
}

/// Writes a cascade to `path`. A failed write may leave a partial file.
pub fn save(cascade: &Cascade, path: &Path) -> Result<()> {
    fs::write(path, encode(cascade))?;
    info!(path = %path.display(), stages = cascade.len(), "Saved cascade");
    Ok(())
}

/// Reads a cascade from `path`
pub fn load(path: &Path, bounds: &ModelBounds) -> Result<Cascade> {
    let text = fs::read_to_string(path).map_err(|source| Error::ModelNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let cascade = decode(&text, bounds)?;
    info!(
        path = %path.display(),
        size = cascade.size(),
        stages = cascade.len(),
        "Loaded cascade"
    );
    Ok(cascade)
}
