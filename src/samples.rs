//! Reading training samples from text files and image directories

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, ImageFormat};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info, warn};

use crate::*;

/// Parses one sample line of `size * size` whitespace separated intensities.
/// Returns `None` for a line with the wrong number of values or a value that
/// is not a number.
pub fn parse_sample_line(line: &str, size: usize) -> Option<Patch> {
    let values = line
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()?;
    Patch::new(size, values)
}

/// Reads every valid sample of a sample file, skipping malformed lines
pub fn read_sample_file(path: &Path, size: usize) -> Result<Vec<Patch>> {
    let reader = BufReader::new(File::open(path)?);
    let mut patches = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_sample_line(&line, size) {
            Some(patch) => patches.push(patch),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, size, "Skipped malformed sample lines");
    }
    info!(path = %path.display(), samples = patches.len(), "Read samples");
    Ok(patches)
}

/// Lazily reads the samples of a sample file.
///
/// Meant for large negative files that are consumed only as far as
/// bootstrapping needs. Malformed lines are skipped like in
/// [`read_sample_file`], but a line that cannot be read, such as one that is
/// not UTF-8, is yielded as an error.
pub fn sample_lines(path: &Path, size: usize) -> Result<impl Iterator<Item = Result<Patch>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().filter_map(move |line| match line {
        Ok(line) => parse_sample_line(&line, size).map(Ok),
        Err(err) => Some(Err(Error::from(err))),
    }))
}

/// Image files of a directory in name order
fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && ImageFormat::from_path(&path).is_ok() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads every image of `dir` as a positive sample, resized to fill the
/// `size` by `size` window
pub fn load_object_dir(dir: &Path, size: usize) -> Result<Vec<Patch>> {
    let side = size as u32;
    let mut patches = Vec::new();
    for path in image_files(dir)? {
        let img = image::open(&path)?
            .resize_to_fill(side, side, FilterType::Triangle)
            .into_luma8();
        patches.extend(Patch::from_gray(&img));
    }
    info!(dir = %dir.display(), samples = patches.len(), "Loaded object images");
    Ok(patches)
}

/// Slices every image of `dir` into non-overlapping `size` by `size` tiles
/// and shuffles them with a generator seeded by `seed`.
///
/// Images smaller than one tile are skipped.
pub fn load_background_tiles(dir: &Path, size: usize, seed: u64) -> Result<Vec<Patch>> {
    let mut tiles = Vec::new();
    if size == 0 {
        return Ok(tiles);
    }
    let side = size as u32;
    for path in image_files(dir)? {
        let img = image::open(&path)?.into_luma8();
        let (w, h) = img.dimensions();
        if w < side || h < side {
            debug!(path = %path.display(), w, h, "Background image smaller than a tile");
            continue;
        }
        for y in (0..=h - side).step_by(size) {
            for x in (0..=w - side).step_by(size) {
                let tile = image::imageops::crop_imm(&img, x, y, side, side).to_image();
                tiles.extend(Patch::from_gray(&tile));
            }
        }
    }
    tiles.shuffle(&mut StdRng::seed_from_u64(seed));
    info!(dir = %dir.display(), tiles = tiles.len(), "Sliced background images");
    Ok(tiles)
}
