use haar_cascade::Patch;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Side length of the synthetic training window
pub const SIZE: usize = 12;

/// Top left corner and side of the bright square inside a `size` patch,
/// the middle half of the window
pub fn square(size: usize) -> (usize, usize, usize) { (size / 4, size / 4, size / 2) }

pub fn rng(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

/// Dark noisy background with a bright noisy square, the "object"
pub fn object_pixels(rng: &mut StdRng) -> Vec<f64> { sized_object_pixels(SIZE, rng) }

pub fn sized_object_pixels(size: usize, rng: &mut StdRng) -> Vec<f64> {
    let (sx, sy, side) = square(size);
    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let inside = (sx..sx + side).contains(&x) && (sy..sy + side).contains(&y);
            pixels.push(if inside {
                rng.gen_range(0.8..1.0)
            } else {
                rng.gen_range(0.0..0.2)
            });
        }
    }
    pixels
}

/// Uniform noise, the "background"
pub fn sized_noise_pixels(size: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..size * size).map(|_| rng.gen_range(0.0..1.0)).collect()
}

pub fn objects(count: usize, seed: u64) -> Vec<Patch> { sized_objects(SIZE, count, seed) }

pub fn noise(count: usize, seed: u64) -> Vec<Patch> { sized_noise(SIZE, count, seed) }

pub fn sized_objects(size: usize, count: usize, seed: u64) -> Vec<Patch> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| Patch::new(size, sized_object_pixels(size, &mut rng)).expect("size * size pixels"))
        .collect()
}

pub fn sized_noise(size: usize, count: usize, seed: u64) -> Vec<Patch> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| Patch::new(size, sized_noise_pixels(size, &mut rng)).expect("size * size pixels"))
        .collect()
}

/// Writes patches in the sample text format, one per line
pub fn sample_text(patches: &[Patch]) -> String {
    patches
        .iter()
        .map(|p| {
            p.pixels()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
