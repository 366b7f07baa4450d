use rayon::prelude::*;

use crate::{IntegralImage, Window};

/// Anything that accepts or rejects a window
pub trait Classifier: Sync {
    fn classify(&self, window: &Window<'_>) -> bool;

    /// Fraction of pre-normalized samples that are accepted, zero for an
    /// empty set
    fn acceptance_rate(&self, samples: &[IntegralImage]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let accepted = samples
            .par_iter()
            .filter(|ii| self.classify(&Window::sample(ii)))
            .count();
        accepted as f64 / samples.len() as f64
    }

    /// Drops every sample that is rejected, keeping the order of the rest
    fn retain_accepted(&self, samples: &mut Vec<IntegralImage>) {
        let keep: Vec<bool> = samples
            .par_iter()
            .map(|ii| self.classify(&Window::sample(ii)))
            .collect();
        let mut keep = keep.into_iter();
        samples.retain(|_| keep.next().unwrap_or(false));
    }
}
