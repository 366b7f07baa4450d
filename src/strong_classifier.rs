use std::fmt;

use rayon::prelude::*;

use super::*;

/// A strong classifier (made up of weighted weak classifiers)
#[derive(Debug, Clone, PartialEq)]
pub struct StrongClassifier {
    pub wcs: Vec<WeakClassifier>,
    pub weights: Vec<f64>,
    pub threshold: f64,
}
impl StrongClassifier {
    /// Creates an empty strong classifier
    pub const fn new() -> Self {
        Self {
            wcs: Vec::new(),
            weights: Vec::new(),
            threshold: 0.0,
        }
    }

    /// Builds a strong classifier from already trained parts
    pub fn from_parts(wcs: Vec<WeakClassifier>, weights: Vec<f64>, threshold: f64) -> Self {
        debug_assert_eq!(wcs.len(), weights.len());
        Self {
            wcs,
            weights,
            threshold,
        }
    }

    /// Appends a weak classifier with its vote weight
    pub fn push(&mut self, wc: WeakClassifier, weight: f64) {
        self.wcs.push(wc);
        self.weights.push(weight);
    }

    pub fn len(&self) -> usize { self.wcs.len() }

    pub fn is_empty(&self) -> bool { self.wcs.is_empty() }

    /// Iterates over `(weak classifier, vote weight)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&WeakClassifier, f64)> {
        self.wcs.iter().zip(self.weights.iter().copied())
    }

    /// Weighted sum of the weak classifier votes for a window
    pub fn score(&self, window: &Window<'_>) -> f64 {
        self.iter().map(|(wc, weight)| weight * wc.evaluate(window)).sum()
    }

    /// Sets the threshold so that at most `max_false_neg` of the positive
    /// samples score below it.
    ///
    /// The threshold starts at the score with index `⌊max_false_neg · n⌋` in
    /// ascending order and moves down to the first score of a run of equal
    /// scores. When that index is past the last sample the threshold is left
    /// untouched.
    pub fn calibrate_threshold(&mut self, positives: &[IntegralImage], max_false_neg: f64) {
        let mut scores: Vec<f64> = positives
            .par_iter()
            .map(|ii| self.score(&Window::sample(ii)))
            .collect();
        scores.sort_unstable_by(f64::total_cmp);

        let mut index = (max_false_neg * scores.len() as f64) as usize;
        if index >= scores.len() {
            return;
        }
        while index > 0 && scores[index - 1] == scores[index] {
            index -= 1;
        }
        self.threshold = scores[index];
    }

    /// Fraction of negative samples currently accepted
    pub fn false_positive_rate(&self, negatives: &[IntegralImage]) -> f64 {
        self.acceptance_rate(negatives)
    }

    /// Rescales every weak classifier for a window `factor` times larger.
    /// The votes are ±1, so the stage threshold itself is unaffected.
    pub fn scale(&mut self, factor: f64) {
        for wc in self.wcs.iter_mut() {
            wc.scale(factor);
        }
    }

    /// Multiplies the acceptance threshold, trading detections for false
    /// positives
    pub fn scale_threshold(&mut self, value: f64) { self.threshold *= value; }
}
impl Default for StrongClassifier {
    fn default() -> Self { Self::new() }
}

impl Classifier for StrongClassifier {
    /// Classifies a window as being the object or not
    fn classify(&self, window: &Window<'_>) -> bool { self.score(window) >= self.threshold }
}

impl fmt::Display for StrongClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.len(), self.threshold)?;
        for (wc, weight) in self.iter() {
            writeln!(f, "{} {}", weight, wc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2x1 sample whose two-rectangle feature value is `v`
    fn pair(v: f64) -> IntegralImage { IntegralImage::new(&[0.0, v], 2, 1) }

    fn pair_feature() -> Feature { Feature::new(FeatureKind::TwoHorizontal, 0, 0, 2, 1) }

    /// One stump voting +1 for samples at or above 0.5
    fn single_stump(threshold: f64) -> StrongClassifier {
        let mut sc = StrongClassifier::new();
        sc.push(WeakClassifier::new(pair_feature(), 0.5, Polarity::Above), 1.0);
        sc.threshold = threshold;
        sc
    }

    #[test]
    fn accepts_iff_sum_reaches_threshold() {
        let ii = pair(1.0);
        let window = Window::sample(&ii);
        let mut sc = StrongClassifier::new();
        sc.push(WeakClassifier::new(pair_feature(), 0.5, Polarity::Above), 0.75);
        sc.push(WeakClassifier::new(pair_feature(), 0.5, Polarity::Below), 0.25);
        assert_eq!(sc.score(&window), 0.5);
        sc.threshold = 0.5;
        assert!(sc.classify(&window));
        sc.threshold = 0.5 + 1e-9;
        assert!(!sc.classify(&window));
    }

    #[test]
    fn calibration_rejects_at_most_max_false_neg() {
        // Sample i scores 2i - 100, so all 100 scores are distinct
        let mut sc = StrongClassifier::new();
        for t in 0..100 {
            sc.push(WeakClassifier::new(pair_feature(), t as f64 + 0.5, Polarity::Above), 1.0);
        }
        let positives: Vec<IntegralImage> = (0..100).map(|i| pair(i as f64)).collect();
        sc.calibrate_threshold(&positives, 0.1);
        let rejected = positives
            .iter()
            .filter(|ii| !sc.classify(&Window::sample(ii)))
            .count();
        assert!(rejected <= 10, "rejected {}", rejected);
        assert_eq!(rejected, 10);
    }

    #[test]
    fn calibration_walks_down_through_ties() {
        let mut sc = single_stump(0.0);
        // Two samples score -1, eight score +1
        let positives: Vec<IntegralImage> = [0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
            .iter()
            .map(|&v| pair(v))
            .collect();
        // Index 5 scores +1; walking down stops at index 2
        sc.calibrate_threshold(&positives, 0.5);
        assert_eq!(sc.threshold, 1.0);
        assert_eq!(sc.false_positive_rate(&positives), 0.8);
    }

    #[test]
    fn calibration_boundary_at_index_zero() {
        let mut sc = single_stump(100.0);
        let positives = vec![pair(1.0), pair(0.0), pair(1.0)];
        sc.calibrate_threshold(&positives, 0.0);
        // The lowest score becomes the threshold, nothing is rejected
        assert_eq!(sc.threshold, -1.0);
        assert_eq!(sc.acceptance_rate(&positives), 1.0);

        // A run of ties stops at index 0
        sc.calibrate_threshold(&[pair(1.0), pair(1.0), pair(1.0)], 0.5);
        assert_eq!(sc.threshold, 1.0);
    }

    #[test]
    fn calibration_past_the_end_keeps_threshold() {
        let mut sc = single_stump(42.0);
        sc.calibrate_threshold(&[pair(1.0), pair(2.0)], 1.0);
        assert_eq!(sc.threshold, 42.0);
        sc.calibrate_threshold(&[], 0.1);
        assert_eq!(sc.threshold, 42.0);
    }

    #[test]
    fn scale_touches_weak_thresholds_only() {
        let mut sc = single_stump(0.7);
        sc.wcs[0].threshold = 2.0;
        sc.scale(3.0);
        assert_eq!(sc.threshold, 0.7);
        assert_eq!(sc.wcs[0].threshold, 18.0);
        assert_eq!((sc.wcs[0].feature.w, sc.wcs[0].feature.h), (6, 3));
        sc.scale_threshold(2.0);
        assert_eq!(sc.threshold, 1.4);
    }

    #[test]
    fn display_lists_members() {
        let sc = single_stump(1.0);
        assert_eq!(sc.to_string(), "1 1\n1 0 2 1 0 0 0.5 0\n");
    }
}
