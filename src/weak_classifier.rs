use std::fmt;

use crate::{Feature, Window};

/// Which side of the threshold is labelled positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Values below the threshold are positive
    Below,
    /// Values at or above the threshold are positive
    Above,
}
impl Polarity {
    /// Bit stored in model files
    pub const fn bit(self) -> u8 {
        match self {
            Polarity::Below => 1,
            Polarity::Above => 0,
        }
    }

    pub const fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            1 => Some(Polarity::Below),
            0 => Some(Polarity::Above),
            _ => None,
        }
    }
}

/// A feature value tagged with the label and boosting weight of the sample
/// it was computed on
#[derive(Debug, Clone, Copy)]
pub struct TaggedValue {
    pub value: f64,
    pub positive: bool,
    pub weight: f64,
}

/// A decision stump over a single feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakClassifier {
    pub feature: Feature,
    pub threshold: f64,
    pub polarity: Polarity,
}
impl WeakClassifier {
    pub const fn new(feature: Feature, threshold: f64, polarity: Polarity) -> Self {
        Self {
            feature,
            threshold,
            polarity,
        }
    }

    /// Fits a stump to feature values where the first `positive_count`
    /// entries belong to positive samples and the rest to negatives.
    ///
    /// Returns the stump with the lowest weighted error together with that
    /// error, or `None` when every value is identical.
    pub fn fit(
        feature: Feature,
        values: &[f64],
        positive_count: usize,
        weights: &[f64],
    ) -> Option<(Self, f64)> {
        debug_assert_eq!(values.len(), weights.len());
        let mut tagged: Vec<TaggedValue> = values
            .iter()
            .zip(weights)
            .enumerate()
            .map(|(i, (&value, &weight))| TaggedValue {
                value,
                positive: i < positive_count,
                weight,
            })
            .collect();
        Self::fit_tagged(feature, &mut tagged)
    }

    /// Same as [`WeakClassifier::fit`] over an already tagged buffer. The
    /// buffer is sorted in place so callers can reuse its allocation.
    pub fn fit_tagged(feature: Feature, tagged: &mut [TaggedValue]) -> Option<(Self, f64)> {
        tagged.sort_unstable_by(|a, b| a.value.total_cmp(&b.value));

        let (total_pos, total_neg) = tagged.iter().fold((0.0, 0.0), |(p, n), t| {
            if t.positive {
                (p + t.weight, n)
            } else {
                (p, n + t.weight)
            }
        });

        // Weighted mass of each label at or below the current cut
        let mut pos_below = 0.0;
        let mut neg_below = 0.0;
        let mut best: Option<(Self, f64)> = None;
        for pair in tagged.windows(2) {
            let (cur, next) = (pair[0], pair[1]);
            if cur.positive {
                pos_below += cur.weight;
            } else {
                neg_below += cur.weight;
            }
            // No threshold separates equal values
            if next.value == cur.value {
                continue;
            }

            let error_above = pos_below + (total_neg - neg_below);
            let error_below = neg_below + (total_pos - pos_below);
            let (error, polarity) = if error_above < error_below {
                (error_above, Polarity::Above)
            } else {
                (error_below, Polarity::Below)
            };

            if best.as_ref().map_or(true, |(_, e)| error < *e) {
                let threshold = cur.value + (next.value - cur.value) / 2.0;
                best = Some((Self::new(feature, threshold, polarity), error));
            }
        }
        best
    }

    /// Labels a normalized feature value
    #[inline]
    pub fn classify(&self, value: f64) -> bool {
        match self.polarity {
            Polarity::Below => value < self.threshold,
            Polarity::Above => value >= self.threshold,
        }
    }

    /// `+1` for a positive label and `-1` for a negative one
    #[inline]
    pub fn vote(&self, value: f64) -> f64 {
        if self.classify(value) {
            1.0
        } else {
            -1.0
        }
    }

    /// Feature value at a window, corrected for the window mean and divided
    /// by its deviation so it is comparable to values on normalized samples
    #[inline]
    pub fn feature_value(&self, window: &Window<'_>) -> f64 {
        let mut value = self.feature.value(window.image, window.x, window.y);
        value += self.feature.third_area() * window.mean;
        if window.deviation != 0.0 {
            value /= window.deviation;
        }
        value
    }

    #[inline]
    pub fn evaluate(&self, window: &Window<'_>) -> f64 { self.vote(self.feature_value(window)) }

    /// Feature values grow with area, so the threshold scales quadratically
    /// while the geometry scales linearly
    pub fn scale(&mut self, factor: f64) {
        self.threshold *= factor * factor;
        self.feature.scale(factor);
    }
}

impl fmt::Display for WeakClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.feature, self.threshold, self.polarity.bit())
    }
}
