use std::fmt;

use crate::*;

/// An AND-chain of strong classifiers sharing one square window size.
///
/// Every stage was trained on the samples that survived all stages before
/// it, so stages are always evaluated in the order they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    size: usize,
    stages: Vec<StrongClassifier>,
}
impl Cascade {
    /// Creates an empty cascade, which accepts every window
    pub fn new(size: usize) -> Cascade {
        Cascade {
            size,
            stages: Vec::new(),
        }
    }

    pub fn from_stages(size: usize, stages: Vec<StrongClassifier>) -> Cascade {
        Cascade { size, stages }
    }

    /// Side length of the window the cascade evaluates
    pub fn size(&self) -> usize { self.size }

    pub fn stages(&self) -> &[StrongClassifier] { &self.stages }

    pub fn len(&self) -> usize { self.stages.len() }

    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    /// Appends a trained stage
    pub fn push(&mut self, stage: StrongClassifier) { self.stages.push(stage); }

    /// Fraction of negative samples accepted by every stage
    pub fn false_positive_rate(&self, negatives: &[IntegralImage]) -> f64 {
        self.acceptance_rate(negatives)
    }

    /// Rescales the window and every stage for a window `factor` times larger
    pub fn scale(&mut self, factor: f64) {
        self.size = (self.size as f64 * factor) as usize;
        for stage in self.stages.iter_mut() {
            stage.scale(factor);
        }
    }

    pub fn scaled(&self, factor: f64) -> Cascade {
        let mut cascade = self.clone();
        cascade.scale(factor);
        cascade
    }

    /// Multiplies every stage threshold by `value`
    pub fn scale_thresholds(&mut self, value: f64) {
        for stage in self.stages.iter_mut() {
            stage.scale_threshold(value);
        }
    }
}

impl Classifier for Cascade {
    /// Rejects at the first failing stage
    fn classify(&self, window: &Window<'_>) -> bool {
        self.stages.iter().all(|sc| sc.classify(window))
    }
}

impl fmt::Display for Cascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.size, self.stages.len())?;
        for stage in &self.stages {
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}
