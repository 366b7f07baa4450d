//! Training and detection configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::*;

/// Window sizes a stored model may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBounds {
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ModelBounds {
    fn default() -> Self {
        Self {
            min_size: MIN_MODEL_SIZE,
            max_size: MAX_MODEL_SIZE,
        }
    }
}

impl ModelBounds {
    pub fn contains(&self, size: usize) -> bool { (self.min_size..=self.max_size).contains(&size) }
}

/// Cascade training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Side length of the square training samples
    pub window_size: usize,
    /// Number of stages in the cascade
    pub stages: usize,
    /// False positive rate targeted by the whole cascade
    pub target_false_positive_rate: f64,
    /// Fraction of positives a single stage may reject
    pub max_false_negative_rate: f64,
    /// Hard negatives gathered before each stage, 0 means one per positive
    pub negatives_per_stage: usize,
    /// Also try the 90° rotations of each negative while bootstrapping
    pub rotate_negatives: bool,
    /// Add a mirrored copy of every positive
    pub mirror_positives: bool,
    /// Upper bound on boosting rounds per stage
    pub max_rounds_per_stage: usize,
    /// Seed for shuffling sample sources
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            stages: CASCADE_SIZE,
            target_false_positive_rate: TARGET_FALSE_POS,
            max_false_negative_rate: MAX_FALSE_NEG,
            negatives_per_stage: 0,
            rotate_negatives: false,
            mirror_positives: false,
            max_rounds_per_stage: MAX_ROUNDS_PER_LAYER,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    /// Load configuration from a JSON file, missing fields keep defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.window_size < MIN_TRAINING_SIZE || self.window_size > MAX_MODEL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "window size must be between {} and {}, got {}",
                MIN_TRAINING_SIZE, MAX_MODEL_SIZE, self.window_size
            )));
        }
        if self.stages == 0 {
            return Err(Error::InvalidConfig(
                "cascade must have at least one stage".to_string(),
            ));
        }
        if !(self.target_false_positive_rate > 0.0 && self.target_false_positive_rate <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "target false positive rate must be in (0, 1], got {}",
                self.target_false_positive_rate
            )));
        }
        if !(0.0..1.0).contains(&self.max_false_negative_rate) {
            return Err(Error::InvalidConfig(format!(
                "max false negative rate must be in [0, 1), got {}",
                self.max_false_negative_rate
            )));
        }
        if self.max_rounds_per_stage == 0 {
            return Err(Error::InvalidConfig(
                "round budget per stage must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a model trained with this window loads under `bounds`.
    /// Windows below [`MIN_MODEL_SIZE`] train fine but need a detection
    /// configuration with a lower `min_size` to be loaded again.
    pub fn loadable_with(&self, bounds: &ModelBounds) -> bool { bounds.contains(self.window_size) }
}

/// Sliding-window detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Window growth between scales
    pub scale_step: f64,
    /// Slide step as a fraction of the current window size
    pub slide_step: f64,
    /// Multiplier applied to every stage threshold of a loaded model
    pub threshold_scale: f64,
    /// Window sizes accepted when loading a model
    pub bounds: ModelBounds,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scale_step: SCALE_STEP,
            slide_step: SLIDE_STEP,
            threshold_scale: 1.0,
            bounds: ModelBounds::default(),
        }
    }
}

impl DetectionConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale_step > 1.0 && self.scale_step.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "scale step must be greater than 1, got {}",
                self.scale_step
            )));
        }
        if !(self.slide_step >= 0.0 && self.slide_step.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "slide step must be non-negative, got {}",
                self.slide_step
            )));
        }
        if !self.threshold_scale.is_finite() {
            return Err(Error::InvalidConfig(
                "threshold scale must be finite".to_string(),
            ));
        }
        if self.bounds.min_size == 0 || self.bounds.min_size > self.bounds.max_size {
            return Err(Error::InvalidConfig(format!(
                "invalid model size bounds [{}, {}]",
                self.bounds.min_size, self.bounds.max_size
            )));
        }
        Ok(())
    }
}
