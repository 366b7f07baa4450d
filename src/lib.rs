//! Viola-Jones object detection: boosted Haar feature cascades, their
//! training, a plain text model format and a multi-scale detector.

mod cascade;
mod classifier;
pub mod codec;
mod config;
mod constants;
mod detector;
mod error;
mod feature;
mod images;
pub mod samples;
mod strong_classifier;
mod trainer;
mod weak_classifier;

pub use cascade::Cascade;
pub use classifier::Classifier;
pub use config::{DetectionConfig, ModelBounds, TrainingConfig};
pub use constants::*;
pub use detector::{Detection, Detector};
pub use error::{Error, Result};
pub use feature::{Feature, FeatureKind};
pub use images::{annotate, draw_rectangle, gray_values, IntegralImage, Patch, Window};
pub use strong_classifier::StrongClassifier;
pub use trainer::{
    boost_stage, bootstrap_negatives, target_false_positive_rates, StageOutcome, Trainer,
    TrainingOutcome, TrainingStatus,
};
pub use weak_classifier::{Polarity, TaggedValue, WeakClassifier};
