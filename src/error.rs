//! Error types for cascade training, detection and model I/O

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Model file {path} not found or unreadable: {source}")]
    ModelNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model: {0}")]
    ModelCorrupt(String),

    #[error("Model out of range: {0}")]
    ModelOutOfRange(String),

    #[error("Invalid feature type: {0}")]
    FeatureTypeInvalid(i64),

    #[error("No training data: {0}")]
    NoTrainingData(String),

    #[error("Training aborted: {0}")]
    TrainingAborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
