use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use haar_cascade::{
    annotate, codec, samples, Cascade, Classifier, DetectionConfig, Detector, IntegralImage,
    ModelBounds, Patch, Trainer, TrainingConfig, TrainingStatus,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "haar-cascade")]
#[command(about = "Train Haar feature cascades and detect objects with them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every boosting round and scanned scale
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a cascade and save it as a model file
    Train {
        /// Model file to write
        model: PathBuf,

        /// Positive samples: a sample text file or a directory of images
        positives: PathBuf,

        /// Negative samples: a sample text file or a directory of background
        /// images to slice
        negatives: PathBuf,

        /// JSON training configuration, flags override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Side length of the square training window. Models below 21 only
        /// load with a detection config whose `bounds.min_size` allows them
        #[arg(long)]
        window_size: Option<usize>,

        /// Number of stages
        #[arg(long)]
        stages: Option<usize>,

        /// Overall false positive rate target
        #[arg(long)]
        target_fpr: Option<f64>,

        /// Fraction of positives each stage may reject
        #[arg(long)]
        max_fnr: Option<f64>,

        /// Hard negatives per stage, 0 for one per positive
        #[arg(long)]
        negatives_per_stage: Option<usize>,

        /// Boosting round budget per stage
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Also bootstrap the rotations of each negative
        #[arg(long)]
        rotate: bool,

        /// Add a mirrored copy of every positive
        #[arg(long)]
        mirror: bool,

        /// Seed for shuffling background tiles
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Detect objects in an image
    Detect {
        /// Model file to load
        model: PathBuf,

        /// Image to scan
        image: PathBuf,

        /// Write a copy of the image with detections outlined
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write detections as JSON here instead of stdout
        #[arg(long)]
        json: Option<PathBuf>,

        /// JSON detection configuration, flags override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Window growth between scales
        #[arg(long)]
        scale_step: Option<f64>,

        /// Slide step as a fraction of the window size
        #[arg(long)]
        slide_step: Option<f64>,

        /// Multiplier for every stage threshold
        #[arg(long)]
        threshold_scale: Option<f64>,
    },

    /// Report how a model classifies labelled sample files
    Evaluate {
        /// Model file to load
        model: PathBuf,

        /// Sample text file of objects
        positives: PathBuf,

        /// Sample text file of non-objects
        negatives: PathBuf,

        /// JSON detection configuration providing the model size bounds
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Train {
            model,
            positives,
            negatives,
            config,
            window_size,
            stages,
            target_fpr,
            max_fnr,
            negatives_per_stage,
            max_rounds,
            rotate,
            mirror,
            seed,
        } => {
            let mut config = match config {
                Some(path) => TrainingConfig::from_json_file(&path)
                    .with_context(|| format!("Unable to read {}", path.display()))?,
                None => TrainingConfig::default(),
            };
            if let Some(v) = window_size {
                config.window_size = v;
            }
            if let Some(v) = stages {
                config.stages = v;
            }
            if let Some(v) = target_fpr {
                config.target_false_positive_rate = v;
            }
            if let Some(v) = max_fnr {
                config.max_false_negative_rate = v;
            }
            if let Some(v) = negatives_per_stage {
                config.negatives_per_stage = v;
            }
            if let Some(v) = max_rounds {
                config.max_rounds_per_stage = v;
            }
            if let Some(v) = seed {
                config.seed = v;
            }
            config.rotate_negatives |= rotate;
            config.mirror_positives |= mirror;
            train(config, &model, &positives, &negatives)
        }
        Commands::Detect {
            model,
            image,
            output,
            json,
            config,
            scale_step,
            slide_step,
            threshold_scale,
        } => {
            let mut config = detection_config(config.as_deref())?;
            if let Some(v) = scale_step {
                config.scale_step = v;
            }
            if let Some(v) = slide_step {
                config.slide_step = v;
            }
            if let Some(v) = threshold_scale {
                config.threshold_scale = v;
            }
            detect(config, &model, &image, output.as_deref(), json.as_deref())
        }
        Commands::Evaluate {
            model,
            positives,
            negatives,
            config,
        } => {
            let config = detection_config(config.as_deref())?;
            evaluate(&config, &model, &positives, &negatives)
        }
    }
}

fn detection_config(path: Option<&Path>) -> anyhow::Result<DetectionConfig> {
    match path {
        Some(path) => DetectionConfig::from_json_file(path)
            .with_context(|| format!("Unable to read {}", path.display())),
        None => Ok(DetectionConfig::default()),
    }
}

/// Trains a cascade from sample files or image directories and saves it
fn train(config: TrainingConfig, model: &Path, positives: &Path, negatives: &Path) -> anyhow::Result<()> {
    let trainer = Trainer::new(config)?;
    let size = trainer.config().window_size;
    if !trainer.config().loadable_with(&ModelBounds::default()) {
        warn!(
            window_size = size,
            "The default model bounds will not load this model, pass detect and evaluate a config with matching bounds"
        );
    }

    let loaded = if positives.is_dir() {
        samples::load_object_dir(positives, size)
    } else {
        samples::read_sample_file(positives, size)
    };
    let positives =
        loaded.with_context(|| format!("Unable to read positives from {}", positives.display()))?;

    let source: Box<dyn Iterator<Item = haar_cascade::Result<Patch>>> = if negatives.is_dir() {
        let tiles = samples::load_background_tiles(negatives, size, trainer.config().seed)
            .with_context(|| format!("Unable to slice {}", negatives.display()))?;
        Box::new(tiles.into_iter().map(Ok))
    } else {
        let lines = samples::sample_lines(negatives, size)
            .with_context(|| format!("Unable to read negatives from {}", negatives.display()))?;
        Box::new(lines)
    };

    let outcome = trainer
        .try_train(positives, source)
        .with_context(|| format!("Training on negatives from {} failed", negatives.display()))?;
    match &outcome.status {
        TrainingStatus::Complete => info!(stages = outcome.cascade.len(), "Training complete"),
        TrainingStatus::NegativesExhausted => info!(
            stages = outcome.cascade.len(),
            "Training ended early, the cascade rejects every available negative"
        ),
        TrainingStatus::Incomplete(reason) => warn!(
            stages = outcome.cascade.len(),
            reason = %reason,
            "Training incomplete, saving partial cascade"
        ),
    }
    if outcome.cascade.is_empty() {
        bail!("No stage was trained, nothing to save");
    }

    codec::save(&outcome.cascade, model)
        .with_context(|| format!("Unable to write {}", model.display()))?;
    Ok(())
}

/// Scans one image and reports the detections as JSON
fn detect(
    config: DetectionConfig,
    model: &Path,
    input: &Path,
    output: Option<&Path>,
    json: Option<&Path>,
) -> anyhow::Result<()> {
    let cascade = codec::load(model, &config.bounds)?;
    let detector = Detector::new(config)?;

    let img = image::open(input)
        .with_context(|| format!("Unable to open {}", input.display()))?
        .into_luma8();
    let detections = detector.detect(&cascade, &img);
    info!(detections = detections.len(), "Found objects");

    if let Some(path) = output {
        annotate(&img, &detections)
            .save(path)
            .with_context(|| format!("Unable to write {}", path.display()))?;
    }

    let data = serde_json::to_string_pretty(&detections)?;
    match json {
        Some(path) => std::fs::write(path, &data)
            .with_context(|| format!("Unable to write {}", path.display()))?,
        None => println!("{}", data),
    }
    Ok(())
}

/// Prints the share of each labelled sample file the cascade accepts
fn evaluate(
    config: &DetectionConfig,
    model: &Path,
    positives: &Path,
    negatives: &Path,
) -> anyhow::Result<()> {
    let cascade = codec::load(model, &config.bounds)?;
    let prepare = |path: &Path| -> anyhow::Result<Vec<IntegralImage>> {
        let patches = samples::read_sample_file(path, cascade.size())
            .with_context(|| format!("Unable to read {}", path.display()))?;
        Ok(patches.into_iter().map(|p| p.normalized().integral()).collect())
    };
    let positives = prepare(positives)?;
    let negatives = prepare(negatives)?;

    report(&cascade, "objects", &positives);
    report(&cascade, "others", &negatives);
    Ok(())
}

fn report(cascade: &Cascade, label: &str, samples: &[IntegralImage]) {
    println!(
        "{}: {} samples, {:.2}% accepted",
        label,
        samples.len(),
        cascade.acceptance_rate(samples) * 100.0
    );
}
