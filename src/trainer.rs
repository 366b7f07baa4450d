//! AdaBoost stage training and cascade orchestration
//!
//! Each stage is boosted until its false positive rate on the current
//! negative pool drops below the stage target. Between stages the negative
//! pool is refilled with hard negatives, samples the cascade so far still
//! accepts, and both pools are pruned to what the cascade accepts, so every
//! stage only sees the survivors of all stages before it.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::*;

/// Per-stage false positive targets for `stages` stages whose product is
/// `overall`.
///
/// The first two stages get fixed targets of 0.5 and 0.25, the rest share
/// what is left equally.
pub fn target_false_positive_rates(stages: usize, overall: f64) -> Vec<f64> {
    match stages {
        0 => Vec::new(),
        1 => vec![overall],
        2 => vec![FIRST_LAYER_FALSE_POS, overall / FIRST_LAYER_FALSE_POS],
        _ => {
            let fixed = FIRST_LAYER_FALSE_POS * SECOND_LAYER_FALSE_POS;
            let rest = (overall / fixed).powf(1.0 / (stages - 2) as f64);
            let mut rates = vec![FIRST_LAYER_FALSE_POS, SECOND_LAYER_FALSE_POS];
            rates.resize(stages, rest);
            rates
        }
    }
}

/// A boosted stage and the false positive rate it reached
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: StrongClassifier,
    pub false_positive_rate: f64,
    /// False when the round budget ran out before the target was reached
    pub target_met: bool,
}

/// Best stump of one boosting round
struct Candidate {
    index: usize,
    wc: WeakClassifier,
    error: f64,
}

/// Fits a stump for every feature and keeps the one with the lowest
/// weighted error, the earliest feature winning ties
fn best_weak_classifier(
    features: &[Feature],
    positives: &[IntegralImage],
    negatives: &[IntegralImage],
    weights: &[f64],
) -> Option<Candidate> {
    let samples = || {
        positives
            .iter()
            .map(|ii| (ii, true))
            .chain(negatives.iter().map(|ii| (ii, false)))
            .zip(weights)
    };
    features
        .par_iter()
        .enumerate()
        .map_init(
            || Vec::with_capacity(weights.len()),
            |tagged, (index, &feature)| {
                tagged.clear();
                tagged.extend(samples().map(|((ii, positive), &weight)| TaggedValue {
                    value: feature.value(ii, 0, 0),
                    positive,
                    weight,
                }));
                WeakClassifier::fit_tagged(feature, tagged)
                    .map(|(wc, error)| Candidate { index, wc, error })
            },
        )
        .flatten()
        .min_by(|a, b| a.error.total_cmp(&b.error).then(a.index.cmp(&b.index)))
}

/// Boosts one stage on pre-normalized integral samples.
///
/// Stops as soon as the stage accepts no more than `target_fpr` of the
/// negatives, which includes the case where it accepts none.
pub fn boost_stage(
    features: &[Feature],
    positives: &[IntegralImage],
    negatives: &[IntegralImage],
    target_fpr: f64,
    max_false_neg: f64,
    max_rounds: usize,
) -> Result<StageOutcome> {
    if features.is_empty() {
        return Err(Error::TrainingAborted("feature set is empty".to_string()));
    }
    if positives.is_empty() || negatives.is_empty() {
        return Err(Error::TrainingAborted(format!(
            "sample pool is empty ({} positives, {} negatives)",
            positives.len(),
            negatives.len()
        )));
    }

    let (num_pos, num_neg) = (positives.len(), negatives.len());
    let mut weights: Vec<f64> = std::iter::repeat(1.0 / (2 * num_pos) as f64)
        .take(num_pos)
        .chain(std::iter::repeat(1.0 / (2 * num_neg) as f64).take(num_neg))
        .collect();

    let mut sc = StrongClassifier::new();
    let mut fpr = 1.0;
    for round in 0..max_rounds {
        normalize_weights(&mut weights);

        let best = best_weak_classifier(features, positives, negatives, &weights)
            .ok_or_else(|| {
                Error::TrainingAborted("no feature separates the samples".to_string())
            })?;
        if best.error >= 0.5 {
            return Err(Error::TrainingAborted(format!(
                "best weak classifier has error {:.4}, no better than chance",
                best.error
            )));
        }

        // Correctly classified samples lose weight
        let error = best.error.max(MIN_WEAK_ERROR);
        let beta = error / (1.0 - error);
        let labelled = positives
            .iter()
            .map(|ii| (ii, true))
            .chain(negatives.iter().map(|ii| (ii, false)));
        for ((ii, positive), weight) in labelled.zip(weights.iter_mut()) {
            if best.wc.classify(best.wc.feature_value(&Window::sample(ii))) == positive {
                *weight *= beta;
            }
        }

        sc.push(best.wc, (1.0 / beta).ln());
        sc.calibrate_threshold(positives, max_false_neg);
        fpr = sc.false_positive_rate(negatives);
        debug!(
            round = round + 1,
            feature = best.index,
            error = best.error,
            threshold = sc.threshold,
            fpr,
            "Added weak classifier"
        );

        if fpr <= target_fpr {
            return Ok(StageOutcome {
                stage: sc,
                false_positive_rate: fpr,
                target_met: true,
            });
        }
    }

    Ok(StageOutcome {
        stage: sc,
        false_positive_rate: fpr,
        target_met: false,
    })
}

/// Normalize the weights so they sum to one
fn normalize_weights(weights: &mut [f64]) {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
}

/// Tops up `pool` with negatives from `source` that `cascade` wrongly
/// accepts until it holds `quota` samples or the source runs dry.
///
/// With `rotate`, each of the four 90° rotations of a negative is tried and
/// every accepted orientation is kept.
pub fn bootstrap_negatives<I>(
    cascade: &Cascade,
    source: &mut I,
    pool: &mut Vec<IntegralImage>,
    quota: usize,
    rotate: bool,
) where
    I: Iterator<Item = Patch>,
{
    let orientations = if rotate { 4 } else { 1 };
    let mut drawn = 0usize;
    while pool.len() < quota {
        let Some(patch) = source.next() else { break };
        if patch.size() != cascade.size() {
            continue;
        }
        drawn += 1;
        let mut patch = patch.normalized();
        for turn in 0..orientations {
            if turn > 0 {
                patch = patch.rotated_90();
            }
            let ii = patch.integral();
            if cascade.classify(&Window::sample(&ii)) {
                pool.push(ii);
                if pool.len() == quota {
                    break;
                }
            }
        }
    }
    debug!(drawn, pool = pool.len(), quota, "Bootstrapped negatives");
}

/// Yields the patches of a fallible source until its first error, which
/// is kept for the caller
struct UntilError<I> {
    inner: I,
    error: Option<Error>,
}
impl<I: Iterator<Item = Result<Patch>>> Iterator for UntilError<I> {
    type Item = Patch;

    fn next(&mut self) -> Option<Patch> {
        if self.error.is_some() {
            return None;
        }
        match self.inner.next()? {
            Ok(patch) => Some(patch),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

/// How training ended
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingStatus {
    /// Every configured stage was trained
    Complete,
    /// The negative source had no sample left that the cascade accepts
    NegativesExhausted,
    /// Training stopped early; the cascade holds the stages built so far
    Incomplete(String),
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub cascade: Cascade,
    pub status: TrainingStatus,
}

/// Trains cascades with a validated configuration
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}
impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig { &self.config }

    /// Trains a cascade from raw positive patches and a stream of raw
    /// negative patches. Patches of the wrong size are skipped.
    pub fn train<N>(&self, positives: Vec<Patch>, negatives: N) -> Result<TrainingOutcome>
    where
        N: IntoIterator<Item = Patch>,
    {
        self.try_train(positives, negatives.into_iter().map(Ok))
    }

    /// Like [`Trainer::train`] over a fallible negative source, such as
    /// [`samples::sample_lines`]. The first error the source yields aborts
    /// training and is returned as is.
    pub fn try_train<N>(&self, positives: Vec<Patch>, negatives: N) -> Result<TrainingOutcome>
    where
        N: IntoIterator<Item = Result<Patch>>,
    {
        let config = &self.config;
        let size = config.window_size;

        let mut positives: Vec<Patch> = positives
            .into_iter()
            .filter(|p| p.size() == size)
            .map(Patch::normalized)
            .collect();
        if positives.is_empty() {
            return Err(Error::NoTrainingData(format!(
                "no positive samples of size {}x{}",
                size, size
            )));
        }
        if config.mirror_positives {
            let mirrors: Vec<Patch> = positives.iter().map(Patch::mirrored).collect();
            positives.extend(mirrors);
        }
        let mut positives: Vec<IntegralImage> = positives.iter().map(Patch::integral).collect();

        let quota = if config.negatives_per_stage == 0 {
            positives.len()
        } else {
            config.negatives_per_stage
        };

        let features = Feature::generate(size, size);
        let targets = target_false_positive_rates(config.stages, config.target_false_positive_rate);
        info!(
            positives = positives.len(),
            features = features.len(),
            stages = targets.len(),
            "Building cascade"
        );

        let mut source = UntilError {
            inner: negatives.into_iter(),
            error: None,
        };
        let mut negatives = Vec::<IntegralImage>::new();
        let mut cascade = Cascade::new(size);
        let mut status = TrainingStatus::Complete;
        for (k, &target) in targets.iter().enumerate() {
            bootstrap_negatives(
                &cascade,
                &mut source,
                &mut negatives,
                quota,
                config.rotate_negatives,
            );
            if let Some(err) = source.error.take() {
                return Err(err);
            }
            if negatives.is_empty() {
                info!(stage = k + 1, "No hard negatives left, stopping");
                status = TrainingStatus::NegativesExhausted;
                break;
            }

            info!(
                stage = k + 1,
                target,
                positives = positives.len(),
                negatives = negatives.len(),
                "Building strong classifier"
            );
            let outcome = match boost_stage(
                &features,
                &positives,
                &negatives,
                target,
                config.max_false_negative_rate,
                config.max_rounds_per_stage,
            ) {
                Ok(outcome) => outcome,
                Err(err) if !cascade.is_empty() => {
                    warn!(stage = k + 1, error = %err, "Stage failed, keeping partial cascade");
                    status = TrainingStatus::Incomplete(err.to_string());
                    break;
                }
                Err(err) => return Err(err),
            };
            info!(
                stage = k + 1,
                weak = outcome.stage.len(),
                fpr = outcome.false_positive_rate,
                "Strong classifier done"
            );

            let target_met = outcome.target_met;
            cascade.push(outcome.stage);

            // Later stages only train on what the cascade still accepts
            cascade.retain_accepted(&mut positives);
            cascade.retain_accepted(&mut negatives);

            if !target_met {
                warn!(
                    stage = k + 1,
                    rounds = config.max_rounds_per_stage,
                    "Round budget exhausted before reaching the stage target"
                );
                status = TrainingStatus::Incomplete(format!(
                    "stage {} exhausted its round budget",
                    k + 1
                ));
                break;
            }
            if positives.is_empty() {
                status = TrainingStatus::Incomplete("every positive was rejected".to_string());
                break;
            }
        }

        Ok(TrainingOutcome { cascade, status })
    }
}
