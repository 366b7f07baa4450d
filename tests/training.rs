mod common;

use common::synthetic::{noise, objects, sized_noise, sized_objects, SIZE};
use haar_cascade::{
    Cascade, Classifier, IntegralImage, Patch, Trainer, TrainingConfig, TrainingStatus,
};

fn held_out(patches: Vec<Patch>) -> Vec<IntegralImage> {
    patches.into_iter().map(|p| p.normalized().integral()).collect()
}

fn config(stages: usize, target: f64) -> TrainingConfig {
    TrainingConfig {
        window_size: SIZE,
        stages,
        target_false_positive_rate: target,
        max_false_negative_rate: 0.1,
        max_rounds_per_stage: 50,
        ..Default::default()
    }
}

#[test]
fn single_stage_separates_squares_from_noise() {
    const WINDOW: usize = 20;
    let trainer = Trainer::new(TrainingConfig {
        window_size: WINDOW,
        ..config(1, 0.1)
    })
    .unwrap();
    let outcome = trainer
        .train(sized_objects(WINDOW, 100, 1), sized_noise(WINDOW, 300, 2))
        .unwrap();
    assert_eq!(outcome.status, TrainingStatus::Complete);
    assert_eq!(outcome.cascade.len(), 1);
    assert_eq!(outcome.cascade.size(), WINDOW);

    let positives = held_out(sized_objects(WINDOW, 100, 3));
    let negatives = held_out(sized_noise(WINDOW, 100, 4));
    let detection_rate = outcome.cascade.acceptance_rate(&positives);
    let fpr = outcome.cascade.false_positive_rate(&negatives);
    assert!(detection_rate >= 0.9, "detection rate {}", detection_rate);
    assert!(fpr <= 0.1, "false positive rate {}", fpr);
}

#[test]
fn later_stages_only_narrow_acceptance() {
    let trainer = Trainer::new(config(3, 0.01)).unwrap();
    let outcome = trainer.train(objects(100, 5), noise(1000, 6)).unwrap();
    assert!(!outcome.cascade.is_empty());

    let negatives = held_out(noise(200, 7));
    let first = Cascade::from_stages(SIZE, outcome.cascade.stages()[..1].to_vec());
    assert!(outcome.cascade.false_positive_rate(&negatives) <= first.false_positive_rate(&negatives));
}

#[test]
fn mirrored_positives_train() {
    let trainer = Trainer::new(TrainingConfig {
        mirror_positives: true,
        rotate_negatives: true,
        ..config(1, 0.2)
    })
    .unwrap();
    let outcome = trainer.train(objects(60, 8), noise(200, 9)).unwrap();
    assert_eq!(outcome.cascade.len(), 1);

    // The square is centred, so its mirror image is still an object
    let positives = held_out(objects(50, 10));
    assert!(outcome.cascade.acceptance_rate(&positives) >= 0.8);
}

#[test]
fn wrong_sized_positives_are_no_training_data() {
    let trainer = Trainer::new(TrainingConfig {
        window_size: SIZE + 1,
        ..config(1, 0.1)
    })
    .unwrap();
    let err = trainer.train(objects(10, 11), noise(10, 12)).unwrap_err();
    assert!(matches!(err, haar_cascade::Error::NoTrainingData(_)));
}
