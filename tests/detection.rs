mod common;

use common::synthetic::{noise, object_pixels, objects, rng, SIZE};
use haar_cascade::{
    annotate, Classifier, Detection, DetectionConfig, Detector, Trainer, TrainingConfig, Window,
    DETECTION_COLOR,
};
use image::{GrayImage, Luma, Rgb};
use rand::Rng;

const SCENE: usize = 48;

fn detector() -> Detector { Detector::new(DetectionConfig::default()).unwrap() }

fn trained() -> haar_cascade::Cascade {
    let trainer = Trainer::new(TrainingConfig {
        window_size: SIZE,
        stages: 1,
        target_false_positive_rate: 0.05,
        max_false_negative_rate: 0.05,
        max_rounds_per_stage: 50,
        ..Default::default()
    })
    .unwrap();
    trainer.train(objects(100, 31), noise(300, 32)).unwrap().cascade
}

/// Dark scene with `object` pasted at `(ox, oy)`
fn scene_with(object: &[f64], ox: usize, oy: usize) -> Vec<f64> {
    let mut rng = rng(33);
    let mut scene: Vec<f64> = (0..SCENE * SCENE).map(|_| rng.gen_range(0.0..0.2)).collect();
    for y in 0..SIZE {
        for x in 0..SIZE {
            scene[(ox + x) + SCENE * (oy + y)] = object[x + SIZE * y];
        }
    }
    scene
}

#[test]
fn finds_planted_object() {
    let cascade = trained();
    // Plant an object the cascade accepts as a training sample
    let mut rng = rng(34);
    let object = (0..100)
        .map(|_| object_pixels(&mut rng))
        .find(|pixels| {
            let ii = haar_cascade::Patch::new(SIZE, pixels.clone())
                .unwrap()
                .normalized()
                .integral();
            cascade.classify(&Window::sample(&ii))
        })
        .expect("cascade accepts some objects");

    let scene = scene_with(&object, 18, 20);
    let detections = detector().detect_values(&cascade, &scene, SCENE, SCENE);
    assert!(
        detections.contains(&Detection { x: 18, y: 20, size: SIZE }),
        "{:?}",
        detections
    );
}

#[test]
fn detections_stay_inside_the_image() {
    let cascade = trained();
    let scene = scene_with(&object_pixels(&mut rng(35)), 5, 30);
    let detections = detector().detect_values(&cascade, &scene, SCENE, SCENE);
    for d in &detections {
        assert!(d.size >= SIZE);
        assert!(d.x + d.size <= SCENE && d.y + d.size <= SCENE, "{:?}", d);
    }
    // Ordered by scale
    assert!(detections.windows(2).all(|w| w[0].size <= w[1].size));
}

#[test]
fn annotated_copy_marks_detections() {
    let img = GrayImage::from_pixel(30, 30, Luma([90]));
    let detections = [Detection { x: 4, y: 6, size: 12 }];
    let out = annotate(&img, &detections);
    assert_eq!(out.dimensions(), (30, 30));
    assert_eq!(out.get_pixel(4, 6), &Rgb(DETECTION_COLOR));
    assert_eq!(out.get_pixel(15, 17), &Rgb(DETECTION_COLOR));
    assert_eq!(out.get_pixel(10, 10), &Rgb([90, 90, 90]));
}

#[test]
fn detections_serialize_as_json() {
    let json = serde_json::to_string(&[Detection { x: 1, y: 2, size: 21 }]).unwrap();
    assert_eq!(json, r#"[{"x":1,"y":2,"size":21}]"#);
}
