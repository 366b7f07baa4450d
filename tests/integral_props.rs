use haar_cascade::{Feature, FeatureKind, IntegralImage, Patch, Polarity, WeakClassifier, Window};
use proptest::prelude::*;

/// A grid with a rectangle inside it
fn grid_and_rect() -> impl Strategy<Value = (usize, usize, Vec<f64>, (usize, usize, usize, usize))> {
    (1usize..16, 1usize..16).prop_flat_map(|(w, h)| {
        let values = prop::collection::vec(-100.0f64..100.0, w * h);
        let rect = (0..w, 0..h).prop_flat_map(move |(x, y)| (Just(x), Just(y), 1..=w - x, 1..=h - y));
        (Just(w), Just(h), values, rect)
    })
}

/// Labelled, weighted integer feature values
fn tagged_values() -> impl Strategy<Value = Vec<(f64, bool, f64)>> {
    prop::collection::vec((-50i32..50, any::<bool>(), 0.01f64..1.0), 2..60)
        .prop_map(|v| v.into_iter().map(|(x, label, w)| (f64::from(x), label, w)).collect())
}

proptest! {
    #[test]
    fn rect_sum_matches_brute_force((w, h, values, (x, y, rw, rh)) in grid_and_rect()) {
        let ii = IntegralImage::new(&values, w, h);
        let mut expected = 0.0;
        for yy in y..y + rh {
            for xx in x..x + rw {
                expected += values[xx + w * yy];
            }
        }
        let got = ii.rect_sum(x, y, rw, rh);
        prop_assert!((got - expected).abs() < 1e-6, "{} != {}", got, expected);
    }

    #[test]
    fn stump_error_matches_its_misclassifications(samples in tagged_values()) {
        // Positives first, as the fitter expects
        let mut ordered = samples.clone();
        ordered.sort_by_key(|&(_, positive, _)| !positive);
        let positive_count = ordered.iter().filter(|s| s.1).count();
        let values: Vec<f64> = ordered.iter().map(|s| s.0).collect();
        let weights: Vec<f64> = ordered.iter().map(|s| s.2).collect();

        let feature = Feature::new(FeatureKind::TwoHorizontal, 0, 0, 4, 4);
        match WeakClassifier::fit(feature, &values, positive_count, &weights) {
            Some((wc, error)) => {
                let recount: f64 = ordered
                    .iter()
                    .filter(|&&(v, positive, _)| wc.classify(v) != positive)
                    .map(|s| s.2)
                    .sum();
                prop_assert!((error - recount).abs() < 1e-9, "{} != {}", error, recount);
                // Flipping every label is always available, so no stump is
                // worse than half the total weight
                let total: f64 = weights.iter().sum();
                prop_assert!(error <= total / 2.0 + 1e-9);
            }
            None => {
                prop_assert!(values.iter().all(|&v| v == values[0]));
            }
        }
    }

    #[test]
    fn normalized_window_matches_normalized_patch(
        pixels in prop::collection::vec(0.0f64..1.0, 36),
        kind in 0i64..4,
    ) {
        // A feature read through window statistics equals the same feature
        // on the pre-normalized patch
        let kind = FeatureKind::from_code(kind).unwrap();
        let feature = Feature::new(kind, 0, 0, 6, 6);
        let wc = WeakClassifier::new(feature, 0.0, Polarity::Above);

        let ii = IntegralImage::new(&pixels, 6, 6);
        let sq = IntegralImage::squared(&pixels, 6, 6);
        let scanned = wc.feature_value(&Window::normalized(&ii, &sq, 0, 0, 6));

        let sample = Patch::new(6, pixels).unwrap().normalized().integral();
        let trained = wc.feature_value(&Window::sample(&sample));
        prop_assert!((scanned - trained).abs() < 1e-6, "{} != {}", scanned, trained);
    }
}
