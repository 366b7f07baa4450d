// WINDOW BOUNDS
/// Smallest window size a stored model may declare
pub const MIN_MODEL_SIZE: usize = 21;

/// Largest window size a stored model may declare
pub const MAX_MODEL_SIZE: usize = 500;

/// Smallest window that still fits every feature kind
pub const MIN_TRAINING_SIZE: usize = 4;

// CONSTANTS USED IN BUILDING THE CASCADE
/// Default training window size
pub const WINDOW_SIZE: usize = MIN_MODEL_SIZE;

/// The number of strong classifiers in the cascade
pub const CASCADE_SIZE: usize = 10;

/// Target overall false positive rate for the cascade
pub const TARGET_FALSE_POS: f64 = 0.000_001;

/// Maximum fraction of positives each layer may reject
pub const MAX_FALSE_NEG: f64 = 0.01;

/// Fixed false positive targets of the first two layers
pub const FIRST_LAYER_FALSE_POS: f64 = 0.5;
pub const SECOND_LAYER_FALSE_POS: f64 = 0.25;

/// Upper bound on weak classifiers added to a single layer
pub const MAX_ROUNDS_PER_LAYER: usize = 500;

/// Floor for the weighted error of a weak classifier, keeps vote weights finite
pub const MIN_WEAK_ERROR: f64 = 1e-10;

// CONSTANTS USED IN DETECTION
/// Multiplicative growth of the window between scales
pub const SCALE_STEP: f64 = 1.25;

/// Slide step as a fraction of the window size
pub const SLIDE_STEP: f64 = 0.1;

/// Colour of the rectangles drawn over detections
pub const DETECTION_COLOR: [u8; 3] = [0xFF, 0x00, 0x00];
