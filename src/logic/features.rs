//! Mandibular feature layout
//!
//! The 15 measurements in the fixed order the classifiers are trained on.

/// Number of measurements in every vector
pub const FEATURE_COUNT: usize = 15;

/// Built-in feature names, in training order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "M1 Length",
    "M2 Bicondylar breadth",
    "M3 Mandibular index",
    "M3 Bigonial breadth",
    "M5 URB",
    "M6 LRB",
    "M7 CondRH",
    "M8 CorRH",
    "M9 Gonial angle",
    "M10 Cor length",
    "M11 Cor breadth",
    "M12 C-C distance",
    "M13 Inter cor distance",
    "M14 Cor-Fr distance",
    "M15 Bimental breadth",
];

/// Example vector served by `/sample`
pub const SAMPLE_MEASUREMENTS: [f64; FEATURE_COUNT] = [
    10.5, 12.3, 0.85, 9.8, 3.2, 3.1, 6.5, 5.8, 120.0, 7.5, 1.2, 11.5, 4.2, 3.6, 4.8,
];

// Positions cited in the explanation prompt
pub const MANDIBULAR_LENGTH: usize = 0;
pub const BICONDYLAR_BREADTH: usize = 1;
pub const BIGONIAL_BREADTH: usize = 3;
pub const GONIAL_ANGLE: usize = 8;

pub fn default_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}
