//! Logic Module - Domain core
//!
//! - `dataset/` - CSV loading, cleaning, stratified split
//! - `model/` - candidate classifiers
//! - `training/` - offline pipeline and model selection
//! - `artifacts` - persisted bundle
//! - `inference` - serving context
//! - `explain/` - optional narrative for a prediction

// Shared vocabulary
pub mod features;
pub mod label;
pub mod scaler;

// Offline
pub mod dataset;
pub mod model;
pub mod training;

// Serving
pub mod artifacts;
pub mod explain;
pub mod inference;
