//! Core numeric pipeline.
//!
//! This module contains:
//! - RMS smoothing of raw channel values
//! - PCA/ICA projections of smoothed samples
//! - The SVM gesture classifier and its majority-vote window
//! - Model persistence

pub mod classifier;
pub mod model;
pub mod reduction;
pub mod sample;
pub mod smoothing;
pub mod vote;

// Re-export commonly used types
pub use classifier::{SvmClassifier, SvmParams};
pub use model::{Model, ModelKind, ModelRef};
pub use reduction::{IcaParams, Projection, ReductionKind};
pub use sample::{Record, SamplePayload};
pub use smoothing::RmsSmoother;
pub use vote::{majority, VoteWindow};
