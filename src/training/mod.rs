//! Offline training.
//!
//! Fits projections and classifiers from recordings, and analyses how
//! much signal energy a projection of a given size retains.

pub mod analysis;
pub mod trainer;

pub use analysis::{analyse_energy, EnergyReport};
pub use trainer::{
    collect_labeled, collect_raw, collect_smoothed, fit_classifier, fit_reduction,
    label_from_path,
};
