//! Energy analysis of raw recordings.
//!
//! Reports how much of the signal variance the first k principal axes
//! capture, which is what the projection dimensionality is chosen from.

use crate::config::StreamConfig;
use crate::core::reduction::Projection;
use crate::error::{PipelineError, Result};
use crate::training::trainer::{collect_raw, collect_smoothed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Cumulative explained variance of a set of recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyReport {
    /// Samples analysed
    pub samples: usize,
    /// Channels per sample
    pub features: usize,
    /// Fraction of variance captured by the first 1, 2, ... axes
    pub cumulative: Vec<f64>,
}

impl EnergyReport {
    /// Smallest number of axes capturing at least `fraction` of the energy.
    pub fn components_for(&self, fraction: f64) -> Option<usize> {
        self.cumulative
            .iter()
            .position(|&c| c >= fraction)
            .map(|i| i + 1)
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-> {} samples", self.samples)?;
        writeln!(f, "-> {} features (channels)", self.features)?;
        writeln!(f)?;
        for (i, share) in self.cumulative.iter().enumerate() {
            writeln!(
                f,
                "{} channels => {} % energy",
                i + 1,
                (share * 100.0).round() as i64
            )?;
        }
        Ok(())
    }
}

/// Analyse raw recordings, optionally after RMS smoothing.
pub fn analyse_energy(
    files: &[PathBuf],
    smoothed: bool,
    config: &StreamConfig,
) -> Result<EnergyReport> {
    let samples = if smoothed {
        collect_smoothed(files, config)?
    } else {
        collect_raw(files, config)?
    };
    if samples.is_empty() {
        return Err(PipelineError::EmptyTrainingSet);
    }

    let pca = Projection::fit_pca(&samples, config.channels)?;
    let cumulative = pca
        .explained_variance_ratio()
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();

    Ok(EnergyReport {
        samples: samples.len(),
        features: config.channels,
        cumulative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_for() {
        let report = EnergyReport {
            samples: 10,
            features: 3,
            cumulative: vec![0.6, 0.92, 1.0],
        };
        assert_eq!(report.components_for(0.5), Some(1));
        assert_eq!(report.components_for(0.9), Some(2));
        assert_eq!(report.components_for(1.0), Some(3));
    }

    #[test]
    fn test_report_format() {
        let report = EnergyReport {
            samples: 10,
            features: 2,
            cumulative: vec![0.756, 1.0],
        };
        let text = report.to_string();
        assert!(text.contains("1 channels => 76 % energy"));
        assert!(text.contains("2 channels => 100 % energy"));
    }

    #[test]
    fn test_empty_input() {
        let err = analyse_energy(&[], false, &StreamConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTrainingSet));
    }
}
