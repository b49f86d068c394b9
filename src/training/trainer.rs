//! Batch fitting of projections and classifiers from recordings.

use crate::config::StreamConfig;
use crate::core::classifier::{SvmClassifier, SvmParams};
use crate::core::reduction::{IcaParams, Projection, ReductionKind};
use crate::core::sample::SamplePayload;
use crate::core::smoothing::RmsSmoother;
use crate::error::{PipelineError, Result};
use crate::recording::{reduced_header, RecordingFormat, RecordingReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Characters ending the label token of a training file name.
const LABEL_SEPARATORS: [char; 3] = ['_', '-', ' '];

/// Gesture label encoded in a training file name.
///
/// `fist_20200101-120000.csv` is labeled `fist`.
pub fn label_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let label = stem.split(LABEL_SEPARATORS).next()?;
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Open a recording for training, skipping it if its header is unusable.
///
/// Missing files and other I/O failures are propagated.
fn open_for_training(
    path: &Path,
    channels: usize,
    accept: impl Fn(&RecordingReader) -> bool,
) -> Result<Option<RecordingReader>> {
    match RecordingReader::open(path, channels) {
        Ok(reader) if accept(&reader) => Ok(Some(reader)),
        Ok(reader) => {
            warn!(path = ?path, format = ?reader.format(), "Skipping recording with unexpected header");
            Ok(None)
        }
        Err(PipelineError::InvalidHeader { .. }) => {
            warn!(path = ?path, "Skipping recording with invalid header");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Raw channel rows of every raw recording in `files`, unsmoothed.
pub fn collect_raw(files: &[PathBuf], config: &StreamConfig) -> Result<Vec<Vec<f64>>> {
    let mut samples = Vec::new();
    for path in files {
        let Some(reader) = open_for_training(path, config.channels, |r| r.format().is_raw())? else {
            continue;
        };
        info!(path = ?path, "Reading raw recording");
        for record in reader {
            if let SamplePayload::Raw(channels) = record?.payload {
                samples.push(channels.into_iter().map(f64::from).collect());
            }
        }
    }
    Ok(samples)
}

/// RMS-smoothed rows of every raw recording in `files`.
///
/// The smoothing window is cleared between files so that no energy leaks
/// across recording boundaries.
pub fn collect_smoothed(files: &[PathBuf], config: &StreamConfig) -> Result<Vec<Vec<f64>>> {
    let mut smoother = RmsSmoother::new(config.smoothing_window, config.channels);
    let mut samples = Vec::new();

    for path in files {
        smoother.clear();
        let Some(reader) = open_for_training(path, config.channels, |r| r.format().is_raw())? else {
            continue;
        };
        info!(path = ?path, "Training with raw recording");
        for record in reader {
            if let SamplePayload::Raw(channels) = record?.payload {
                samples.push(smoother.ingest(&channels));
            }
        }
    }
    Ok(samples)
}

/// Fit a PCA or ICA projection on raw recordings.
pub fn fit_reduction(
    files: &[PathBuf],
    kind: ReductionKind,
    config: &StreamConfig,
) -> Result<Projection> {
    let samples = collect_smoothed(files, config)?;
    if samples.is_empty() {
        return Err(PipelineError::EmptyTrainingSet);
    }
    info!(
        samples = samples.len(),
        components = config.components,
        %kind,
        "Fitting projection"
    );

    match kind {
        ReductionKind::Pca => Projection::fit_pca(&samples, config.components),
        ReductionKind::Ica => {
            let params = IcaParams {
                seed: config.ica_seed,
                gain: config.ica_gain,
                ..IcaParams::default()
            };
            Projection::fit_ica(&samples, config.components, &params)
        }
    }
}

/// Labeled rows of every reduced recording in `files`.
///
/// Each recording must carry the reduced header for exactly
/// `config.components` components.
pub fn collect_labeled(
    files: &[PathBuf],
    config: &StreamConfig,
) -> Result<(Vec<Vec<f64>>, Vec<String>)> {
    let expected = reduced_header(config.components);
    let mut samples = Vec::new();
    let mut labels = Vec::new();

    for path in files {
        let Some(label) = label_from_path(path) else {
            warn!(path = ?path, "Skipping recording without a label in its name");
            continue;
        };
        let Some(reader) = open_for_training(path, config.channels, |r| {
            r.format() == RecordingFormat::Reduced { components: config.components }
                && r.header() == expected.as_slice()
        })?
        else {
            continue;
        };
        info!(path = ?path, %label, "Training with reduced recording");
        for record in reader {
            if let SamplePayload::Reduced(values) = record?.payload {
                samples.push(values);
                labels.push(label.clone());
            }
        }
    }
    Ok((samples, labels))
}

/// Fit the gesture classifier on labeled reduced recordings.
pub fn fit_classifier(files: &[PathBuf], config: &StreamConfig) -> Result<SvmClassifier> {
    let (samples, labels) = collect_labeled(files, config)?;
    if samples.is_empty() {
        return Err(PipelineError::EmptyTrainingSet);
    }
    if !labels.iter().any(|l| *l == config.idle_label) {
        warn!(
            idle_label = %config.idle_label,
            "No idle recording in the training set, false detections are likely"
        );
    }
    info!(samples = samples.len(), "Fitting SVM classifier");

    let params = SvmParams {
        cost: config.svm_cost,
        idle_label: config.idle_label.clone(),
        idle_weight: config.idle_weight,
        gamma: None,
    };
    SvmClassifier::fit(&samples, &labels, &params)
}
