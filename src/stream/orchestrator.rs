//! The per-session stream orchestrator.
//!
//! A [`Stream`] owns the smoothing window, the vote window and the fitted
//! models of one session. Both the live device adapter and file playback
//! drive it through [`Stream::process`], one sample at a time.

use crate::config::{StreamConfig, TrainingSource};
use crate::core::classifier::SvmClassifier;
use crate::core::model::{Model, ModelRef};
use crate::core::reduction::{Projection, ReductionKind};
use crate::core::sample::SamplePayload;
use crate::core::smoothing::RmsSmoother;
use crate::core::vote::VoteWindow;
use crate::error::{PipelineError, Result};
use crate::stream::frequency::FrequencyTracker;
use crate::training;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    /// No sample processed since construction or the last reset
    Created,
    Running,
    Paused,
    /// Playback source exhausted; terminal until reset
    Ended,
}

/// Result of processing one sample.
///
/// Stages without a model leave their output empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// RMS reading per channel
    pub smoothed: Vec<f64>,
    /// Projected features
    pub reduced: Vec<f64>,
    /// Voted gesture label, once the vote window is primed
    pub gesture: Option<String>,
}

impl ProcessOutput {
    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty() && self.reduced.is_empty() && self.gesture.is_none()
    }
}

/// Stateful streaming session.
pub struct Stream {
    config: StreamConfig,
    smoother: RmsSmoother,
    votes: VoteWindow,
    reduction: Option<Projection>,
    classifier: Option<SvmClassifier>,
    frequency: FrequencyTracker,
    started: bool,
    paused: bool,
    ended: bool,
}

impl Stream {
    /// Create a stream without any fitted model.
    pub fn new(config: StreamConfig) -> Self {
        Self {
            smoother: RmsSmoother::new(config.smoothing_window, config.channels),
            votes: VoteWindow::new(config.vote_window),
            frequency: FrequencyTracker::new(config.frequency_block),
            config,
            reduction: None,
            classifier: None,
            started: false,
            paused: false,
            ended: false,
        }
    }

    /// Create a stream whose models are fitted or loaded from the given sources.
    pub fn from_sources(
        config: StreamConfig,
        reduction: Option<(ReductionKind, TrainingSource)>,
        classifier: Option<TrainingSource>,
    ) -> Result<Self> {
        let mut stream = Self::new(config);

        if let Some((kind, source)) = reduction {
            let projection = match source {
                TrainingSource::Files(files) => {
                    training::fit_reduction(&files, kind, &stream.config)?
                }
                TrainingSource::PretrainedModel(path) => {
                    let projection = Model::load_from_path(&path)?.into_reduction()?;
                    if projection.kind() != kind {
                        return Err(PipelineError::ModelKindMismatch {
                            expected: kind.to_string(),
                            actual: projection.kind().to_string(),
                        });
                    }
                    if projection.input_dim() != stream.config.channels {
                        return Err(PipelineError::DimensionMismatch {
                            expected: stream.config.channels,
                            actual: projection.input_dim(),
                        });
                    }
                    projection
                }
            };
            stream = stream.with_reduction(projection);
        }

        if let Some(source) = classifier {
            let svm = match source {
                TrainingSource::Files(files) => training::fit_classifier(&files, &stream.config)?,
                TrainingSource::PretrainedModel(path) => {
                    Model::load_from_path(&path)?.into_classifier()?
                }
            };
            if let Some(projection) = &stream.reduction {
                if projection.components() != svm.dim() {
                    return Err(PipelineError::DimensionMismatch {
                        expected: projection.components(),
                        actual: svm.dim(),
                    });
                }
            }
            stream = stream.with_classifier(svm);
        }

        Ok(stream)
    }

    /// Install a fitted projection.
    pub fn with_reduction(mut self, projection: Projection) -> Self {
        info!(
            kind = %projection.kind(),
            components = projection.components(),
            "Reduction model active"
        );
        self.reduction = Some(projection);
        self
    }

    /// Install a fitted classifier.
    pub fn with_classifier(mut self, classifier: SvmClassifier) -> Self {
        info!(classes = ?classifier.classes(), "Classifier active");
        self.classifier = Some(classifier);
        self
    }

    /// Process one sample.
    ///
    /// Raw payloads are smoothed, reduced and classified; reduced payloads go
    /// straight to the classifier. Nothing happens while paused or ended.
    pub fn process(&mut self, payload: &SamplePayload) -> ProcessOutput {
        if self.paused || self.ended {
            return ProcessOutput::default();
        }
        self.started = true;
        self.frequency.tick();

        let mut output = ProcessOutput::default();
        match payload {
            SamplePayload::Raw(channels) => {
                output.smoothed = self.smoother.ingest(channels);
                if let Some(projection) = &self.reduction {
                    output.reduced = projection.apply(&output.smoothed);
                }
            }
            SamplePayload::Reduced(values) => {
                output.reduced = values.clone();
            }
        }

        if let Some(classifier) = &self.classifier {
            if output.reduced.len() == classifier.dim() {
                output.gesture = self.votes.classify(classifier, &output.reduced);
            } else {
                debug!(
                    expected = classifier.dim(),
                    actual = output.reduced.len(),
                    "Skipping classification of sample with unexpected width"
                );
            }
        }

        output
    }

    /// Toggle (`None`) or set the paused flag. Returns the new value.
    ///
    /// Has no effect once the stream has ended.
    pub fn pause(&mut self, state: Option<bool>) -> bool {
        if !self.ended {
            self.paused = state.unwrap_or(!self.paused);
            debug!(paused = self.paused, "Pause state changed");
        }
        self.paused
    }

    /// Mark the source as exhausted.
    pub fn signal_end(&mut self) {
        if !self.ended {
            debug!("Stream ended");
        }
        self.ended = true;
    }

    /// Return to a fresh session, keeping the fitted models.
    pub fn reset(&mut self) {
        self.smoother.clear();
        self.votes.clear();
        self.frequency.reset();
        self.started = false;
        self.paused = false;
        self.ended = false;
    }

    pub fn state(&self) -> StreamState {
        if self.ended {
            StreamState::Ended
        } else if self.paused {
            StreamState::Paused
        } else if self.started {
            StreamState::Running
        } else {
            StreamState::Created
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Estimated sample rate in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency.frequency()
    }

    /// The model that determines the output format: the classifier if
    /// present, else the projection.
    pub fn current_model(&self) -> Option<ModelRef<'_>> {
        if let Some(classifier) = &self.classifier {
            Some(ModelRef::Classifier(classifier))
        } else {
            self.reduction.as_ref().map(ModelRef::Reduction)
        }
    }

    pub fn reduction(&self) -> Option<&Projection> {
        self.reduction.as_ref()
    }

    pub fn classifier(&self) -> Option<&SvmClassifier> {
        self.classifier.as_ref()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Samples currently held by the smoothing window.
    pub fn smoothing_len(&self) -> usize {
        self.smoother.len()
    }

    /// Samples currently held by the vote window.
    pub fn vote_len(&self) -> usize {
        self.votes.len()
    }
}
