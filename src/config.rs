//! Configuration for the gesture pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of EMG channels delivered by the armband.
pub const CHANNELS: usize = 8;

/// Main configuration: pipeline constants plus storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Constants handed to every [`Stream`](crate::stream::Stream)
    pub stream: StreamConfig,

    /// Directory where fitted models are written
    pub models_path: PathBuf,

    /// Directory for recordings converted to a reduced format
    pub converted_path: PathBuf,

    /// Directory for recordings captured during playback/live sessions
    pub recordings_path: PathBuf,

    /// Target playback cadence in samples per second
    pub playback_rate_hz: f64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emg-gesture-pipeline");

        Self {
            stream: StreamConfig::default(),
            models_path: data_dir.join("training"),
            converted_path: data_dir.join("recordings").join("converted"),
            recordings_path: data_dir.join("recordings"),
            playback_rate_hz: 200.0, // Myo raw EMG rate
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.stream.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emg-gesture-pipeline")
            .join("config.json")
    }

    /// Ensure all output directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.models_path,
            &self.converted_path,
            &self.recordings_path,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Constants of one streaming session.
///
/// Passed to the stream at construction; nothing in the pipeline reads
/// global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Channels per raw sample
    pub channels: usize,
    /// RMS smoothing window (samples)
    pub smoothing_window: usize,
    /// Majority-vote window of the classifier (samples)
    pub vote_window: usize,
    /// Dimensionality of PCA/ICA projections
    pub components: usize,
    /// Label reserved for "no active gesture"
    pub idle_label: String,
    /// Misclassification cost multiplier of the idle class
    pub idle_weight: f64,
    /// Base SVM regularization constant
    pub svm_cost: f64,
    /// Output gain applied to independent components
    pub ica_gain: f64,
    /// Seed for the initial FastICA unmixing vectors
    pub ica_seed: u64,
    /// Samples per frequency estimate
    pub frequency_block: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: CHANNELS,
            smoothing_window: 50,
            vote_window: 10,
            components: 3,
            idle_label: "idle".to_string(),
            idle_weight: 100.0,
            svm_cost: 1.0,
            ica_gain: 5000.0,
            ica_seed: 0,
            frequency_block: 100,
        }
    }
}

impl StreamConfig {
    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::InvalidValue("channels must be > 0".into()));
        }
        if self.smoothing_window == 0 {
            return Err(ConfigError::InvalidValue(
                "smoothing_window must be > 0".into(),
            ));
        }
        if self.vote_window == 0 {
            return Err(ConfigError::InvalidValue("vote_window must be > 0".into()));
        }
        if self.components == 0 || self.components > self.channels {
            return Err(ConfigError::InvalidValue(format!(
                "components must be within 1..={}",
                self.channels
            )));
        }
        if self.frequency_block < 2 {
            return Err(ConfigError::InvalidValue(
                "frequency_block must be >= 2".into(),
            ));
        }
        Ok(())
    }

    /// Same configuration with a different projection dimensionality.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }
}

/// Where a model slot of the stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingSource {
    /// Fit from these recordings
    Files(Vec<PathBuf>),
    /// Load a previously fitted model
    PretrainedModel(PathBuf),
}

impl TrainingSource {
    /// Resolve command-line arguments into a source.
    ///
    /// A single argument that is not a `.csv` recording names a model file.
    pub fn from_args<I, P>(args: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = args.into_iter().map(|p| p.as_ref().to_path_buf()).collect();

        if let [single] = paths.as_slice() {
            let is_recording = single
                .extension()
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_recording {
                return TrainingSource::PretrainedModel(single.clone());
            }
        }

        TrainingSource::Files(paths)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
