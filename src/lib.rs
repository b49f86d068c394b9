//! EMG Gesture Pipeline - streaming gesture recognition for EMG armbands.
//!
//! This library turns raw electromyography samples into gesture labels, live
//! from a device or replayed from recordings, and trains the models it uses
//! from labeled recordings.
//!
//! # Pipeline
//!
//! - **Smoothing**: a sliding RMS window per channel
//! - **Reduction**: an optional PCA or ICA projection of the smoothed sample
//! - **Classification**: an optional SVM, stabilized by a majority vote
//!
//! Stages without a model are skipped, so the same stream serves raw
//! capture, feature extraction and full recognition.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    EMG Gesture Pipeline                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Device /  │──▶│     RMS     │──▶│  PCA / ICA  │        │
//! │  │  Playback   │   │  Smoothing  │   │ (optional)  │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Session   │   │  Majority   │◀──│     SVM     │        │
//! │  │     Log     │   │    Vote     │   │ (optional)  │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use emg_gesture_pipeline::{config::StreamConfig, core::SamplePayload, stream::Stream};
//!
//! let mut stream = Stream::new(StreamConfig::default());
//! let output = stream.process(&SamplePayload::Raw(vec![12, -3, 40, 7, 0, 5, -9, 22]));
//! println!("{:?}", output.smoothed);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod recording;
pub mod stats;
pub mod stream;
pub mod training;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, StreamConfig, TrainingSource};
pub use core::{Model, ModelKind, ModelRef, Projection, ReductionKind, SvmClassifier};
pub use error::{PipelineError, Result};
pub use recording::{RecordingFormat, RecordingReader, RecordingWriter};
pub use stats::{SessionLog, SharedSessionLog};
pub use stream::{LiveSession, Playback, ProcessOutput, Stream, StreamState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
