//! Streaming sessions.
//!
//! This module contains:
//! - The [`Stream`] orchestrator and its lifecycle
//! - Sample rate tracking
//! - Playback of recordings and recording of stream output
//! - The device event interface and the threaded live session

pub mod frequency;
pub mod live;
pub mod orchestrator;
pub mod playback;
pub mod recorder;
pub mod source;

// Re-export commonly used types
pub use frequency::FrequencyTracker;
pub use live::{DeviceSender, LiveCommand, LiveSession, LiveUpdate, SessionClosed, StreamSnapshot};
pub use orchestrator::{ProcessOutput, Stream, StreamState};
pub use playback::{Frame, Playback, PlaybackStep};
pub use recorder::{output_format, Recorder};
pub use source::{BatteryIndicator, DeviceEvent, Rgb};
