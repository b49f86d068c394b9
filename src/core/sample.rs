//! Sample types flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// Payload of one sample handed to the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplePayload {
    /// Integer channel values straight from the device or a raw recording
    Raw(Vec<i32>),
    /// Values already projected by a reduction transform
    Reduced(Vec<f64>),
}

impl SamplePayload {
    pub fn len(&self) -> usize {
        match self {
            SamplePayload::Raw(v) => v.len(),
            SamplePayload::Reduced(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A timestamped sample, as read from a recording or received from a device.
///
/// The timestamp is an opaque token and is only passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    pub payload: SamplePayload,
}

impl Record {
    pub fn raw(timestamp: impl Into<String>, channels: Vec<i32>) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload: SamplePayload::Raw(channels),
        }
    }

    pub fn reduced(timestamp: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload: SamplePayload::Reduced(values),
        }
    }
}
