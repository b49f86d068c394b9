//! Header layouts of the two recording variants.

use serde::{Deserialize, Serialize};

/// First column of every recording.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Column prefix of raw channel values (`emg1`, `emg2`, ...).
pub const RAW_PREFIX: &str = "emg";

/// Column prefix of reduced values (`ca1`, `ca2`, ...).
pub const REDUCED_PREFIX: &str = "ca";

/// Header of a raw recording with `channels` channel columns.
pub fn raw_header(channels: usize) -> Vec<String> {
    prefixed_header(RAW_PREFIX, channels)
}

/// Header of a reduced recording with `components` value columns.
pub fn reduced_header(components: usize) -> Vec<String> {
    prefixed_header(REDUCED_PREFIX, components)
}

fn prefixed_header(prefix: &str, count: usize) -> Vec<String> {
    std::iter::once(TIMESTAMP_COLUMN.to_string())
        .chain((1..=count).map(|i| format!("{prefix}{i}")))
        .collect()
}

/// Layout of a recording, decided once at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingFormat {
    /// Timestamp followed by integer channel values
    Raw { channels: usize },
    /// Timestamp followed by floating-point projection values
    Reduced { components: usize },
}

impl RecordingFormat {
    /// Detect the format from a header row.
    ///
    /// Raw headers must match exactly. Reduced headers only need their
    /// first two columns to match, so any number of components is accepted.
    pub fn detect(header: &[String], channels: usize) -> Option<Self> {
        if header == raw_header(channels).as_slice() {
            return Some(RecordingFormat::Raw { channels });
        }

        let reduced = reduced_header(1);
        if header.len() >= 2 && header[..2] == reduced[..] {
            return Some(RecordingFormat::Reduced {
                components: header.len() - 1,
            });
        }

        None
    }

    /// Header row for this format.
    pub fn header(&self) -> Vec<String> {
        match *self {
            RecordingFormat::Raw { channels } => raw_header(channels),
            RecordingFormat::Reduced { components } => reduced_header(components),
        }
    }

    /// Number of value columns after the timestamp.
    pub fn width(&self) -> usize {
        match *self {
            RecordingFormat::Raw { channels } => channels,
            RecordingFormat::Reduced { components } => components,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, RecordingFormat::Raw { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_raw_header_layout() {
        let header = raw_header(8);
        assert_eq!(header.len(), 9);
        assert_eq!(header[0], "timestamp");
        assert_eq!(header[1], "emg1");
        assert_eq!(header[8], "emg8");
    }

    #[test]
    fn test_detect_raw() {
        let header = raw_header(8);
        assert_eq!(
            RecordingFormat::detect(&header, 8),
            Some(RecordingFormat::Raw { channels: 8 })
        );

        // A truncated raw header is not accepted
        assert_eq!(RecordingFormat::detect(&header[..5], 8), None);
    }

    #[test]
    fn test_detect_reduced_any_width() {
        for k in 1..=5 {
            let header = reduced_header(k);
            assert_eq!(
                RecordingFormat::detect(&header, 8),
                Some(RecordingFormat::Reduced { components: k })
            );
        }
    }

    #[test]
    fn test_detect_invalid() {
        assert_eq!(RecordingFormat::detect(&owned(&["time", "emg1"]), 8), None);
        assert_eq!(RecordingFormat::detect(&owned(&["timestamp"]), 8), None);
        assert_eq!(RecordingFormat::detect(&[], 8), None);
    }
}
