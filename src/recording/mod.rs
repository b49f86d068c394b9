//! Recording I/O.
//!
//! Recordings are CSV files with a single header row. Raw recordings carry
//! the integer channel values delivered by the device, reduced recordings
//! carry the output of a fitted projection. The format is detected once,
//! when the file is opened, and drives every row parse afterwards.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{raw_header, reduced_header, RecordingFormat};
pub use reader::{read_header, RecordingReader};
pub use writer::RecordingWriter;
