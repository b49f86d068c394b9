//! Recording of stream output.

use crate::core::sample::{Record, SamplePayload};
use crate::error::Result;
use crate::recording::{RecordingFormat, RecordingWriter};
use crate::stream::orchestrator::{ProcessOutput, Stream};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes what a stream produces, in the richest form available.
///
/// With a projection installed the projected features are written; without
/// one the input is copied through unchanged.
pub struct Recorder<W: Write> {
    writer: RecordingWriter<W>,
}

/// Output format for samples of `input` passing through `stream`.
pub fn output_format(stream: &Stream, input: RecordingFormat) -> RecordingFormat {
    match stream.reduction() {
        Some(projection) => RecordingFormat::Reduced {
            components: projection.components(),
        },
        None => input,
    }
}

impl Recorder<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, stream: &Stream, input: RecordingFormat) -> Result<Self> {
        let writer = RecordingWriter::create(path, output_format(stream, input))?;
        Ok(Self { writer })
    }
}

impl<W: Write> Recorder<W> {
    pub fn new(inner: W, stream: &Stream, input: RecordingFormat) -> Result<Self> {
        let writer = RecordingWriter::new(inner, output_format(stream, input))?;
        Ok(Self { writer })
    }

    pub fn format(&self) -> RecordingFormat {
        self.writer.format()
    }

    pub fn rows(&self) -> usize {
        self.writer.rows()
    }

    /// Write one processed sample. Paused (empty) outputs are not recorded.
    pub fn record(&mut self, record: &Record, output: &ProcessOutput) -> Result<()> {
        if output.is_empty() {
            return Ok(());
        }
        match self.writer.format() {
            RecordingFormat::Reduced { .. } if !output.reduced.is_empty() => {
                self.writer.write_row(&record.timestamp, &output.reduced)
            }
            _ => match &record.payload {
                SamplePayload::Raw(values) => self.writer.write_row(&record.timestamp, values),
                SamplePayload::Reduced(values) => {
                    self.writer.write_row(&record.timestamp, values)
                }
            },
        }
    }

    pub fn finish(self) -> Result<W> {
        self.writer.finish()
    }
}
