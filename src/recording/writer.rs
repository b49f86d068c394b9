//! Recording writer.

use crate::error::{PipelineError, Result};
use crate::recording::format::RecordingFormat;
use std::borrow::Cow;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Quote a cell if the reader would otherwise split or trim it.
fn quote_cell(value: &str) -> Result<Cow<'_, str>> {
    if value.contains(['\n', '\r']) {
        return Err(PipelineError::InvalidField {
            value: value.to_string(),
        });
    }
    if value.contains([',', '"']) || value.trim() != value {
        Ok(Cow::Owned(format!("\"{}\"", value.replace('"', "\"\""))))
    } else {
        Ok(Cow::Borrowed(value))
    }
}

/// Writes a header row followed by timestamped sample rows.
///
/// Callers create the writer only after the input side has been validated,
/// so a failed validation never leaves a half-written file behind.
pub struct RecordingWriter<W: Write> {
    inner: W,
    format: RecordingFormat,
    /// Path used in error messages
    label: PathBuf,
    rows: usize,
}

impl RecordingWriter<BufWriter<File>> {
    /// Create (or truncate) a recording file and write its header.
    pub fn create(path: impl AsRef<Path>, format: RecordingFormat) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        Self::with_label(BufWriter::new(file), format, path)
    }
}

impl<W: Write> RecordingWriter<W> {
    /// Wrap any writer and emit the header.
    pub fn new(inner: W, format: RecordingFormat) -> Result<Self> {
        Self::with_label(inner, format, Path::new("<stream>"))
    }

    fn with_label(inner: W, format: RecordingFormat, label: &Path) -> Result<Self> {
        let mut writer = Self {
            inner,
            format,
            label: label.to_path_buf(),
            rows: 0,
        };
        let header = format.header().join(",");
        writer.write_line(&header)?;
        Ok(writer)
    }

    pub fn format(&self) -> RecordingFormat {
        self.format
    }

    /// Number of data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write one row. The number of values must match the format width.
    pub fn write_row<T: Display>(&mut self, timestamp: &str, values: &[T]) -> Result<()> {
        if values.len() != self.format.width() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.format.width(),
                actual: values.len(),
            });
        }

        let mut line = quote_cell(timestamp)?.into_owned();
        for value in values {
            line.push(',');
            line.push_str(&value.to_string());
        }
        self.write_line(&line)?;
        self.rows += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.inner, "{line}").map_err(|e| PipelineError::io(&self.label, e))
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner
            .flush()
            .map_err(|e| PipelineError::io(&self.label, e))?;
        Ok(self.inner)
    }
}
