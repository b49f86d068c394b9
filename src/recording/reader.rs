//! Row-by-row recording reader.

use crate::core::sample::{Record, SamplePayload};
use crate::error::{PipelineError, Result};
use crate::recording::format::RecordingFormat;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Split one CSV line into cells.
///
/// Unquoted cells are trimmed. A quoted cell keeps its content verbatim,
/// including commas, with `""` standing for one quote.
fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}

        let mut cell = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '"' if chars.next_if_eq(&'"').is_some() => cell.push('"'),
                    '"' => break,
                    c => cell.push(c),
                }
            }
            // Anything between the closing quote and the separator is dropped
            while chars.next_if(|c| *c != ',').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                cell.push(c);
            }
            cell.truncate(cell.trim_end().len());
        }
        cells.push(cell);

        if chars.next().is_none() {
            return cells;
        }
    }
}

/// Read only the header row of a recording.
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| PipelineError::io(path, e))?;
    Ok(split_cells(first.trim_end_matches(['\r', '\n'])))
}

/// Streaming reader over the rows of a recording.
///
/// The header is validated in [`RecordingReader::open`]; an unknown header
/// is reported as [`PipelineError::InvalidHeader`].
pub struct RecordingReader {
    path: PathBuf,
    format: RecordingFormat,
    header: Vec<String>,
    lines: Lines<BufReader<File>>,
    /// 1-based line number of the last line read
    line: usize,
}

impl RecordingReader {
    /// Open a recording whose raw variant has `channels` channels.
    pub fn open(path: impl AsRef<Path>, channels: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => split_cells(&line.map_err(|e| PipelineError::io(path, e))?),
            None => Vec::new(),
        };

        let format = RecordingFormat::detect(&header, channels).ok_or_else(|| {
            PipelineError::InvalidHeader {
                path: path.to_path_buf(),
            }
        })?;
        debug!(path = ?path, ?format, "Opened recording");

        Ok(Self {
            path: path.to_path_buf(),
            format,
            header,
            lines,
            line: 1,
        })
    }

    pub fn format(&self) -> RecordingFormat {
        self.format
    }

    /// Header row exactly as found in the file.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Parse {
            path: self.path.clone(),
            line: self.line,
            message: message.into(),
        }
    }

    fn parse_row(&self, line: &str) -> Result<Record> {
        let cells = split_cells(line);
        let width = self.format.width();
        if cells.len() != width + 1 {
            return Err(self.parse_error(format!(
                "expected {} columns, found {}",
                width + 1,
                cells.len()
            )));
        }

        let timestamp = cells[0].clone();
        let payload = match self.format {
            RecordingFormat::Raw { .. } => SamplePayload::Raw(
                cells[1..]
                    .iter()
                    .map(|c| {
                        c.parse::<i32>()
                            .map_err(|e| self.parse_error(format!("'{c}': {e}")))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            RecordingFormat::Reduced { .. } => SamplePayload::Reduced(
                cells[1..]
                    .iter()
                    .map(|c| {
                        c.parse::<f64>()
                            .map_err(|e| self.parse_error(format!("'{c}': {e}")))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        Ok(Record { timestamp, payload })
    }
}

impl Iterator for RecordingReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(PipelineError::io(&self.path, e))),
            };
            self.line += 1;

            // Blank lines (e.g. a trailing newline) carry no sample
            if line.trim().is_empty() {
                continue;
            }

            return Some(self.parse_row(&line));
        }
    }
}
