//! Replay of recordings through a stream.

use crate::core::sample::Record;
use crate::error::Result;
use crate::recording::{RecordingFormat, RecordingReader};
use crate::stream::orchestrator::{ProcessOutput, Stream};
use std::path::Path;
use tracing::info;

/// One replayed row and what the stream made of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub record: Record,
    pub output: ProcessOutput,
}

/// Outcome of [`Playback::play_frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackStep {
    Frame(Frame),
    /// The stream is paused; no row was consumed
    Paused,
    /// The recording is exhausted and the stream has been ended
    Ended,
}

/// Feeds the rows of one recording into a stream, one per call.
pub struct Playback {
    reader: RecordingReader,
    frames: u64,
}

impl Playback {
    /// Open a recording. Fails on a missing file or an unknown header.
    pub fn open(path: impl AsRef<Path>, channels: usize) -> Result<Self> {
        let reader = RecordingReader::open(path, channels)?;
        info!(path = ?reader.path(), format = ?reader.format(), "Playback opened");
        Ok(Self { reader, frames: 0 })
    }

    pub fn format(&self) -> RecordingFormat {
        self.reader.format()
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Rows replayed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Read one row and run it through `stream`.
    ///
    /// At end of file the stream is signalled and every further call returns
    /// [`PlaybackStep::Ended`] until the stream is reset.
    pub fn play_frame(&mut self, stream: &mut Stream) -> Result<PlaybackStep> {
        if stream.is_ended() {
            return Ok(PlaybackStep::Ended);
        }
        if stream.is_paused() {
            return Ok(PlaybackStep::Paused);
        }

        match self.reader.next() {
            Some(record) => {
                let record = record?;
                let output = stream.process(&record.payload);
                self.frames += 1;
                Ok(PlaybackStep::Frame(Frame { record, output }))
            }
            None => {
                info!(frames = self.frames, "Playback reached end of recording");
                stream.signal_end();
                Ok(PlaybackStep::Ended)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::error::PipelineError;
    use crate::recording::RecordingWriter;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("emg-playback-{}", std::process::id()))
            .join(name)
    }

    fn raw_recording(name: &str, rows: usize) -> PathBuf {
        let path = temp_path(name);
        let mut writer =
            RecordingWriter::create(&path, RecordingFormat::Raw { channels: 8 }).unwrap();
        for i in 0..rows {
            writer.write_row(&format!("t{i}"), &[i as i32; 8]).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_plays_until_end() {
        let path = raw_recording("three_rows.csv", 3);
        let mut playback = Playback::open(&path, 8).unwrap();
        let mut stream = Stream::new(StreamConfig::default());

        for i in 0..3 {
            match playback.play_frame(&mut stream).unwrap() {
                PlaybackStep::Frame(frame) => {
                    assert_eq!(frame.record.timestamp, format!("t{i}"));
                    assert_eq!(frame.output.smoothed.len(), 8);
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
        assert_eq!(playback.play_frame(&mut stream).unwrap(), PlaybackStep::Ended);
        assert!(stream.is_ended());
        assert_eq!(playback.play_frame(&mut stream).unwrap(), PlaybackStep::Ended);
        assert_eq!(playback.frames(), 3);
    }

    #[test]
    fn test_paused_stream_consumes_nothing() {
        let path = raw_recording("paused.csv", 1);
        let mut playback = Playback::open(&path, 8).unwrap();
        let mut stream = Stream::new(StreamConfig::default());

        stream.pause(Some(true));
        assert_eq!(playback.play_frame(&mut stream).unwrap(), PlaybackStep::Paused);
        stream.pause(Some(false));
        assert!(matches!(
            playback.play_frame(&mut stream).unwrap(),
            PlaybackStep::Frame(_)
        ));
    }

    #[test]
    fn test_invalid_header() {
        let path = temp_path("bogus.csv");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "time,a,b\n1,2,3\n").unwrap();

        let err = Playback::open(&path, 8).err().unwrap();
        assert!(matches!(err, PipelineError::InvalidHeader { .. }));
    }
}
