//! Live sessions driven by device events.
//!
//! The stream is moved onto a worker thread and never shared. Device events
//! and control commands share one ordered input queue, so a command takes
//! effect exactly between the events sent before and after it. Every
//! processed sample goes out as an immutable [`StreamSnapshot`].

use crate::core::sample::SamplePayload;
use crate::stats::SharedSessionLog;
use crate::stream::orchestrator::{ProcessOutput, Stream, StreamState};
use crate::stream::source::{BatteryIndicator, DeviceEvent, DEVICE_QUEUE_CAPACITY};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Capacity of the update queue towards the consumer.
pub const UPDATE_QUEUE_CAPACITY: usize = 10_000;

/// Control messages for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveCommand {
    /// Toggle (`None`) or set the paused flag
    Pause(Option<bool>),
    Reset,
    Stop,
}

/// Everything the worker consumes, in arrival order.
#[derive(Debug)]
enum LiveInput {
    Event(DeviceEvent),
    Command(LiveCommand),
    /// The last device sender was dropped
    DeviceGone,
}

/// The live session no longer accepts input.
#[derive(Debug, Error)]
#[error("Live session has stopped")]
pub struct SessionClosed;

/// State of the stream right after one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub timestamp: DateTime<Utc>,
    pub output: ProcessOutput,
    pub frequency: f64,
    pub state: StreamState,
}

/// Messages published by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiveUpdate {
    Sample(StreamSnapshot),
    Status {
        timestamp: DateTime<Utc>,
        battery_level: u8,
        indicator: BatteryIndicator,
    },
}

/// Sends device events into a live session.
///
/// Clones share one link; once the last clone is dropped the worker
/// finishes the events already queued and stops.
#[derive(Clone)]
pub struct DeviceSender {
    link: Arc<DeviceLink>,
}

struct DeviceLink {
    inputs: Sender<LiveInput>,
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        let _ = self.inputs.send(LiveInput::DeviceGone);
    }
}

impl DeviceSender {
    /// Queue one event, blocking while the queue is full.
    pub fn send(&self, event: DeviceEvent) -> Result<(), SessionClosed> {
        self.link
            .inputs
            .send(LiveInput::Event(event))
            .map_err(|_| SessionClosed)
    }
}

/// Handle to a stream running on its own thread.
pub struct LiveSession {
    inputs: Sender<LiveInput>,
    updates: Receiver<LiveUpdate>,
    log: SharedSessionLog,
    worker: Option<JoinHandle<Stream>>,
}

impl LiveSession {
    /// Move `stream` onto a worker thread.
    ///
    /// Returns the session handle and the sender the device adapter feeds.
    /// The worker stops on [`LiveSession::stop`] or once every
    /// [`DeviceSender`] has been dropped.
    pub fn spawn(stream: Stream, log: SharedSessionLog) -> (Self, DeviceSender) {
        let (input_tx, input_rx) = bounded(DEVICE_QUEUE_CAPACITY);
        let (update_tx, update_rx) = bounded(UPDATE_QUEUE_CAPACITY);

        let worker = Worker {
            stream,
            inputs: input_rx,
            updates: update_tx,
            log: log.clone(),
        };
        let handle = thread::spawn(move || worker.run());
        info!("Live session started");

        let device = DeviceSender {
            link: Arc::new(DeviceLink {
                inputs: input_tx.clone(),
            }),
        };
        let session = Self {
            inputs: input_tx,
            updates: update_rx,
            log,
            worker: Some(handle),
        };
        (session, device)
    }

    /// Toggle (`None`) or set the paused flag for the events that follow.
    pub fn pause(&self, state: Option<bool>) {
        self.send(LiveCommand::Pause(state));
    }

    /// Reset the stream, keeping its models.
    pub fn reset(&self) {
        self.send(LiveCommand::Reset);
    }

    fn send(&self, command: LiveCommand) {
        if self.inputs.send(LiveInput::Command(command)).is_err() {
            debug!(?command, "Live worker already stopped");
        }
    }

    /// Receiver for every update, in order.
    pub fn updates(&self) -> &Receiver<LiveUpdate> {
        &self.updates
    }

    /// Drain pending updates and return the newest sample snapshot.
    ///
    /// Older snapshots and status updates queued before it are discarded.
    pub fn latest(&self) -> Option<StreamSnapshot> {
        self.updates
            .try_iter()
            .filter_map(|update| match update {
                LiveUpdate::Sample(snapshot) => Some(snapshot),
                LiveUpdate::Status { .. } => None,
            })
            .last()
    }

    pub fn log(&self) -> &SharedSessionLog {
        &self.log
    }

    /// Stop the worker after the input queued so far and take the stream back.
    ///
    /// Returns `None` if the worker panicked.
    pub fn stop(mut self) -> Option<Stream> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Stream> {
        let handle = self.worker.take()?;
        let _ = self.inputs.send(LiveInput::Command(LiveCommand::Stop));
        match handle.join() {
            Ok(stream) => {
                info!("Live session stopped");
                Some(stream)
            }
            Err(_) => {
                warn!("Live worker panicked");
                None
            }
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    stream: Stream,
    inputs: Receiver<LiveInput>,
    updates: Sender<LiveUpdate>,
    log: SharedSessionLog,
}

impl Worker {
    fn run(mut self) -> Stream {
        while let Ok(input) = self.inputs.recv() {
            match input {
                LiveInput::Event(event) => self.handle(event),
                LiveInput::Command(LiveCommand::Pause(state)) => {
                    self.stream.pause(state);
                }
                LiveInput::Command(LiveCommand::Reset) => self.stream.reset(),
                LiveInput::Command(LiveCommand::Stop) => break,
                LiveInput::DeviceGone => {
                    debug!("Device disconnected");
                    break;
                }
            }
        }
        self.stream
    }

    fn handle(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Signal {
                timestamp,
                channels,
                ..
            } => {
                if self.stream.is_paused() {
                    self.log.record_paused_sample();
                    return;
                }
                let output = self.stream.process(&SamplePayload::Raw(channels));
                self.log.record_sample();
                if output.gesture.is_some() {
                    self.log.record_gesture();
                }
                let frequency = self.stream.frequency();
                self.log.set_frequency(frequency);
                self.publish(LiveUpdate::Sample(StreamSnapshot {
                    timestamp,
                    output,
                    frequency,
                    state: self.stream.state(),
                }));
            }
            DeviceEvent::Status {
                timestamp,
                battery_level,
            } => {
                self.log.record_status();
                self.publish(LiveUpdate::Status {
                    timestamp,
                    battery_level,
                    indicator: BatteryIndicator::for_level(battery_level),
                });
            }
        }
    }

    fn publish(&self, update: LiveUpdate) {
        match self.updates.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.log.record_dropped_update(),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::stats::create_shared_log;
    use crossbeam_channel::RecvTimeoutError;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn() -> (LiveSession, DeviceSender, SharedSessionLog) {
        let log = create_shared_log();
        let (session, device) =
            LiveSession::spawn(Stream::new(StreamConfig::default()), log.clone());
        (session, device, log)
    }

    #[test]
    fn test_samples_are_published() {
        let (session, device, log) = spawn();

        for _ in 0..3 {
            device.send(DeviceEvent::signal(vec![2; 8])).unwrap();
        }
        for _ in 0..3 {
            match session.updates().recv_timeout(WAIT).unwrap() {
                LiveUpdate::Sample(snapshot) => {
                    assert_eq!(snapshot.output.smoothed.len(), 8);
                    assert_eq!(snapshot.state, StreamState::Running);
                }
                other => panic!("unexpected update {other:?}"),
            }
        }

        let stream = session.stop().unwrap();
        assert_eq!(stream.smoothing_len(), 3);
        assert_eq!(log.stats().samples_processed, 3);
    }

    #[test]
    fn test_pause_applies_to_following_events() {
        let (session, device, log) = spawn();

        session.pause(Some(true));
        device.send(DeviceEvent::signal(vec![1; 8])).unwrap();
        session.pause(Some(false));
        device.send(DeviceEvent::signal(vec![1; 8])).unwrap();

        let stream = session.stop().unwrap();
        assert!(!stream.is_paused());

        let stats = log.stats();
        assert_eq!(stats.samples_paused, 1);
        assert_eq!(stats.samples_processed, 1);
    }

    #[test]
    fn test_pause_does_not_reach_earlier_events() {
        let (session, device, log) = spawn();

        device.send(DeviceEvent::signal(vec![1; 8])).unwrap();
        device.send(DeviceEvent::signal(vec![1; 8])).unwrap();
        session.pause(Some(true));
        device.send(DeviceEvent::signal(vec![1; 8])).unwrap();

        let stream = session.stop().unwrap();
        assert!(stream.is_paused());
        assert_eq!(stream.smoothing_len(), 2);

        let stats = log.stats();
        assert_eq!(stats.samples_processed, 2);
        assert_eq!(stats.samples_paused, 1);
    }

    #[test]
    fn test_reset_between_events() {
        let (session, device, _log) = spawn();

        device.send(DeviceEvent::signal(vec![3; 8])).unwrap();
        session.reset();
        device.send(DeviceEvent::signal(vec![3; 8])).unwrap();

        let stream = session.stop().unwrap();
        assert_eq!(stream.smoothing_len(), 1);
    }

    #[test]
    fn test_status_forwarded() {
        let (session, device, _log) = spawn();

        device.send(DeviceEvent::status(3)).unwrap();
        match session.updates().recv_timeout(WAIT).unwrap() {
            LiveUpdate::Status {
                battery_level,
                indicator,
                ..
            } => {
                assert_eq!(battery_level, 3);
                assert!(indicator.is_low());
            }
            other => panic!("unexpected update {other:?}"),
        }
        assert_eq!(session.log().stats().status_events, 1);
    }

    #[test]
    fn test_worker_exits_when_device_disconnects() {
        let (session, device, _log) = spawn();
        let second = device.clone();
        device.send(DeviceEvent::signal(vec![4; 8])).unwrap();
        drop(device);
        second.send(DeviceEvent::signal(vec![4; 8])).unwrap();
        drop(second);

        for _ in 0..2 {
            assert!(matches!(
                session.updates().recv_timeout(WAIT).unwrap(),
                LiveUpdate::Sample(_)
            ));
        }
        // The worker drops its update sender on exit
        assert_eq!(
            session.updates().recv_timeout(WAIT),
            Err(RecvTimeoutError::Disconnected)
        );
        let stream = session.stop().unwrap();
        assert_eq!(stream.smoothing_len(), 2);
    }

    #[test]
    fn test_send_after_stop_fails() {
        let (session, device, _log) = spawn();
        session.stop().unwrap();
        assert!(device.send(DeviceEvent::signal(vec![0; 8])).is_err());
    }

    #[test]
    fn test_latest_keeps_newest() {
        let (session, device, _log) = spawn();
        device.send(DeviceEvent::signal(vec![0; 8])).unwrap();
        device.send(DeviceEvent::signal(vec![6; 8])).unwrap();

        let deadline = std::time::Instant::now() + WAIT;
        while session.updates().len() < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let latest = session.latest().unwrap();
        assert!(latest.output.smoothed[0] > 0.0);
        assert!(session.latest().is_none());
    }
}
