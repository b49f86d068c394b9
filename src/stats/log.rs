//! Session statistics.
//!
//! Counters are plain atomics so the live worker can update them while the
//! consumer thread reads them, without sharing any stream state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one streaming session.
#[derive(Debug)]
pub struct SessionLog {
    /// Samples run through the stream
    samples_processed: AtomicU64,
    /// Samples dropped because the stream was paused
    samples_paused: AtomicU64,
    /// Samples for which a gesture was voted
    gestures_emitted: AtomicU64,
    /// Device status events forwarded
    status_events: AtomicU64,
    /// Updates the consumer was too slow to take
    updates_dropped: AtomicU64,
    /// Last sample rate estimate, as f64 bits
    frequency_bits: AtomicU64,
    session_start: DateTime<Utc>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            samples_processed: AtomicU64::new(0),
            samples_paused: AtomicU64::new(0),
            gestures_emitted: AtomicU64::new(0),
            status_events: AtomicU64::new(0),
            updates_dropped: AtomicU64::new(0),
            frequency_bits: AtomicU64::new(0.0f64.to_bits()),
            session_start: Utc::now(),
        }
    }

    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paused_sample(&self) {
        self.samples_paused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gesture(&self) {
        self.gestures_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status(&self) {
        self.status_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_update(&self) {
        self.updates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_frequency(&self, hz: f64) {
        self.frequency_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            samples_paused: self.samples_paused.load(Ordering::Relaxed),
            gestures_emitted: self.gestures_emitted.load(Ordering::Relaxed),
            status_events: self.status_events.load(Ordering::Relaxed),
            updates_dropped: self.updates_dropped.load(Ordering::Relaxed),
            frequency_hz: f64::from_bits(self.frequency_bits.load(Ordering::Relaxed)),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples processed: {}\n\
             - Samples skipped while paused: {}\n\
             - Gestures emitted: {}\n\
             - Status events: {}\n\
             - Updates dropped: {}\n\
             - Sample rate: {:.1} Hz\n\
             - Session duration: {} seconds",
            stats.samples_processed,
            stats.samples_paused,
            stats.gestures_emitted,
            stats.status_events,
            stats.updates_dropped,
            stats.frequency_hz,
            stats.session_duration_secs
        )
    }

    /// Zero every counter; the session start is kept.
    pub fn reset(&self) {
        self.samples_processed.store(0, Ordering::Relaxed);
        self.samples_paused.store(0, Ordering::Relaxed);
        self.gestures_emitted.store(0, Ordering::Relaxed);
        self.status_events.store(0, Ordering::Relaxed);
        self.updates_dropped.store(0, Ordering::Relaxed);
        self.frequency_bits.store(0.0f64.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub samples_processed: u64,
    pub samples_paused: u64,
    pub gestures_emitted: u64,
    pub status_events: u64,
    pub updates_dropped: u64,
    pub frequency_hz: f64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared session log.
pub type SharedSessionLog = Arc<SessionLog>;

pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}
