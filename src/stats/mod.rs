//! Session statistics shared between the live worker and its consumer.

pub mod log;

pub use log::{create_shared_log, SessionLog, SessionStats, SharedSessionLog};
