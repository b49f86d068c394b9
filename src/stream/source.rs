//! Events delivered by an EMG armband.
//!
//! The device driver itself lives outside this crate. Whatever talks to the
//! hardware pushes [`DeviceEvent`]s into the
//! [`DeviceSender`](crate::stream::live::DeviceSender) of a live session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity of the live session input queue.
pub const DEVICE_QUEUE_CAPACITY: usize = 10_000;

/// Battery level (percent) under which the indicator turns red.
pub const LOW_BATTERY_LEVEL: u8 = 5;

/// An event emitted by the armband.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// One EMG reading.
    Signal {
        timestamp: DateTime<Utc>,
        /// Raw value per electrode
        channels: Vec<i32>,
        /// Whether the device reports motion
        moving: bool,
        /// Identifier of the characteristic the reading arrived on
        characteristic: u32,
    },
    /// Periodic device status.
    Status {
        timestamp: DateTime<Utc>,
        /// Battery charge in percent
        battery_level: u8,
    },
}

impl DeviceEvent {
    /// A signal event stamped now.
    pub fn signal(channels: Vec<i32>) -> Self {
        DeviceEvent::Signal {
            timestamp: Utc::now(),
            channels,
            moving: false,
            characteristic: 0,
        }
    }

    /// A status event stamped now.
    pub fn status(battery_level: u8) -> Self {
        DeviceEvent::Status {
            timestamp: Utc::now(),
            battery_level,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DeviceEvent::Signal { timestamp, .. } => *timestamp,
            DeviceEvent::Status { timestamp, .. } => *timestamp,
        }
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Colors for the armband's logo and bar LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryIndicator {
    pub logo: Rgb,
    pub line: Rgb,
}

impl BatteryIndicator {
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const PURPLE: Rgb = Rgb(128, 128, 255);

    /// Indicator colors for a battery level in percent.
    pub fn for_level(battery_level: u8) -> Self {
        let color = if battery_level < LOW_BATTERY_LEVEL {
            Self::RED
        } else {
            Self::PURPLE
        };
        Self {
            logo: color,
            line: color,
        }
    }

    pub fn is_low(&self) -> bool {
        self.logo == Self::RED
    }
}
