//! Type definitions shared across the driver.
//!
//! These types model the device-side configuration (measurement mode), the
//! per-device timeout settings and the bus identity of a gauge.

use std::fmt;
use std::time::Duration;

use crate::constants::{DEFAULT_FLUSH_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_SEND_TIMEOUT};

/// Measurement mode of the gauge.
///
/// The mode lives on the device. It is changed with
/// [`AllurisDevice::set_mode`](crate::AllurisDevice::set_mode) and read back
/// with [`AllurisDevice::mode`](crate::AllurisDevice::mode); the driver never
/// caches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeasurementMode {
    /// 10 Hz sampling rate.
    #[default]
    Standard,
    /// 900 Hz sampling rate.
    Peak,
    /// 900 Hz sampling rate, maximum detection.
    PeakMax,
    /// 900 Hz sampling rate, minimum detection.
    PeakMin,
}

impl MeasurementMode {
    /// Wire encoding for the set-mode command and get-mode reply.
    pub(crate) fn wire_value(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::Peak => 1,
            Self::PeakMax => 2,
            Self::PeakMin => 3,
        }
    }

    /// Decode a mode byte. Unknown values yield `None`.
    pub(crate) fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Peak),
            2 => Some(Self::PeakMax),
            3 => Some(Self::PeakMin),
            _ => None,
        }
    }
}

/// Timeouts applied to one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeouts {
    /// Limit for writing the command frame.
    pub send: Duration,
    /// Limit for receiving the reply frame.
    pub receive: Duration,
    /// Limit for each read while discarding stale input.
    pub flush: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            send: DEFAULT_SEND_TIMEOUT,
            receive: DEFAULT_RECEIVE_TIMEOUT,
            flush: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Replace the receive timeout.
    pub fn with_receive(mut self, receive: Duration) -> Self {
        self.receive = receive;
        self
    }

    /// Replace the send timeout.
    pub fn with_send(mut self, send: Duration) -> Self {
        self.send = send;
        self
    }
}

/// Bus-level identity of a USB device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress {
    /// USB bus number.
    pub bus: u8,
    /// Device address on that bus.
    pub address: u8,
}

impl BusAddress {
    /// Create a bus address.
    pub fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:03}", self.bus, self.address)
    }
}
