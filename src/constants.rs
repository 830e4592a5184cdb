//! Protocol constants for Alluris gauge communication.
//!
//! These constants define the USB identity of the gauges, the endpoint
//! layout, the frame geometry and the command opcodes. Most users should not
//! need to use these directly.

use std::time::Duration;

// ---- USB identity ----

/// USB vendor ID used by Alluris gauges.
pub const ALLURIS_VID: u16 = 0x04d8;

/// USB product ID of the FMI gauge family.
pub const ALLURIS_PID: u16 = 0xfeb5;

/// USB interface carrying the measurement protocol.
pub(crate) const INTERFACE_NUM: u8 = 0;

/// Bulk OUT endpoint (host -> device, commands).
pub(crate) const WRITE_EP: u8 = 0x01;

/// Bulk IN endpoint (device -> host, replies).
pub(crate) const READ_EP: u8 = 0x81;

// ---- Directory ----

/// Number of devices which can be enumerated at once by default.
pub const MAX_NUM_DEVICES: usize = 4;

/// USB string descriptor read timeout.
pub(crate) const STRING_TIMEOUT: Duration = Duration::from_secs(1);

// ---- Timeouts ----

/// Default timeout while writing a command frame.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(50);

/// Default timeout while waiting for a reply frame.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default timeout of each read while discarding stale input.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(2);

/// Upper bound on frames discarded by a single flush. A gauge in cyclic
/// mode never goes quiet, so the flush has to stop on its own.
pub(crate) const MAX_FLUSH_FRAMES: usize = 16;

// ---- Frame geometry ----

/// Capacity of command and reply frames. Multiple of wMaxPacketSize.
pub const FRAME_LEN: usize = 64;

/// Opcode byte plus length byte.
pub const HEADER_LEN: usize = 2;

/// Width of a signed integer field on the wire.
pub(crate) const INT24_LEN: usize = 3;

/// Smallest value a 24-bit wire field can carry.
pub const INT24_MIN: i32 = -(1 << 23);

/// Largest value a 24-bit wire field can carry.
pub const INT24_MAX: i32 = (1 << 23) - 1;

/// Most samples a single cyclic data frame can carry.
pub const MAX_CYCLIC_VALUES: usize = (FRAME_LEN - HEADER_LEN) / INT24_LEN;

/// Payload byte of a busy acknowledgment. Never a valid single-byte payload.
pub(crate) const NAK_BUSY: u8 = 0xFF;

/// Command opcodes.
///
/// Every reply echoes the opcode of the command it answers. Cyclic data
/// frames are sent by the device on its own and carry [`Opcode::CyclicData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Read the serial number string.
    SerialNumber = 0x08,
    /// Read the number of display digits.
    Digits = 0x10,
    /// Read the status word.
    ReadState = 0x19,
    /// Set the displayed value to zero.
    Tare = 0x21,
    /// Reset the positive peak.
    ClearPosPeak = 0x22,
    /// Reset the negative peak.
    ClearNegPeak = 0x23,
    /// Start a measurement.
    StartMeasurement = 0x24,
    /// Stop a measurement.
    StopMeasurement = 0x25,
    /// Set the positive limit.
    SetPosLimit = 0x30,
    /// Set the negative limit.
    SetNegLimit = 0x31,
    /// Read the positive limit.
    GetPosLimit = 0x32,
    /// Read the negative limit.
    GetNegLimit = 0x33,
    /// Select the measurement mode.
    SetMode = 0x34,
    /// Read the measurement mode.
    GetMode = 0x35,
    /// Read the current raw value.
    RawValue = 0x46,
    /// Read the raw positive peak.
    RawPosPeak = 0x47,
    /// Read the raw negative peak.
    RawNegPeak = 0x48,
    /// Enable or disable cyclic transmission of measurements.
    CyclicMeasurement = 0x4A,
    /// Device-initiated frame of cyclic samples.
    CyclicData = 0x4B,
}

impl Opcode {
    /// Wire value of this opcode.
    #[inline]
    pub fn wire_value(self) -> u8 {
        self as u8
    }

    /// Look up an opcode from its wire value.
    pub fn from_wire(value: u8) -> Option<Self> {
        Some(match value {
            0x08 => Self::SerialNumber,
            0x10 => Self::Digits,
            0x19 => Self::ReadState,
            0x21 => Self::Tare,
            0x22 => Self::ClearPosPeak,
            0x23 => Self::ClearNegPeak,
            0x24 => Self::StartMeasurement,
            0x25 => Self::StopMeasurement,
            0x30 => Self::SetPosLimit,
            0x31 => Self::SetNegLimit,
            0x32 => Self::GetPosLimit,
            0x33 => Self::GetNegLimit,
            0x34 => Self::SetMode,
            0x35 => Self::GetMode,
            0x46 => Self::RawValue,
            0x47 => Self::RawPosPeak,
            0x48 => Self::RawNegPeak,
            0x4A => Self::CyclicMeasurement,
            0x4B => Self::CyclicData,
            _ => return None,
        })
    }
}
