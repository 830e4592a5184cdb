//! Decoded device status word.
//!
//! The gauge reports its state as a 32-bit little-endian word. Bit positions
//! are fixed by the wire protocol:
//!
//! | Bit | Flag |
//! |-----|------|
//! | 1 | positive limit exceeded |
//! | 2 | negative limit underrun |
//! | 3 | some peak mode active |
//! | 4 | peak plus active |
//! | 5 | peak minus active |
//! | 6 | memory active |
//! | 10 | overload |
//! | 11 | fracture |
//! | 13 | memory |
//! | 14 | memory continuous |
//! | 16 | limit option |
//! | 23 | measuring |
//!
//! All other bits are reserved. They are kept as received and never treated
//! as an error.

/// Masks of the named flags.
pub mod flags {
    /// Force > positive limit.
    pub const POS_LIMIT_EXCEEDED: u32 = 1 << 1;
    /// Force < negative limit.
    pub const NEG_LIMIT_UNDERRUN: u32 = 1 << 2;
    /// One of the peak modes is active.
    pub const SOME_PEAK_MODE_ACTIVE: u32 = 1 << 3;
    /// Positive peak detection active.
    pub const PEAK_PLUS_ACTIVE: u32 = 1 << 4;
    /// Negative peak detection active.
    pub const PEAK_MINUS_ACTIVE: u32 = 1 << 5;
    /// Memory recording active.
    pub const MEM_ACTIVE: u32 = 1 << 6;
    /// Sensor overload.
    pub const OVERLOAD: u32 = 1 << 10;
    /// Fracture detected.
    pub const FRACTURE: u32 = 1 << 11;
    /// Memory mode.
    pub const MEM: u32 = 1 << 13;
    /// Continuous memory mode.
    pub const MEM_CONTI: u32 = 1 << 14;
    /// Limit option installed.
    pub const LIMIT_OPTION: u32 = 1 << 16;
    /// Measurement running.
    pub const MEASURING: u32 = 1 << 23;

    /// Union of all named flags.
    pub const NAMED: u32 = POS_LIMIT_EXCEEDED
        | NEG_LIMIT_UNDERRUN
        | SOME_PEAK_MODE_ACTIVE
        | PEAK_PLUS_ACTIVE
        | PEAK_MINUS_ACTIVE
        | MEM_ACTIVE
        | OVERLOAD
        | FRACTURE
        | MEM
        | MEM_CONTI
        | LIMIT_OPTION
        | MEASURING;

    /// Bits with no assigned meaning.
    pub const RESERVED: u32 = !NAMED;
}

/// Device state as reported by the read-state command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceState {
    raw: u32,
}

impl DeviceState {
    /// Create from the raw status word.
    pub fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Raw 32-bit status word, reserved bits included.
    pub fn raw(self) -> u32 {
        self.raw
    }

    /// Reserved bits that were set in the word.
    pub fn reserved_bits(self) -> u32 {
        self.raw & flags::RESERVED
    }

    #[inline]
    fn bit(self, mask: u32) -> bool {
        self.raw & mask != 0
    }

    /// Force exceeds the positive limit.
    pub fn pos_limit_exceeded(self) -> bool {
        self.bit(flags::POS_LIMIT_EXCEEDED)
    }

    /// Force is below the negative limit.
    pub fn neg_limit_underrun(self) -> bool {
        self.bit(flags::NEG_LIMIT_UNDERRUN)
    }

    /// Any peak mode is active.
    pub fn some_peak_mode_active(self) -> bool {
        self.bit(flags::SOME_PEAK_MODE_ACTIVE)
    }

    /// Positive peak detection is active.
    pub fn peak_plus_active(self) -> bool {
        self.bit(flags::PEAK_PLUS_ACTIVE)
    }

    /// Negative peak detection is active.
    pub fn peak_minus_active(self) -> bool {
        self.bit(flags::PEAK_MINUS_ACTIVE)
    }

    /// Memory recording is active.
    pub fn mem_active(self) -> bool {
        self.bit(flags::MEM_ACTIVE)
    }

    /// The sensor is overloaded.
    pub fn overload(self) -> bool {
        self.bit(flags::OVERLOAD)
    }

    /// A fracture was detected.
    pub fn fracture(self) -> bool {
        self.bit(flags::FRACTURE)
    }

    /// Memory mode is selected.
    pub fn mem(self) -> bool {
        self.bit(flags::MEM)
    }

    /// Continuous memory mode is selected.
    pub fn mem_conti(self) -> bool {
        self.bit(flags::MEM_CONTI)
    }

    /// The limit option is installed.
    pub fn limit_option(self) -> bool {
        self.bit(flags::LIMIT_OPTION)
    }

    /// A measurement is running.
    pub fn measuring(self) -> bool {
        self.bit(flags::MEASURING)
    }
}

impl From<u32> for DeviceState {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}
