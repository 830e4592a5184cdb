//! Command and reply frame codec.
//!
//! Every exchange with the gauge uses fixed 64-byte frames:
//!
//! ```text
//! [0] opcode   [1] length   [2..length] parameters / payload   [length..64] zero
//! ```
//!
//! `length` counts the two header bytes. Replies echo the opcode of the
//! command they answer and carry a payload whose size is fixed per command
//! (see [`ReplyShape`]). A device that refuses a command in its current
//! state answers with the busy acknowledgment `[opcode, 3, 0xFF]`.
//!
//! Signed values travel as 24-bit little-endian two's complement, the status
//! word as 32-bit little-endian.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::state::DeviceState;
use crate::types::MeasurementMode;

/// A command together with its typed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read the serial number string.
    SerialNumber,
    /// Read the number of display digits.
    Digits,
    /// Read the current raw value.
    RawValue,
    /// Read the raw positive peak.
    RawPosPeak,
    /// Read the raw negative peak.
    RawNegPeak,
    /// Read the status word.
    ReadState,
    /// Enable or disable cyclic transmission of `count` samples per frame.
    CyclicMeasurement {
        /// Start (`true`) or stop (`false`) the cyclic transmission.
        enable: bool,
        /// Samples per frame, 1 ..= [`MAX_CYCLIC_VALUES`].
        count: u8,
    },
    /// Set the displayed value to zero.
    Tare,
    /// Reset the positive peak.
    ClearPosPeak,
    /// Reset the negative peak.
    ClearNegPeak,
    /// Start a measurement.
    StartMeasurement,
    /// Stop a measurement.
    StopMeasurement,
    /// Set the positive limit.
    SetPosLimit(i32),
    /// Set the negative limit.
    SetNegLimit(i32),
    /// Read the positive limit.
    GetPosLimit,
    /// Read the negative limit.
    GetNegLimit,
    /// Select the measurement mode.
    SetMode(MeasurementMode),
    /// Read the measurement mode.
    GetMode,
}

/// Expected layout of the reply to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyShape {
    /// Header only.
    Ack,
    /// One signed 24-bit value.
    Int24,
    /// One 32-bit word.
    Word,
    /// One byte.
    Byte,
    /// ASCII text filling the rest of the frame.
    Text,
    /// `n` signed 24-bit values.
    Samples(usize),
}

impl ReplyShape {
    /// Whether a reply of `len` bytes (header included) fits this shape.
    fn accepts(self, len: usize) -> bool {
        match self {
            Self::Ack => len == HEADER_LEN,
            Self::Int24 => len == HEADER_LEN + INT24_LEN,
            Self::Word => len == HEADER_LEN + 4,
            Self::Byte => len == HEADER_LEN + 1,
            Self::Text => len > HEADER_LEN,
            Self::Samples(n) => len == HEADER_LEN + n * INT24_LEN,
        }
    }
}

impl Command {
    /// Opcode sent for this command.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::SerialNumber => Opcode::SerialNumber,
            Self::Digits => Opcode::Digits,
            Self::RawValue => Opcode::RawValue,
            Self::RawPosPeak => Opcode::RawPosPeak,
            Self::RawNegPeak => Opcode::RawNegPeak,
            Self::ReadState => Opcode::ReadState,
            Self::CyclicMeasurement { .. } => Opcode::CyclicMeasurement,
            Self::Tare => Opcode::Tare,
            Self::ClearPosPeak => Opcode::ClearPosPeak,
            Self::ClearNegPeak => Opcode::ClearNegPeak,
            Self::StartMeasurement => Opcode::StartMeasurement,
            Self::StopMeasurement => Opcode::StopMeasurement,
            Self::SetPosLimit(_) => Opcode::SetPosLimit,
            Self::SetNegLimit(_) => Opcode::SetNegLimit,
            Self::GetPosLimit => Opcode::GetPosLimit,
            Self::GetNegLimit => Opcode::GetNegLimit,
            Self::SetMode(_) => Opcode::SetMode,
            Self::GetMode => Opcode::GetMode,
        }
    }

    /// Layout of the reply the device sends back.
    pub fn reply_shape(&self) -> ReplyShape {
        match self {
            Self::SerialNumber => ReplyShape::Text,
            Self::Digits
            | Self::RawValue
            | Self::RawPosPeak
            | Self::RawNegPeak
            | Self::GetPosLimit
            | Self::GetNegLimit => ReplyShape::Int24,
            Self::ReadState => ReplyShape::Word,
            Self::GetMode => ReplyShape::Byte,
            Self::CyclicMeasurement { .. }
            | Self::Tare
            | Self::ClearPosPeak
            | Self::ClearNegPeak
            | Self::StartMeasurement
            | Self::StopMeasurement
            | Self::SetPosLimit(_)
            | Self::SetNegLimit(_)
            | Self::SetMode(_) => ReplyShape::Ack,
        }
    }
}

/// An encoded outbound frame.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandFrame {
    buf: [u8; FRAME_LEN],
}

impl CommandFrame {
    /// The full zero-padded frame as sent on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes used by header and parameters.
    pub fn used_len(&self) -> usize {
        self.buf[1] as usize
    }

    /// Opcode byte.
    pub fn opcode(&self) -> u8 {
        self.buf[0]
    }
}

impl std::fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandFrame({:02x?})", &self.buf[..self.used_len()])
    }
}

/// Incremental frame writer; bounds are checked by the caller's layout.
struct FrameWriter {
    buf: [u8; FRAME_LEN],
    pos: usize,
}

impl FrameWriter {
    fn new(opcode: Opcode) -> Self {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = opcode.wire_value();
        Self {
            buf,
            pos: HEADER_LEN,
        }
    }

    fn u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    fn int24(&mut self, value: i32, what: &'static str) -> Result<()> {
        if !(INT24_MIN..=INT24_MAX).contains(&value) {
            return Err(Error::OutOfRange(what));
        }
        self.buf[self.pos..self.pos + INT24_LEN].copy_from_slice(&value.to_le_bytes()[..INT24_LEN]);
        self.pos += INT24_LEN;
        Ok(())
    }

    fn finish(mut self) -> CommandFrame {
        self.buf[1] = self.pos as u8;
        CommandFrame { buf: self.buf }
    }
}

/// Encode a command into a zero-padded frame.
///
/// Fails with [`Error::OutOfRange`] when a parameter does not fit its wire
/// field. Nothing is sent in that case.
pub fn encode(command: &Command) -> Result<CommandFrame> {
    let mut w = FrameWriter::new(command.opcode());
    match *command {
        Command::CyclicMeasurement { enable, count } => {
            if count == 0 || count as usize > MAX_CYCLIC_VALUES {
                return Err(Error::OutOfRange("cyclic sample count must be 1..=20"));
            }
            w.u8(enable as u8);
            w.u8(count);
        }
        Command::SetPosLimit(limit) => w.int24(limit, "positive limit exceeds 24-bit range")?,
        Command::SetNegLimit(limit) => w.int24(limit, "negative limit exceeds 24-bit range")?,
        Command::SetMode(mode) => w.u8(mode.wire_value()),
        _ => {}
    }
    Ok(w.finish())
}

/// Sign-extend a 24-bit little-endian field.
pub(crate) fn int24_from_le(bytes: &[u8]) -> i32 {
    let raw = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    (raw << 8) >> 8
}

/// Check the header of a received frame and return the used length.
///
/// Shared by replies and by [`decode_command`].
fn checked_len(opcode: u8, frame: &[u8]) -> Result<usize> {
    let malformed = |reason| Error::MalformedReply { opcode, reason };

    if frame.len() < HEADER_LEN {
        return Err(malformed("frame shorter than header"));
    }
    let len = frame[1] as usize;
    if len < HEADER_LEN {
        return Err(malformed("length field shorter than header"));
    }
    if len > frame.len() || len > FRAME_LEN {
        return Err(malformed("length field exceeds received bytes"));
    }
    if frame[len..].iter().any(|b| *b != 0) {
        return Err(malformed("non-zero bytes after frame end"));
    }
    Ok(len)
}

/// Parse an outbound frame back into its [`Command`].
///
/// Used to verify the codec and by simulated devices that answer encoded
/// commands.
pub fn decode_command(frame: &[u8]) -> Result<Command> {
    let op_byte = frame.first().copied().unwrap_or(0);
    let len = checked_len(op_byte, frame)?;
    let params = &frame[HEADER_LEN..len];
    let malformed = |reason| Error::MalformedReply {
        opcode: op_byte,
        reason,
    };
    let opcode = Opcode::from_wire(op_byte).ok_or_else(|| malformed("unknown opcode"))?;

    let expect_params = |n: usize| {
        if params.len() == n {
            Ok(())
        } else {
            Err(malformed("parameter length mismatch"))
        }
    };

    let command = match opcode {
        Opcode::CyclicMeasurement => {
            expect_params(2)?;
            Command::CyclicMeasurement {
                enable: params[0] != 0,
                count: params[1],
            }
        }
        Opcode::SetPosLimit => {
            expect_params(INT24_LEN)?;
            Command::SetPosLimit(int24_from_le(params))
        }
        Opcode::SetNegLimit => {
            expect_params(INT24_LEN)?;
            Command::SetNegLimit(int24_from_le(params))
        }
        Opcode::SetMode => {
            expect_params(1)?;
            Command::SetMode(
                MeasurementMode::from_wire(params[0]).ok_or_else(|| malformed("unknown mode"))?,
            )
        }
        Opcode::CyclicData => return Err(malformed("cyclic data is not a command")),
        simple => {
            expect_params(0)?;
            match simple {
                Opcode::SerialNumber => Command::SerialNumber,
                Opcode::Digits => Command::Digits,
                Opcode::RawValue => Command::RawValue,
                Opcode::RawPosPeak => Command::RawPosPeak,
                Opcode::RawNegPeak => Command::RawNegPeak,
                Opcode::ReadState => Command::ReadState,
                Opcode::Tare => Command::Tare,
                Opcode::ClearPosPeak => Command::ClearPosPeak,
                Opcode::ClearNegPeak => Command::ClearNegPeak,
                Opcode::StartMeasurement => Command::StartMeasurement,
                Opcode::StopMeasurement => Command::StopMeasurement,
                Opcode::GetPosLimit => Command::GetPosLimit,
                Opcode::GetNegLimit => Command::GetNegLimit,
                Opcode::GetMode => Command::GetMode,
                _ => return Err(malformed("parameter length mismatch")),
            }
        }
    };
    Ok(command)
}

/// A received frame of up to [`FRAME_LEN`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ReplyFrame {
    buf: [u8; FRAME_LEN],
    received: usize,
}

impl ReplyFrame {
    /// An empty frame ready to be filled by a transport.
    pub fn new() -> Self {
        Self {
            buf: [0u8; FRAME_LEN],
            received: 0,
        }
    }

    /// The whole buffer, for the transport to write into.
    pub fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Record how many bytes the transport delivered.
    pub fn set_received(&mut self, n: usize) {
        self.received = n.min(FRAME_LEN);
    }

    /// Received bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.received]
    }
}

impl Default for ReplyFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReplyFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplyFrame({:02x?})", self.as_bytes())
    }
}

/// A validated reply payload, held in place like the frame it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Reply {
    opcode: Opcode,
    buf: [u8; FRAME_LEN],
    payload_len: usize,
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reply({:?}, {:02x?})", self.opcode, self.payload())
    }
}

impl Reply {
    /// Opcode echoed by the device.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Payload bytes after the header.
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.payload_len]
    }

    fn short(&self, need: usize) -> Result<&[u8]> {
        self.payload().get(..need).ok_or(Error::MalformedReply {
            opcode: self.opcode.wire_value(),
            reason: "payload shorter than field",
        })
    }

    /// First payload field as a signed 24-bit value.
    pub fn int24(&self) -> Result<i32> {
        Ok(int24_from_le(self.short(INT24_LEN)?))
    }

    /// First payload field as a 32-bit word.
    pub fn word(&self) -> Result<u32> {
        let b = self.short(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// First payload byte.
    pub fn byte(&self) -> Result<u8> {
        Ok(self.short(1)?[0])
    }

    /// Payload as ASCII text, NUL padding trimmed.
    pub fn text(&self) -> Result<String> {
        let payload = self.payload();
        let end = payload
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(payload.len());
        let text = &payload[..end];
        if !text.is_ascii() {
            return Err(Error::MalformedReply {
                opcode: self.opcode.wire_value(),
                reason: "text payload is not ASCII",
            });
        }
        Ok(text.iter().map(|b| *b as char).collect())
    }

    /// Status word decoded into flags.
    pub fn state(&self) -> Result<DeviceState> {
        self.word().map(DeviceState::from_raw)
    }

    /// Measurement mode byte.
    pub fn mode(&self) -> Result<MeasurementMode> {
        MeasurementMode::from_wire(self.byte()?).ok_or(Error::MalformedReply {
            opcode: self.opcode.wire_value(),
            reason: "unknown measurement mode",
        })
    }

    /// All payload fields as signed 24-bit values.
    pub fn samples(&self) -> Vec<i32> {
        self.payload().chunks_exact(INT24_LEN).map(int24_from_le).collect()
    }
}

/// Validate a reply against the command it answers.
///
/// The echoed opcode must equal `expected`; a reply for any other command is
/// never accepted. A busy acknowledgment yields [`Error::DeviceBusy`], every
/// other structural mismatch [`Error::MalformedReply`].
pub fn decode(expected: Opcode, shape: ReplyShape, reply: &[u8]) -> Result<Reply> {
    let opcode = expected.wire_value();
    let malformed = |reason| Error::MalformedReply { opcode, reason };

    if reply.len() < HEADER_LEN {
        return Err(malformed("reply shorter than header"));
    }
    if reply[0] != opcode {
        return Err(malformed("echoed opcode mismatch"));
    }
    let len = checked_len(opcode, reply)?;
    if len == HEADER_LEN + 1 && reply[HEADER_LEN] == NAK_BUSY {
        return Err(Error::DeviceBusy { opcode });
    }
    if !shape.accepts(len) {
        return Err(malformed("reply length does not match command"));
    }

    let payload = &reply[HEADER_LEN..len];
    let mut buf = [0u8; FRAME_LEN];
    buf[..payload.len()].copy_from_slice(payload);
    Ok(Reply {
        opcode: expected,
        buf,
        payload_len: payload.len(),
    })
}

/// Decode a device-initiated cyclic data frame carrying `count` samples.
pub fn decode_samples(reply: &[u8], count: usize) -> Result<Vec<i32>> {
    decode(Opcode::CyclicData, ReplyShape::Samples(count), reply).map(|r| r.samples())
}
