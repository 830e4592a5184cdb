//! Property-based tests for the frame codec and the status word.
//!
//! Uses `proptest` to generate commands, replies and status words and checks
//! that encoding is lossless and that replies to the wrong command are never
//! accepted.

use alluris::constants::{Opcode, FRAME_LEN, INT24_MAX, INT24_MIN, MAX_CYCLIC_VALUES};
use alluris::frame::{decode, decode_command, encode, Command, ReplyShape};
use alluris::{DeviceState, Error, MeasurementMode};
use proptest::prelude::*;

/// Generate a valid measurement mode.
fn mode_strategy() -> impl Strategy<Value = MeasurementMode> {
    prop_oneof![
        Just(MeasurementMode::Standard),
        Just(MeasurementMode::Peak),
        Just(MeasurementMode::PeakMax),
        Just(MeasurementMode::PeakMin),
    ]
}

/// Generate any command with in-range parameters.
fn command_strategy() -> impl Strategy<Value = Command> {
    let limit = INT24_MIN..=INT24_MAX;
    prop_oneof![
        Just(Command::SerialNumber),
        Just(Command::Digits),
        Just(Command::RawValue),
        Just(Command::RawPosPeak),
        Just(Command::RawNegPeak),
        Just(Command::ReadState),
        Just(Command::Tare),
        Just(Command::ClearPosPeak),
        Just(Command::ClearNegPeak),
        Just(Command::StartMeasurement),
        Just(Command::StopMeasurement),
        Just(Command::GetPosLimit),
        Just(Command::GetNegLimit),
        Just(Command::GetMode),
        limit.clone().prop_map(Command::SetPosLimit),
        limit.prop_map(Command::SetNegLimit),
        mode_strategy().prop_map(Command::SetMode),
        (any::<bool>(), 1..=MAX_CYCLIC_VALUES as u8)
            .prop_map(|(enable, count)| Command::CyclicMeasurement { enable, count }),
    ]
}

proptest! {
    /// Round-trip: encode + decode_command recovers opcode and parameters.
    #[test]
    fn command_round_trip(cmd in command_strategy()) {
        let frame = encode(&cmd).unwrap();
        prop_assert_eq!(frame.as_bytes().len(), FRAME_LEN);
        prop_assert_eq!(frame.opcode(), cmd.opcode().wire_value());
        prop_assert!(frame.as_bytes()[frame.used_len()..].iter().all(|b| *b == 0));
        prop_assert_eq!(decode_command(frame.as_bytes()).unwrap(), cmd);
    }

    /// Limits outside the 24-bit field are refused.
    #[test]
    fn limit_outside_field_is_out_of_range(
        limit in prop_oneof![i32::MIN..INT24_MIN, (INT24_MAX + 1)..=i32::MAX],
    ) {
        prop_assert!(matches!(encode(&Command::SetPosLimit(limit)), Err(Error::OutOfRange(_))));
        prop_assert!(matches!(encode(&Command::SetNegLimit(limit)), Err(Error::OutOfRange(_))));
    }

    /// A 24-bit reply decodes to the value it was built from.
    #[test]
    fn int24_reply_round_trip(value in INT24_MIN..=INT24_MAX) {
        let mut reply = vec![Opcode::RawValue.wire_value(), 5];
        reply.extend_from_slice(&value.to_le_bytes()[..3]);
        reply.resize(FRAME_LEN, 0);
        let decoded = decode(Opcode::RawValue, ReplyShape::Int24, &reply).unwrap();
        prop_assert_eq!(decoded.int24().unwrap(), value);
    }

    /// A reply echoing another opcode is always malformed, whatever follows.
    #[test]
    fn foreign_opcode_never_accepted(
        cmd in command_strategy(),
        echoed in any::<u8>(),
        body in proptest::collection::vec(any::<u8>(), 0..FRAME_LEN - 1),
    ) {
        let expected = cmd.opcode().wire_value();
        prop_assume!(echoed != expected);
        let mut reply = vec![echoed];
        reply.extend_from_slice(&body);
        let result = decode(cmd.opcode(), cmd.reply_shape(), &reply);
        let is_malformed = matches!(result, Err(Error::MalformedReply { .. }));
        prop_assert!(is_malformed);
    }

    /// Decoding a status word loses nothing, reserved bits included.
    #[test]
    fn state_word_preserved(word in any::<u32>()) {
        let state = DeviceState::from_raw(word);
        prop_assert_eq!(state.raw(), word);
        prop_assert_eq!(state.reserved_bits(), word & alluris::state::flags::RESERVED);
    }
}
