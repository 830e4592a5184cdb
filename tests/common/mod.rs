//! A simulated gauge speaking the frame protocol, and a bus holding several
//! of them.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use alluris::constants::{Opcode, FRAME_LEN};
use alluris::frame::{decode_command, Command};
use alluris::state::flags;
use alluris::{BusAddress, MeasurementMode, Result, Transport, TransportError, UsbBus};

/// Gauge model answering encoded commands.
#[derive(Debug, Clone)]
pub struct SimulatedGauge {
    pub bus_address: BusAddress,
    pub serial: String,
    pub measuring: bool,
    pub mode: MeasurementMode,
    pub pos_limit: i32,
    pub neg_limit: i32,
    pub value: i32,
    pub pos_peak: i32,
    pub neg_peak: i32,
    pub digits: i32,
    pub extra_state: u32,
    pub cyclic: Option<usize>,
    pub pending: VecDeque<Vec<u8>>,
    pub sends: usize,
    pub receives: usize,
}

impl SimulatedGauge {
    pub fn new(serial: &str) -> Self {
        Self {
            bus_address: BusAddress::new(1, 1),
            serial: serial.to_owned(),
            measuring: false,
            mode: MeasurementMode::Standard,
            pos_limit: 0,
            neg_limit: 0,
            value: 0,
            pos_peak: 0,
            neg_peak: 0,
            digits: 1,
            extra_state: 0,
            cyclic: None,
            pending: VecDeque::new(),
            sends: 0,
            receives: 0,
        }
    }

    pub fn at(mut self, bus_address: BusAddress) -> Self {
        self.bus_address = bus_address;
        self
    }

    /// Queue a frame as if it had been left over from an earlier exchange.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.pending.push_back(frame(bytes));
    }

    pub fn calls(&self) -> usize {
        self.sends + self.receives
    }

    pub fn state_word(&self) -> u32 {
        let mut word = self.extra_state;
        if self.measuring {
            word |= flags::MEASURING;
        }
        match self.mode {
            MeasurementMode::Standard => {}
            MeasurementMode::Peak => word |= flags::SOME_PEAK_MODE_ACTIVE,
            MeasurementMode::PeakMax => {
                word |= flags::SOME_PEAK_MODE_ACTIVE | flags::PEAK_PLUS_ACTIVE
            }
            MeasurementMode::PeakMin => {
                word |= flags::SOME_PEAK_MODE_ACTIVE | flags::PEAK_MINUS_ACTIVE
            }
        }
        if self.value > self.pos_limit && self.pos_limit != 0 {
            word |= flags::POS_LIMIT_EXCEEDED;
        }
        word
    }

    fn answer(&mut self, command: Command) -> Vec<u8> {
        let op = command.opcode().wire_value();
        match command {
            Command::SerialNumber => {
                let mut out = vec![op, (2 + self.serial.len()) as u8];
                out.extend_from_slice(self.serial.as_bytes());
                out
            }
            Command::Digits => int24(op, self.digits),
            Command::RawValue => int24(op, self.value),
            Command::RawPosPeak => int24(op, self.pos_peak),
            Command::RawNegPeak => int24(op, self.neg_peak),
            Command::GetPosLimit => int24(op, self.pos_limit),
            Command::GetNegLimit => int24(op, self.neg_limit),
            Command::ReadState => {
                let mut out = vec![op, 6];
                out.extend_from_slice(&self.state_word().to_le_bytes());
                out
            }
            Command::GetMode => vec![op, 3, mode_byte(self.mode)],
            Command::StartMeasurement if self.measuring => busy(op),
            Command::StartMeasurement => {
                self.measuring = true;
                vec![op, 2]
            }
            Command::StopMeasurement if !self.measuring => busy(op),
            Command::StopMeasurement => {
                self.measuring = false;
                vec![op, 2]
            }
            Command::SetMode(_) if self.measuring => busy(op),
            Command::SetMode(mode) => {
                self.mode = mode;
                vec![op, 2]
            }
            Command::SetPosLimit(limit) => {
                self.pos_limit = limit;
                vec![op, 2]
            }
            Command::SetNegLimit(limit) => {
                self.neg_limit = limit;
                vec![op, 2]
            }
            Command::Tare => {
                self.value = 0;
                vec![op, 2]
            }
            Command::ClearPosPeak => {
                self.pos_peak = 0;
                vec![op, 2]
            }
            Command::ClearNegPeak => {
                self.neg_peak = 0;
                vec![op, 2]
            }
            Command::CyclicMeasurement { enable, count } => {
                self.cyclic = enable.then_some(count as usize);
                vec![op, 2]
            }
        }
    }

    fn cyclic_frame(&self, count: usize) -> Vec<u8> {
        let mut out = vec![Opcode::CyclicData.wire_value(), (2 + 3 * count) as u8];
        for i in 0..count {
            out.extend_from_slice(&(self.value + i as i32).to_le_bytes()[..3]);
        }
        frame(&out)
    }
}

impl Transport for SimulatedGauge {
    fn send(&mut self, bytes: &[u8], _timeout: Duration) -> std::result::Result<(), TransportError> {
        self.sends += 1;
        assert_eq!(bytes.len(), FRAME_LEN, "frames are always sent whole");
        let command = decode_command(bytes).expect("driver sent an invalid frame");
        let streaming = self.cyclic;
        let reply = self.answer(command);
        // A sample frame already on the wire lands ahead of the reply
        if let Some(count) = streaming {
            let in_flight = self.cyclic_frame(count);
            self.pending.push_back(in_flight);
        }
        self.pending.push_back(frame(&reply));
        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> std::result::Result<usize, TransportError> {
        self.receives += 1;
        let next = match self.pending.pop_front() {
            Some(bytes) => bytes,
            None => match self.cyclic {
                Some(count) => self.cyclic_frame(count),
                None => return Err(TransportError::Timeout),
            },
        };
        buf[..next.len()].copy_from_slice(&next);
        Ok(next.len())
    }
}

/// A bus populated with simulated gauges.
pub struct SimulatedBus {
    pub gauges: Vec<SimulatedGauge>,
}

impl SimulatedBus {
    pub fn new(serials: &[&str]) -> Self {
        let gauges = serials
            .iter()
            .enumerate()
            .map(|(i, s)| SimulatedGauge::new(s).at(BusAddress::new(1, 10 + i as u8)))
            .collect();
        Self { gauges }
    }
}

impl UsbBus for SimulatedBus {
    type Device = BusAddress;
    type Transport = SimulatedGauge;

    fn enumerate(&self) -> Result<Vec<BusAddress>> {
        Ok(self.gauges.iter().map(|g| g.bus_address).collect())
    }

    fn bus_address(&self, device: &BusAddress) -> BusAddress {
        *device
    }

    fn product(&self, _device: &BusAddress) -> Option<String> {
        Some("FMI-S Force-Gauge".to_owned())
    }

    fn open(&self, device: &BusAddress) -> Result<SimulatedGauge> {
        self.open_bus_addr(device.bus, device.address)
    }

    fn open_bus_addr(&self, bus: u8, address: u8) -> Result<SimulatedGauge> {
        self.gauges
            .iter()
            .find(|g| g.bus_address == BusAddress::new(bus, address))
            .cloned()
            .ok_or(alluris::Error::DeviceNotFound)
    }
}

pub fn frame(bytes: &[u8]) -> Vec<u8> {
    let mut v = bytes.to_vec();
    v.resize(FRAME_LEN, 0);
    v
}

fn int24(op: u8, value: i32) -> Vec<u8> {
    let mut out = vec![op, 5];
    out.extend_from_slice(&value.to_le_bytes()[..3]);
    out
}

fn busy(op: u8) -> Vec<u8> {
    vec![op, 3, 0xFF]
}

fn mode_byte(mode: MeasurementMode) -> u8 {
    match mode {
        MeasurementMode::Standard => 0,
        MeasurementMode::Peak => 1,
        MeasurementMode::PeakMax => 2,
        MeasurementMode::PeakMin => 3,
    }
}
