//! Core gauge handle and operations.
//!
//! [`AllurisDevice`] is the main type in this crate. It owns an opened
//! [`Transport`] and runs every device operation as a single transaction:
//! flush stale input, encode the command, send it, receive the reply, decode
//! and classify it. Nothing is retried; a timeout, a malformed reply or a
//! busy acknowledgment is handed to the caller as is.

use std::time::Duration;

use crate::constants::{MAX_CYCLIC_VALUES, MAX_FLUSH_FRAMES};
use crate::device_info::{Directory, NusbBus};
use crate::error::{Error, Result};
use crate::frame::{self, Command, Reply, ReplyFrame};
use crate::state::DeviceState;
use crate::transport::{Transport, UsbTransport};
use crate::types::*;

/// An opened Alluris gauge.
///
/// # Opening a device
///
/// ```no_run
/// use alluris::AllurisDevice;
///
/// let mut dev = AllurisDevice::open("P.25412")?;
/// dev.tare()?;
/// println!("value: {}", dev.raw_value()?);
/// # Ok::<(), alluris::Error>(())
/// ```
///
/// Methods take `&mut self`: one handle serves one caller at a time and
/// transactions complete strictly in the order they are issued.
pub struct AllurisDevice<T: Transport = UsbTransport> {
    transport: T,
    timeouts: Timeouts,
}

impl<T: Transport> std::fmt::Debug for AllurisDevice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllurisDevice")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

// ---- Construction / Opening ----

impl AllurisDevice<UsbTransport> {
    /// Open the connected gauge with the given serial number.
    ///
    /// Every candidate is opened briefly to read its serial number.
    pub fn open(serial_number: &str) -> Result<Self> {
        Directory::new(NusbBus::default()).open(serial_number)
    }

    /// Open a gauge by USB bus number and device address.
    pub fn open_bus_addr(bus: u8, address: u8) -> Result<Self> {
        Directory::new(NusbBus::default()).open_bus_addr(bus, address)
    }

    /// Open a gauge from an already-discovered [`nusb::DeviceInfo`].
    pub fn from_device_info(dev_info: &nusb::DeviceInfo) -> Result<Self> {
        Ok(Self::new(UsbTransport::open(dev_info)?))
    }
}

impl<T: Transport> AllurisDevice<T> {
    /// Wrap an opened transport with default timeouts.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeouts: Timeouts::default(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport, closing the session.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

// ---- Timeouts ----

impl<T: Transport> AllurisDevice<T> {
    /// Current timeouts.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Replace all timeouts.
    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    /// Set the timeout for writing command frames.
    pub fn set_send_timeout(&mut self, timeout: Duration) {
        self.timeouts.send = timeout;
    }

    /// Set the timeout for receiving reply frames.
    pub fn set_receive_timeout(&mut self, timeout: Duration) {
        self.timeouts.receive = timeout;
    }
}

// ---- Transactions ----

impl<T: Transport> AllurisDevice<T> {
    /// Discard any input left over from an earlier transaction.
    pub fn clear_rx(&mut self, timeout: Duration) -> Result<()> {
        let discarded = self.transport.clear_receive_buffer(timeout)?;
        if discarded > 0 {
            log::debug!("discarded {discarded} stale frame(s)");
        }
        Ok(())
    }

    /// Run one transaction with the configured timeouts.
    pub fn execute(&mut self, command: &Command) -> Result<Reply> {
        self.execute_with(command, self.timeouts)
    }

    /// Run one transaction with explicit timeouts.
    ///
    /// Parameters are validated before anything touches the bus, so an
    /// [`Error::OutOfRange`] means no transfer was attempted.
    pub fn execute_with(&mut self, command: &Command, timeouts: Timeouts) -> Result<Reply> {
        let out = frame::encode(command)?;

        self.clear_rx(timeouts.flush)?;

        log::trace!("send {:?}", out);
        self.transport.send(out.as_bytes(), timeouts.send)?;

        let mut reply = self.receive_frame(timeouts)?;

        // Samples already in flight may arrive ahead of the acknowledgment
        // that stops the stream.
        if let Command::CyclicMeasurement {
            enable: false,
            count,
        } = *command
        {
            let mut skipped = 0;
            while skipped < MAX_FLUSH_FRAMES
                && frame::decode_samples(reply.as_bytes(), count as usize).is_ok()
            {
                skipped += 1;
                reply = self.receive_frame(timeouts)?;
            }
            if skipped > 0 {
                log::debug!("skipped {skipped} cyclic frame(s) before stop acknowledgment");
            }
        }

        let result = frame::decode(command.opcode(), command.reply_shape(), reply.as_bytes());
        match &result {
            Ok(_) => log::debug!("{:?} ok", command),
            Err(Error::DeviceBusy { .. }) => log::debug!("{:?} refused, device busy", command),
            Err(e) => log::warn!("{:?}: {e}; check EMI and physical connection", command),
        }
        result
    }

    fn receive_frame(&mut self, timeouts: Timeouts) -> Result<ReplyFrame> {
        let mut reply = ReplyFrame::new();
        let n = self.transport.receive(reply.buf_mut(), timeouts.receive)?;
        reply.set_received(n);
        log::trace!("recv {:?}", reply);
        Ok(reply)
    }

    fn ack(&mut self, command: Command) -> Result<()> {
        self.execute(&command).map(|_| ())
    }

    fn int24(&mut self, command: Command) -> Result<i32> {
        self.execute(&command)?.int24()
    }
}

// ---- Identification ----

impl<T: Transport> AllurisDevice<T> {
    /// Read the serial number, for example `"P.25412"`.
    pub fn serial_number(&mut self) -> Result<String> {
        self.execute(&Command::SerialNumber)?.text()
    }

    /// Number of digits shown on the display.
    ///
    /// Raw values are integers; divide by `10^digits` for the displayed value.
    pub fn digits(&mut self) -> Result<i32> {
        self.int24(Command::Digits)
    }
}

// ---- Values ----

impl<T: Transport> AllurisDevice<T> {
    /// Current raw measurement value.
    pub fn raw_value(&mut self) -> Result<i32> {
        self.int24(Command::RawValue)
    }

    /// Raw positive peak since the last reset.
    pub fn raw_pos_peak(&mut self) -> Result<i32> {
        self.int24(Command::RawPosPeak)
    }

    /// Raw negative peak since the last reset.
    pub fn raw_neg_peak(&mut self) -> Result<i32> {
        self.int24(Command::RawNegPeak)
    }

    /// Set the displayed value to zero.
    pub fn tare(&mut self) -> Result<()> {
        self.ack(Command::Tare)
    }

    /// Reset the positive peak.
    pub fn clear_pos_peak(&mut self) -> Result<()> {
        self.ack(Command::ClearPosPeak)
    }

    /// Reset the negative peak.
    pub fn clear_neg_peak(&mut self) -> Result<()> {
        self.ack(Command::ClearNegPeak)
    }
}

// ---- State ----

impl<T: Transport> AllurisDevice<T> {
    /// Read the device status word.
    pub fn read_state(&mut self) -> Result<DeviceState> {
        self.execute(&Command::ReadState)?.state()
    }

    /// Read the device status word, waiting up to `timeout` for the reply.
    pub fn read_state_with_timeout(&mut self, timeout: Duration) -> Result<DeviceState> {
        let timeouts = self.timeouts.with_receive(timeout);
        self.execute_with(&Command::ReadState, timeouts)?.state()
    }
}

// ---- Measurement ----

impl<T: Transport> AllurisDevice<T> {
    /// Start a measurement.
    ///
    /// Fails with [`Error::DeviceBusy`] if one is already running.
    pub fn start_measurement(&mut self) -> Result<()> {
        self.ack(Command::StartMeasurement)
    }

    /// Stop the running measurement.
    pub fn stop_measurement(&mut self) -> Result<()> {
        self.ack(Command::StopMeasurement)
    }

    /// Select the measurement mode.
    pub fn set_mode(&mut self, mode: MeasurementMode) -> Result<()> {
        self.ack(Command::SetMode(mode))
    }

    /// Read the measurement mode from the device.
    pub fn mode(&mut self) -> Result<MeasurementMode> {
        self.execute(&Command::GetMode)?.mode()
    }

    /// Enable or disable cyclic transmission of `count` values per frame.
    ///
    /// While enabled, the device pushes frames on its own; collect them with
    /// [`poll_measurement`](Self::poll_measurement).
    pub fn cyclic_measurement(&mut self, enable: bool, count: usize) -> Result<()> {
        let count = u8::try_from(count)
            .map_err(|_| Error::OutOfRange("cyclic sample count must be 1..=20"))?;
        self.ack(Command::CyclicMeasurement { enable, count })
    }

    /// Receive one frame of cyclic values into `values`.
    ///
    /// `values.len()` must equal the count passed to
    /// [`cyclic_measurement`](Self::cyclic_measurement). The poll only
    /// listens: it sends nothing and does not flush, since that would drop
    /// the samples it is waiting for.
    pub fn poll_measurement(&mut self, values: &mut [i32]) -> Result<()> {
        if values.is_empty() || values.len() > MAX_CYCLIC_VALUES {
            return Err(Error::OutOfRange("cyclic sample count must be 1..=20"));
        }

        let mut reply = ReplyFrame::new();
        let n = self
            .transport
            .receive(reply.buf_mut(), self.timeouts.receive)?;
        reply.set_received(n);
        log::trace!("poll {:?}", reply);

        let samples = frame::decode_samples(reply.as_bytes(), values.len()).inspect_err(|e| {
            log::warn!("cyclic frame: {e}; check EMI and physical connection");
        })?;
        values.copy_from_slice(&samples);
        Ok(())
    }
}

// ---- Limits ----

impl<T: Transport> AllurisDevice<T> {
    /// Set the positive limit. Must fit a signed 24-bit field.
    pub fn set_pos_limit(&mut self, limit: i32) -> Result<()> {
        self.ack(Command::SetPosLimit(limit))
    }

    /// Set the negative limit. Must fit a signed 24-bit field.
    pub fn set_neg_limit(&mut self, limit: i32) -> Result<()> {
        self.ack(Command::SetNegLimit(limit))
    }

    /// Read the positive limit.
    pub fn pos_limit(&mut self) -> Result<i32> {
        self.int24(Command::GetPosLimit)
    }

    /// Read the negative limit.
    pub fn neg_limit(&mut self) -> Result<i32> {
        self.int24(Command::GetNegLimit)
    }
}
