//! Raw frame transport.
//!
//! The command engine only needs to push one frame out, pull one frame in
//! and throw away stale input. [`Transport`] captures exactly that, so the
//! engine can run against a real gauge ([`UsbTransport`]) or a simulated one
//! in tests.

use std::time::Duration;

use nusb::transfer::{Bulk, In, Out};
use nusb::MaybeFuture;

use crate::constants::{FRAME_LEN, INTERFACE_NUM, MAX_FLUSH_FRAMES, READ_EP, WRITE_EP};
use crate::error::TransportError;
use crate::types::BusAddress;

/// Frame-level access to a gauge.
///
/// Each call must return by its timeout. A timeout is reported as
/// [`TransportError::Timeout`], never as a zero-length success.
pub trait Transport {
    /// Write one frame.
    fn send(&mut self, frame: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Read one frame into `buf`, returning the number of bytes received.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Discard pending input until a read times out.
    ///
    /// Returns the number of frames thrown away. Stops after
    /// [`MAX_FLUSH_FRAMES`] frames so a device streaming cyclic data cannot
    /// hold the caller forever.
    fn clear_receive_buffer(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        let mut buf = [0u8; FRAME_LEN];
        let mut discarded = 0;
        while discarded < MAX_FLUSH_FRAMES {
            match self.receive(&mut buf, timeout) {
                Ok(n) => {
                    log::trace!("flush: discarded {:02x?}", &buf[..n]);
                    discarded += 1;
                }
                Err(TransportError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(discarded)
    }
}

/// A gauge opened over nusb bulk endpoints.
pub struct UsbTransport {
    #[allow(dead_code)] // Kept to ensure the USB device stays open
    device: nusb::Device,
    write_ep: nusb::Endpoint<Bulk, Out>,
    read_ep: nusb::Endpoint<Bulk, In>,
    bus_address: BusAddress,
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("bus_address", &self.bus_address)
            .finish_non_exhaustive()
    }
}

impl UsbTransport {
    /// Open a device and claim its measurement interface.
    pub fn open(dev_info: &nusb::DeviceInfo) -> Result<Self, TransportError> {
        let bus_address = BusAddress::new(dev_info.busnum(), dev_info.device_address());
        log::debug!("opening gauge at {bus_address}");

        let device = dev_info.open().wait()?;

        // Detach kernel driver and claim interface
        let interface = device.detach_and_claim_interface(INTERFACE_NUM).wait()?;

        let write_ep = interface.endpoint::<Bulk, Out>(WRITE_EP)?;
        let read_ep = interface.endpoint::<Bulk, In>(READ_EP)?;

        Ok(Self {
            device,
            write_ep,
            read_ep,
            bus_address,
        })
    }

    /// Bus and address the device was opened at.
    pub fn bus_address(&self) -> BusAddress {
        self.bus_address
    }
}

impl Transport for UsbTransport {
    fn send(&mut self, frame: &[u8], timeout: Duration) -> Result<(), TransportError> {
        let mut transfer_buf = nusb::transfer::Buffer::new(frame.len());
        transfer_buf.extend_from_slice(frame);

        let completion = self.write_ep.transfer_blocking(transfer_buf, timeout);
        completion.status?;

        if completion.actual_len != frame.len() {
            return Err(TransportError::ShortWrite {
                written: completion.actual_len,
                expected: frame.len(),
            });
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let transfer_buf = nusb::transfer::Buffer::new(buf.len());

        let completion = self.read_ep.transfer_blocking(transfer_buf, timeout);
        completion.status?;

        let n = completion.actual_len.min(buf.len());
        let raw = completion.buffer.into_vec();
        buf[..n].copy_from_slice(&raw[..n]);
        Ok(n)
    }
}
