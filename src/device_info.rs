//! Device discovery and enumeration.
//!
//! Use [`list_devices`] to list connected gauges, or a [`Directory`] for
//! exact selection by serial number or bus address. The directory talks to
//! the bus through [`UsbBus`]; [`NusbBus`] is the real implementation.

use nusb::{self, DeviceInfo, MaybeFuture};

use crate::constants::{ALLURIS_PID, ALLURIS_VID, MAX_NUM_DEVICES, STRING_TIMEOUT};
use crate::context::AllurisDevice;
use crate::error::{Error, Result};
use crate::transport::{Transport, UsbTransport};
use crate::types::{BusAddress, Timeouts};

/// Access to the devices on a USB bus.
pub trait UsbBus {
    /// A device found on the bus, not opened.
    type Device: Clone;
    /// An opened device.
    type Transport: Transport;

    /// List candidate gauges.
    fn enumerate(&self) -> Result<Vec<Self::Device>>;

    /// Bus number and address of a device.
    fn bus_address(&self, device: &Self::Device) -> BusAddress;

    /// Product string, for example `"FMI-S Force-Gauge"`.
    fn product(&self, device: &Self::Device) -> Option<String>;

    /// Open a device.
    fn open(&self, device: &Self::Device) -> Result<Self::Transport>;

    /// Open the device at a bus number and address.
    fn open_bus_addr(&self, bus: u8, address: u8) -> Result<Self::Transport>;
}

/// A gauge found on the bus.
///
/// Describing a device does not open it; pass the description to
/// [`Directory::open_description`] to start a session.
#[derive(Debug, Clone)]
pub struct DeviceDescription<D> {
    /// The underlying bus-level device.
    pub device: D,
    /// Bus number and address.
    pub bus_address: BusAddress,
    /// Product identification, for example `"FMI-S Force-Gauge"`.
    pub product: String,
    /// Serial number, for example `"P.25412"`, if it was read.
    pub serial_number: Option<String>,
}

/// Enumerates gauges and opens sessions with them.
///
/// # Example
///
/// ```no_run
/// use alluris::{Directory, NusbBus};
///
/// let dir = Directory::new(NusbBus::default());
/// for desc in dir.list_devices(true)? {
///     println!("{} {:?} at {}", desc.product, desc.serial_number, desc.bus_address);
/// }
/// # Ok::<(), alluris::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Directory<B> {
    bus: B,
    capacity: usize,
    timeouts: Timeouts,
}

impl<B: UsbBus> Directory<B> {
    /// Create a directory holding up to [`MAX_NUM_DEVICES`] gauges.
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            capacity: MAX_NUM_DEVICES,
            timeouts: Timeouts::default(),
        }
    }

    /// Change how many gauges an enumeration may return.
    ///
    /// Finding more candidates than this fails with
    /// [`Error::TooManyDevices`] instead of truncating the list.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Timeouts for the serial number reads and for opened sessions.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// List connected gauges.
    ///
    /// With `read_serial`, each gauge is opened just long enough to ask for
    /// its serial number and closed again before this returns. A gauge that
    /// does not answer is still listed, without a serial number.
    pub fn list_devices(&self, read_serial: bool) -> Result<Vec<DeviceDescription<B::Device>>> {
        let candidates = self.bus.enumerate()?;
        if candidates.len() > self.capacity {
            return Err(Error::TooManyDevices {
                found: candidates.len(),
                capacity: self.capacity,
            });
        }

        let mut devices = Vec::with_capacity(candidates.len());
        for device in candidates {
            let bus_address = self.bus.bus_address(&device);
            let product = self.bus.product(&device).unwrap_or_default();

            let serial_number = if read_serial {
                match self.read_serial(&device) {
                    Ok(serial) => Some(serial),
                    Err(e) => {
                        log::warn!("could not read serial number of gauge at {bus_address}: {e}");
                        None
                    }
                }
            } else {
                None
            };

            devices.push(DeviceDescription {
                device,
                bus_address,
                product,
                serial_number,
            });
        }

        log::debug!("found {} gauge(s)", devices.len());
        Ok(devices)
    }

    /// Find the gauge with exactly this serial number.
    pub fn find(&self, serial_number: &str) -> Result<DeviceDescription<B::Device>> {
        self.list_devices(true)?
            .into_iter()
            .find(|d| d.serial_number.as_deref() == Some(serial_number))
            .ok_or(Error::DeviceNotFound)
    }

    /// Open the gauge with exactly this serial number.
    pub fn open(&self, serial_number: &str) -> Result<AllurisDevice<B::Transport>> {
        let desc = self.find(serial_number)?;
        self.open_description(&desc)
    }

    /// Open a previously listed gauge.
    pub fn open_description(
        &self,
        desc: &DeviceDescription<B::Device>,
    ) -> Result<AllurisDevice<B::Transport>> {
        let transport = self.bus.open(&desc.device)?;
        Ok(self.session(transport))
    }

    /// Open the gauge at a bus number and device address.
    pub fn open_bus_addr(&self, bus: u8, address: u8) -> Result<AllurisDevice<B::Transport>> {
        let transport = self.bus.open_bus_addr(bus, address)?;
        Ok(self.session(transport))
    }

    fn session(&self, transport: B::Transport) -> AllurisDevice<B::Transport> {
        let mut dev = AllurisDevice::new(transport);
        dev.set_timeouts(self.timeouts);
        dev
    }

    /// Ask a device for its serial number through a transient session.
    fn read_serial(&self, device: &B::Device) -> Result<String> {
        let mut dev = self.session(self.bus.open(device)?);
        dev.serial_number()
    }
}

/// The system USB bus, filtered to one vendor and product ID.
#[derive(Debug, Clone)]
pub struct NusbBus {
    /// USB vendor ID to match.
    pub vendor_id: u16,
    /// USB product ID to match.
    pub product_id: u16,
}

impl Default for NusbBus {
    fn default() -> Self {
        Self::new(ALLURIS_VID, ALLURIS_PID)
    }
}

impl NusbBus {
    /// Match devices with the given vendor and product IDs.
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    fn matches(&self, d: &DeviceInfo) -> bool {
        self.matches_ids(d.vendor_id(), d.product_id())
    }

    fn matches_ids(&self, vendor_id: u16, product_id: u16) -> bool {
        vendor_id == self.vendor_id && product_id == self.product_id
    }

    fn is_at(&self, d: &DeviceInfo, bus: u8, address: u8) -> bool {
        d.busnum() == bus && d.device_address() == address && self.matches(d)
    }
}

impl UsbBus for NusbBus {
    type Device = DeviceInfo;
    type Transport = UsbTransport;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let devices: Vec<DeviceInfo> = nusb::list_devices()
            .wait()?
            .filter(|d| self.matches(d))
            .collect();
        Ok(devices)
    }

    fn bus_address(&self, device: &DeviceInfo) -> BusAddress {
        BusAddress::new(device.busnum(), device.device_address())
    }

    fn product(&self, device: &DeviceInfo) -> Option<String> {
        if let Some(product) = device.product_string() {
            return Some(product.to_owned());
        }

        // Not cached by the OS, ask the device
        let opened = device.open().wait().ok()?;
        let idx = opened.device_descriptor().product_string_index()?;
        opened
            .get_string_descriptor(idx, 0x0409, STRING_TIMEOUT)
            .wait()
            .ok()
    }

    fn open(&self, device: &DeviceInfo) -> Result<UsbTransport> {
        Ok(UsbTransport::open(device)?)
    }

    fn open_bus_addr(&self, bus: u8, address: u8) -> Result<UsbTransport> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| self.is_at(d, bus, address))
            .ok_or(Error::DeviceNotFound)?;

        Ok(UsbTransport::open(&dev_info)?)
    }
}

/// List all connected Alluris gauges.
///
/// # Example
///
/// ```no_run
/// let gauges = alluris::list_devices(true)?;
/// for g in &gauges {
///     println!("{}: {:?}", g.product, g.serial_number);
/// }
/// # Ok::<(), alluris::Error>(())
/// ```
pub fn list_devices(read_serial: bool) -> Result<Vec<DeviceDescription<DeviceInfo>>> {
    Directory::new(NusbBus::default()).list_devices(read_serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::time::Duration;

    /// Gauge that answers only the serial number command.
    struct SerialOnly(&'static str);

    impl Transport for SerialOnly {
        fn send(
            &mut self,
            _frame: &[u8],
            _timeout: Duration,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        fn receive(
            &mut self,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> std::result::Result<usize, TransportError> {
            if self.0.is_empty() {
                return Err(TransportError::Timeout);
            }
            buf.fill(0);
            buf[0] = 0x08;
            buf[1] = (2 + self.0.len()) as u8;
            buf[2..2 + self.0.len()].copy_from_slice(self.0.as_bytes());
            Ok(buf.len())
        }

        fn clear_receive_buffer(
            &mut self,
            _timeout: Duration,
        ) -> std::result::Result<usize, TransportError> {
            Ok(0)
        }
    }

    struct FakeBus(Vec<(u8, &'static str)>);

    impl UsbBus for FakeBus {
        type Device = (u8, &'static str);
        type Transport = SerialOnly;

        fn enumerate(&self) -> Result<Vec<Self::Device>> {
            Ok(self.0.clone())
        }

        fn bus_address(&self, device: &Self::Device) -> BusAddress {
            BusAddress::new(1, device.0)
        }

        fn product(&self, _device: &Self::Device) -> Option<String> {
            Some("FMI-S Force-Gauge".into())
        }

        fn open(&self, device: &Self::Device) -> Result<SerialOnly> {
            Ok(SerialOnly(device.1))
        }

        fn open_bus_addr(&self, bus: u8, address: u8) -> Result<SerialOnly> {
            self.0
                .iter()
                .find(|d| bus == 1 && d.0 == address)
                .map(|d| SerialOnly(d.1))
                .ok_or(Error::DeviceNotFound)
        }
    }

    #[test]
    fn list_without_serial_does_not_open() {
        let dir = Directory::new(FakeBus(vec![(3, "P.1")]));
        let list = dir.list_devices(false).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].serial_number, None);
        assert_eq!(list[0].product, "FMI-S Force-Gauge");
    }

    #[test]
    fn silent_gauge_is_listed_without_serial() {
        let dir = Directory::new(FakeBus(vec![(3, ""), (4, "P.2")]));
        let list = dir.list_devices(true).unwrap();
        assert_eq!(list[0].serial_number, None);
        assert_eq!(list[1].serial_number.as_deref(), Some("P.2"));
    }

    #[test]
    fn capacity_is_enforced() {
        let bus = FakeBus(vec![(1, "A"), (2, "B"), (3, "C")]);
        let err = Directory::new(bus).with_capacity(2).list_devices(false).unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyDevices {
                found: 3,
                capacity: 2
            }
        ));
    }

    #[test]
    fn serial_match_is_exact() {
        let dir = Directory::new(FakeBus(vec![(1, "P.123"), (2, "P.12")]));
        assert_eq!(dir.find("P.12").unwrap().bus_address, BusAddress::new(1, 2));
        assert!(matches!(dir.find("P.1"), Err(Error::DeviceNotFound)));
    }

    #[test]
    fn open_bus_addr_unknown() {
        let dir = Directory::new(FakeBus(vec![(1, "P.1")]));
        assert!(dir.open_bus_addr(1, 1).is_ok());
        assert!(matches!(
            dir.open_bus_addr(2, 1),
            Err(Error::DeviceNotFound)
        ));
    }

    #[test]
    fn nusb_bus_filters_on_both_ids() {
        let bus = NusbBus::default();
        assert!(bus.matches_ids(ALLURIS_VID, ALLURIS_PID));
        assert!(!bus.matches_ids(ALLURIS_VID, 0x0001));
        assert!(!bus.matches_ids(0x0403, ALLURIS_PID));

        let other = NusbBus::new(0x0403, 0x6001);
        assert!(other.matches_ids(0x0403, 0x6001));
        assert!(!other.matches_ids(ALLURIS_VID, ALLURIS_PID));
    }
}
