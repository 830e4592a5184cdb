//! Pure Rust driver for Alluris force and torque gauges.
//!
//! The gauges (FMI series) expose a small command/response protocol over a
//! USB bulk interface. This crate finds them on the bus, opens a session by
//! serial number or bus address, and exposes every command as a typed,
//! blocking call. It uses [nusb](https://crates.io/crates/nusb) as the USB
//! backend, so no `libusb` is required.
//!
//! # Quick Start
//!
//! ```no_run
//! use alluris::{AllurisDevice, MeasurementMode};
//!
//! let mut dev = AllurisDevice::open("P.25412")?;
//! dev.set_mode(MeasurementMode::PeakMax)?;
//! dev.tare()?;
//! let digits = dev.digits()?;
//! let value = dev.raw_value()?;
//! println!("{}", value as f64 / 10f64.powi(digits));
//! # Ok::<(), alluris::Error>(())
//! ```
//!
//! # Features
//!
//! - **Device discovery**: List connected gauges with product strings and
//!   serial numbers ([`list_devices`], [`Directory`]).
//! - **Values**: Raw value, positive and negative peaks, tare and peak reset.
//! - **Configuration**: Measurement mode and positive/negative limits.
//! - **Status**: The status word decoded into named flags ([`DeviceState`]).
//! - **Cyclic measurement**: Let the gauge push frames of samples and poll
//!   them ([`AllurisDevice::poll_measurement`]).
//! - **Pluggable transport**: Run the protocol over any [`Transport`], for
//!   example a simulated gauge in tests.
//!
//! Every call is a single transaction bounded by its timeouts. Nothing is
//! retried: errors come back classified as transport failure, malformed
//! reply, device busy or out-of-range parameter ([`ErrorKind`]).

pub mod constants;
pub mod context;
pub mod device_info;
pub mod error;
pub mod frame;
pub mod state;
pub mod transport;
pub mod types;

// ---- Convenience re-exports ----

pub use constants::{ALLURIS_PID, ALLURIS_VID};
pub use context::AllurisDevice;
pub use device_info::{list_devices, DeviceDescription, Directory, NusbBus, UsbBus};
pub use error::{error_name, Error, ErrorKind, Result, TransportError};
pub use frame::Command;
pub use state::DeviceState;
pub use transport::{Transport, UsbTransport};
pub use types::*;
