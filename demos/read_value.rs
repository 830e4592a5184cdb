//! Read value, peaks and state from a gauge.
//!
//! Opens the gauge with the serial number given on the command line, or the
//! first one found, and prints its readings.
//!
//! Usage: cargo run --example read_value [SERIAL]

use alluris::{AllurisDevice, Error};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut dev = match std::env::args().nth(1) {
        Some(serial) => AllurisDevice::open(&serial)?,
        None => {
            let first = alluris::list_devices(false)?
                .into_iter()
                .next()
                .ok_or(Error::DeviceNotFound)?;
            AllurisDevice::from_device_info(&first.device)?
        }
    };
    println!("Opened {}", dev.serial_number()?);

    let digits = dev.digits()?;
    let scale = 10f64.powi(digits);
    println!("mode:  {:?}", dev.mode()?);
    println!("value: {}", dev.raw_value()? as f64 / scale);
    println!("peak+: {}", dev.raw_pos_peak()? as f64 / scale);
    println!("peak-: {}", dev.raw_neg_peak()? as f64 / scale);

    match dev.read_state() {
        Ok(state) => println!(
            "measuring={} overload={} reserved={:#010x}",
            state.measuring(),
            state.overload(),
            state.reserved_bits()
        ),
        Err(e) => println!("state: {} ({e})", e.name()),
    }

    Ok(())
}
