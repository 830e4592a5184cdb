//! List all connected Alluris gauges.
//!
//! Usage: cargo run --example list_devices

fn main() -> Result<(), alluris::Error> {
    env_logger::init();

    let gauges = alluris::list_devices(true)?;

    for g in &gauges {
        println!(
            "{}: bus={} addr={} serial={}",
            g.product,
            g.bus_address.bus,
            g.bus_address.address,
            g.serial_number.as_deref().unwrap_or("?"),
        );
    }

    if gauges.is_empty() {
        println!("No Alluris gauges found.");
    }

    Ok(())
}
