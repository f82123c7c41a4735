//! Simple Transfer Demo
//!
//! Connects to a software device, configures one host-to-card and one
//! card-to-host channel on the simulated engine, and moves a single buffer
//! each way.
//!
//! # Running
//!
//! ```text
//! cargo run --example simple
//! ```

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use ph_dma_engine::{
    ChannelConfig, Connection, Device, DeviceId, Direction, Error, LIBRARY_VERSION,
    SimulatedEngine, TransferStatus,
};

const BUFFER_SIZE: usize = 4096;

/// Delay backed by the host scheduler
struct HostDelay;

impl DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

fn leak_buffer(len: usize) -> &'static mut [u8] {
    Box::leak(vec![0u8; len].into_boxed_slice())
}

fn main() -> Result<(), Error> {
    let device = Device::soft(DeviceId(0));
    let mut conn: Connection<'_, _, 2, 16> =
        Connection::new(SimulatedEngine::<32>::new().with_latency(8));

    conn.connect(&device)?;

    let mut versions = [LIBRARY_VERSION; 3];
    let count = conn.versions(&mut versions);
    for version in &versions[..count] {
        println!("{version}");
    }

    let h2c = conn.configure(ChannelConfig::simulated(Direction::ToDevice))?;
    let c2h = conn.configure(ChannelConfig::simulated(Direction::FromDevice))?;

    // Blocking write
    let source = leak_buffer(BUFFER_SIZE);
    for (i, byte) in source.iter_mut().enumerate() {
        *byte = i as u8;
    }
    let mut write = TransferStatus::new(source);
    let written = conn.transfer(h2c, &mut write, 0, 0x0, BUFFER_SIZE)?;
    println!("h2c: {written} bytes");

    // Submit, then wait with a deadline
    let mut read = TransferStatus::new(leak_buffer(BUFFER_SIZE));
    conn.submit(c2h, &mut read, 0, 0x0, BUFFER_SIZE)?;
    let mut delay = HostDelay;
    let read_bytes = conn.wait_timeout(&mut read, &mut delay, 1_000)?;
    println!("c2h: {read_bytes} bytes");

    conn.release(h2c)?;
    conn.release(c2h)?;
    conn.disconnect()?;
    Ok(())
}
