//! Host-to-Card Pipeline Demo
//!
//! Streams a run of fixed-size buffers through one channel, keeping
//! several transfers in flight. Each finished buffer is refilled before
//! it goes back to the engine.
//!
//! # Running
//!
//! ```text
//! cargo run --example h2c_pipeline
//! ```

use std::time::Instant;

use ph_dma_engine::constants::DEFAULT_PIPELINE_DEPTH;
use ph_dma_engine::{
    ChannelConfig, Connection, Direction, Error, Pipeline, SimulatedEngine, TransferStatus,
};

const BUFFER_SIZE: usize = 64 * 1024;
const TRANSFERS: usize = 256;

fn leak_buffer(len: usize) -> &'static mut [u8] {
    Box::leak(vec![0u8; len].into_boxed_slice())
}

fn main() -> Result<(), Error> {
    let mut conn: Connection<'_, _, 1, 16> =
        Connection::new(SimulatedEngine::<16>::new().with_latency(2));
    let h2c = conn.configure(ChannelConfig::simulated(Direction::ToDevice))?;

    let buffers: [&'static mut [u8]; DEFAULT_PIPELINE_DEPTH] =
        core::array::from_fn(|_| leak_buffer(BUFFER_SIZE));
    let mut pipeline = Pipeline::new(h2c, buffers, 0x0, BUFFER_SIZE);

    let start = Instant::now();
    let stats = pipeline.run(
        &mut conn,
        TRANSFERS,
        |index, status: &mut TransferStatus<&'static mut [u8]>| {
            if let Some(buffer) = status.buffer_mut() {
                buffer.fill(index as u8);
            }
        },
    )?;
    let elapsed = start.elapsed();

    println!(
        "{} transfers, {} bytes in {:?} ({:.1} MB/s simulated)",
        stats.transfers,
        stats.bytes,
        elapsed,
        stats.bytes as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1e6
    );

    conn.release(h2c)?;
    Ok(())
}
