use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rtlsdr_host::hal::mock::{DeviceTable, SimulatedDriver};
use rtlsdr_host::{DeviceManager, HostConfig, StreamEvent};

/// Buffers to read before cancelling the demo stream
const DEMO_BUFFERS: u64 = 8;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("rtlsdr-host - simulated device demo");
    println!("===================================\n");

    let config = match std::env::args().nth(1) {
        Some(path) => HostConfig::load_or_init(&PathBuf::from(path)).await?,
        None => HostConfig::default(),
    };

    let table = config.simulator.clone().unwrap_or_else(|| DeviceTable::uniform(1));
    let manager = DeviceManager::new(Arc::new(SimulatedDriver::new(table)));

    println!("Devices:");
    for device in manager.devices()? {
        println!(
            "  #{} {} ({}, serial {})",
            device.device_index, device.name, device.usb_strings.product, device.usb_strings.serial
        );
    }
    println!();

    let mut session = config.open_session(&manager)?;
    if session.sample_rate()? == 0 {
        session.set_sample_rate(2_048_000)?;
    }
    println!("Tuner: {}", session.tuner_type()?);
    println!("Gains: {:?}", session.tuner_gains()?);
    println!("Sample rate: {} Hz\n", session.sample_rate()?);

    let mut stream = session
        .start(config.stream.buffer_count, config.stream.buffer_length)
        .context("Failed to start streaming")?;

    let mut received = 0u64;
    let mut cancelled = false;
    loop {
        match stream.recv_timeout(Duration::from_secs(5)) {
            Ok(StreamEvent::Data(buf)) => {
                received += 1;
                println!("buffer {:>3}: {} bytes", received, buf.len());
                if received >= DEMO_BUFFERS && !cancelled {
                    session.cancel()?;
                    cancelled = true;
                }
            }
            Ok(StreamEvent::Error(msg)) => anyhow::bail!("stream failed: {}", msg),
            Ok(StreamEvent::Done) => break,
            Err(e) => anyhow::bail!("stream stalled: {}", e),
        }
    }

    let metrics = stream.metrics();
    info!(
        "stream {}: {} buffers, {} bytes",
        session.stream_state().name(),
        metrics.buffers_delivered(),
        metrics.bytes_delivered()
    );

    session.close()?;
    println!("\nDone.");
    Ok(())
}
