//! Host-side control of RTL-SDR dongles: device sessions with cached
//! settings, a background streaming engine, and a deterministic hardware
//! simulator for running without a dongle attached.

pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod observability;
pub mod session;
pub mod validate;

pub use config::HostConfig;
pub use engine::{SampleStream, StreamEvent, StreamState};
pub use error::{ErrorKind, SdrError, SdrResult};
pub use hal::{DeviceManager, RtlDriver, RtlHandle};
pub use session::{DeviceSession, GainRequest};
