//! Deterministic hardware simulator used by tests and the demo binary.

pub mod device;
pub mod device_table;
pub mod driver;

pub use device::{SimulatedHandle, SimulatedState, FILL_BYTE};
pub use device_table::{DeviceTable, SimulatedDeviceSpec, REFERENCE_TUNER_GAINS};
pub use driver::SimulatedDriver;
