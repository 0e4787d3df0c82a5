pub mod device_manager;
pub mod mock;
pub mod traits;
pub mod types;

pub use device_manager::DeviceManager;
pub use traits::{BufferCallback, RtlDriver, RtlHandle};
pub use types::{
    Bandwidth, DeviceInfo, DirectSampling, GainMode, TunerType, UsbStrings, XtalFreqs,
    BUFFER_LENGTH_UNIT, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_LENGTH, EEPROM_SIZE, MAX_BUFFER_COUNT,
    MAX_BUFFER_LENGTH,
};
