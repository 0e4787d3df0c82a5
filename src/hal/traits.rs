use std::sync::Arc;

use super::types::{DirectSampling, TunerType, UsbStrings, XtalFreqs};
use crate::error::SdrResult;

/// Device table exposed by a transport driver (librtlsdr or a stand-in)
pub trait RtlDriver: Send + Sync {
    /// Number of devices currently present
    fn device_count(&self) -> u32;

    /// Device name; empty when the index is not present
    fn device_name(&self, index: u32) -> String;

    /// USB descriptor strings of a device that is not necessarily open
    fn usb_strings(&self, index: u32) -> SdrResult<UsbStrings>;

    /// Index of the first device with this serial, if any
    fn index_by_serial(&self, serial: &str) -> SdrResult<Option<u32>>;

    /// Open a device for exclusive use
    fn open(&self, index: u32) -> SdrResult<Arc<dyn RtlHandle>>;
}

/// Receives each completed transport buffer during an async read
pub type BufferCallback<'a> = &'a mut dyn FnMut(&[u8]);

/// One open hardware unit.
///
/// Every call maps to the librtlsdr function of the same name. A negative
/// hardware return code surfaces as `SdrError::Transport`. Implementations
/// must tolerate `cancel_async` being called from another thread while
/// `read_async` is blocked.
pub trait RtlHandle: Send + Sync {
    fn close(&self) -> SdrResult<()>;

    fn set_xtal_freq(&self, rtl_freq: u32, tuner_freq: u32) -> SdrResult<()>;
    fn xtal_freq(&self) -> SdrResult<XtalFreqs>;

    fn usb_strings(&self) -> SdrResult<UsbStrings>;

    fn read_eeprom(&self, offset: u8, len: u16) -> SdrResult<Vec<u8>>;
    fn write_eeprom(&self, data: &[u8], offset: u8, len: u16) -> SdrResult<()>;

    fn set_center_freq(&self, freq: u32) -> SdrResult<()>;
    fn center_freq(&self) -> SdrResult<u32>;

    fn set_freq_correction(&self, ppm: i32) -> SdrResult<()>;
    fn freq_correction(&self) -> SdrResult<i32>;

    fn tuner_type(&self) -> TunerType;

    /// Supported gains in centibels, ascending
    fn tuner_gains(&self) -> SdrResult<Vec<i32>>;

    fn set_tuner_gain(&self, gain: i32) -> SdrResult<()>;
    fn tuner_gain(&self) -> SdrResult<i32>;
    fn set_tuner_gain_mode(&self, manual: bool) -> SdrResult<()>;
    fn set_tuner_bandwidth(&self, bw: u32) -> SdrResult<()>;
    fn set_tuner_if_gain(&self, stage: i32, gain: i32) -> SdrResult<()>;

    fn set_sample_rate(&self, rate: u32) -> SdrResult<()>;
    fn sample_rate(&self) -> SdrResult<u32>;

    fn set_testmode(&self, on: bool) -> SdrResult<()>;
    fn set_agc_mode(&self, on: bool) -> SdrResult<()>;

    fn set_direct_sampling(&self, mode: DirectSampling) -> SdrResult<()>;
    fn direct_sampling(&self) -> SdrResult<DirectSampling>;

    fn set_offset_tuning(&self, on: bool) -> SdrResult<()>;
    fn offset_tuning(&self) -> SdrResult<bool>;

    fn reset_buffer(&self) -> SdrResult<()>;

    /// One blocking read; may return fewer bytes than requested
    fn read_sync(&self, len: usize) -> SdrResult<Vec<u8>>;

    /// Block, invoking `on_buffer` per completed buffer, until cancelled.
    /// Zero `buf_num`/`buf_len` select the driver defaults.
    fn read_async(&self, on_buffer: BufferCallback<'_>, buf_num: u32, buf_len: u32) -> SdrResult<()>;

    /// Deprecated librtlsdr entry point; `read_async` with default geometry
    fn wait_async(&self, on_buffer: BufferCallback<'_>) -> SdrResult<()> {
        self.read_async(on_buffer, 0, 0)
    }

    fn cancel_async(&self) -> SdrResult<()>;
}
