pub mod fields;
pub mod gain;
pub mod settings;

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::{ReadMode, SampleStream, StreamEngine, StreamState};
use crate::error::{SdrError, SdrResult};
use crate::hal::{
    Bandwidth, DirectSampling, GainMode, RtlDriver, RtlHandle, TunerType, UsbStrings, XtalFreqs,
};
use crate::observability::StreamMetrics;
use crate::validate::{self, BufferGeometry};
use fields::{cached_field, live_field};

pub use fields::{FieldSource, FieldSpec, FIELDS};
pub use gain::{GainRequest, TunerGainReading, TunerGainSetting};
pub use settings::Settings;

/// Values the hardware cannot report back
#[derive(Debug, Clone, Default)]
struct SettingsCache {
    gain_mode: Option<GainMode>,
    tuner_bandwidth: Option<Bandwidth>,
    if_gains: BTreeMap<i32, i32>,
    testmode: Option<bool>,
    agc: Option<bool>,
}

/// One open RTL-SDR device.
///
/// Mutating calls take `&mut self`; the only other actor touching the
/// handle is the reader thread of an active stream. Once closed, every
/// operation except `close`, `is_open` and `device_index` fails with
/// [`SdrError::DeviceClosed`].
pub struct DeviceSession {
    index: u32,
    handle: Arc<dyn RtlHandle>,
    open: bool,
    cache: SettingsCache,
    engine: StreamEngine,
}

impl DeviceSession {
    pub fn open(driver: &dyn RtlDriver, index: u32) -> SdrResult<Self> {
        let handle = driver.open(index)?;
        info!("device {} opened", index);
        Ok(Self {
            index,
            handle,
            open: true,
            cache: SettingsCache::default(),
            engine: StreamEngine::new(index),
        })
    }

    pub fn device_index(&self) -> u32 {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn live(&self) -> SdrResult<&dyn RtlHandle> {
        if !self.open {
            return Err(SdrError::DeviceClosed);
        }
        Ok(self.handle.as_ref())
    }

    /// Release the device. Any active stream is cancelled and its reader
    /// joined first. Closing a closed session is a no-op.
    pub fn close(&mut self) -> SdrResult<()> {
        if !self.open {
            return Ok(());
        }

        self.engine.shutdown(self.handle.as_ref());
        self.handle.close()?;
        self.open = false;
        info!("device {} closed", self.index);
        Ok(())
    }

    live_field!("center_freq", center_freq, set_center_freq, u32, center_freq, set_center_freq);
    live_field!(
        "freq_correction",
        freq_correction,
        set_freq_correction,
        i32,
        freq_correction,
        set_freq_correction
    );
    live_field!("sample_rate", sample_rate, set_sample_rate, u32, sample_rate, set_sample_rate);
    live_field!(
        "direct_sampling",
        direct_sampling,
        set_direct_sampling,
        DirectSampling,
        direct_sampling,
        set_direct_sampling
    );
    live_field!("offset_tuning", offset_tuning, set_offset_tuning, bool, offset_tuning, set_offset_tuning);

    cached_field!(
        "tuner_bandwidth",
        tuner_bandwidth,
        set_tuner_bandwidth,
        Bandwidth,
        tuner_bandwidth,
        set_tuner_bandwidth,
        |bw: Bandwidth| bw.as_hz()
    );
    cached_field!("testmode", testmode, set_testmode, bool, testmode, set_testmode, |on: bool| on);
    cached_field!("agc", agc, set_agc, bool, agc, set_agc_mode, |on: bool| on);

    pub fn xtal_freq(&self) -> SdrResult<XtalFreqs> {
        self.live()?.xtal_freq()
    }

    /// The tuner crystal defaults to the RTL crystal
    pub fn set_xtal_freq(&mut self, rtl_freq: u32, tuner_freq: Option<u32>) -> SdrResult<()> {
        let tuner_freq = tuner_freq.unwrap_or(rtl_freq);
        debug!("device {} xtal_freq <- {}/{}", self.index, rtl_freq, tuner_freq);
        self.live()?.set_xtal_freq(rtl_freq, tuner_freq)
    }

    pub fn tuner_if_gain(&self, stage: i32) -> SdrResult<Option<i32>> {
        self.live()?;
        Ok(self.cache.if_gains.get(&stage).copied())
    }

    /// Snapshot of every IF gain set through this session
    pub fn tuner_if_gains(&self) -> SdrResult<BTreeMap<i32, i32>> {
        self.live()?;
        Ok(self.cache.if_gains.clone())
    }

    pub fn set_tuner_if_gain(&mut self, stage: i32, gain: i32) -> SdrResult<()> {
        debug!("device {} if_gain[{}] <- {}", self.index, stage, gain);
        self.live()?.set_tuner_if_gain(stage, gain)?;
        self.cache.if_gains.insert(stage, gain);
        Ok(())
    }

    pub fn usb_strings(&self) -> SdrResult<UsbStrings> {
        self.live()?.usb_strings()
    }

    pub fn tuner_type(&self) -> SdrResult<TunerType> {
        Ok(self.live()?.tuner_type())
    }

    pub fn read_eeprom(&self, offset: i64, length: i64) -> SdrResult<Vec<u8>> {
        let region = validate::eeprom_region(offset, length)?;
        self.live()?.read_eeprom(region.offset(), region.length())
    }

    pub fn write_eeprom(&mut self, data: &[u8], offset: i64, length: i64) -> SdrResult<()> {
        let region = validate::eeprom_region(offset, length)?;
        validate::eeprom_write(data, &region)?;
        debug!("device {} eeprom[{}..+{}] written", self.index, region.offset(), region.length());
        self.live()?.write_eeprom(data, region.offset(), region.length())
    }

    /// Yields to the runtime once, then performs the read
    pub async fn read_eeprom_async(&self, offset: i64, length: i64) -> SdrResult<Vec<u8>> {
        tokio::task::yield_now().await;
        self.read_eeprom(offset, length)
    }

    /// Yields to the runtime once, then performs the write
    pub async fn write_eeprom_async(&mut self, data: &[u8], offset: i64, length: i64) -> SdrResult<()> {
        tokio::task::yield_now().await;
        self.write_eeprom(data, offset, length)
    }

    /// Reset the device buffer and do one blocking read. The device may
    /// return fewer than `length` bytes.
    pub fn read_samples_once(&mut self, length: usize) -> SdrResult<Vec<u8>> {
        let handle = self.live()?;
        if self.engine.is_streaming() {
            return Err(SdrError::InvalidState(
                "cannot read synchronously while streaming".to_string(),
            ));
        }
        handle.reset_buffer()?;
        handle.read_sync(length)
    }

    /// Start streaming on a background reader. `None` or zero parameters
    /// select the driver defaults.
    pub fn start(&mut self, buffer_count: Option<u32>, buffer_length: Option<u32>) -> SdrResult<SampleStream> {
        self.live()?;
        if self.engine.is_streaming() {
            return Err(SdrError::InvalidState("a stream is already active".to_string()));
        }
        let geometry = validate::buffer_geometry(buffer_count, buffer_length)?;
        self.engine.start(self.handle.clone(), geometry, ReadMode::Async)
    }

    /// Streams through the deprecated `rtlsdr_wait_async` entry point
    #[deprecated(note = "use `start`; librtlsdr deprecated rtlsdr_wait_async")]
    pub fn wait(&mut self) -> SdrResult<SampleStream> {
        self.live()?;
        self.engine
            .start(self.handle.clone(), BufferGeometry::default(), ReadMode::Wait)
    }

    /// Request the active stream to stop. Its `Done` event follows later.
    pub fn cancel(&mut self) -> SdrResult<()> {
        let handle = self.live()?;
        self.engine.cancel(handle)
    }

    pub fn stream_state(&self) -> StreamState {
        self.engine.state()
    }

    /// Counters of the most recent stream
    pub fn stream_metrics(&self) -> Option<Arc<StreamMetrics>> {
        self.engine.metrics()
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("device {} failed to close on drop: {}", self.index, e);
        }
    }
}
