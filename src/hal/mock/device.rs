use log::trace;
use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard};

use super::device_table::SimulatedDeviceSpec;
use crate::error::{SdrError, SdrResult};
use crate::hal::traits::{BufferCallback, RtlHandle};
use crate::hal::types::{
    DirectSampling, TunerType, UsbStrings, XtalFreqs, BUFFER_LENGTH_UNIT, DEFAULT_BUFFER_COUNT,
    DEFAULT_BUFFER_LENGTH, EEPROM_SIZE,
};

/// Byte every simulated sample buffer is filled with
pub const FILL_BYTE: u8 = b'd';

const ERR_INVALID_HANDLE: i32 = -1;
const ERR_EEPROM_SIZE: i32 = -2;
const ERR_NO_EEPROM: i32 = -3;
const ERR_BUFFER_NOT_READY: i32 = -8;
const ERR_INVALID_RATE: i32 = -22;

/// Mutable per-device state of a simulated dongle
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedState {
    pub index: u32,
    pub open: bool,
    pub rtl_freq: u32,
    pub tuner_freq: u32,
    pub center_freq: u32,
    pub freq_correction: i32,
    pub tuner_gain: i32,
    pub tuner_gain_manual: bool,
    pub tuner_bandwidth: u32,
    pub if_gains: BTreeMap<i32, i32>,
    pub sample_rate: u32,
    pub testmode: bool,
    pub agc_mode: bool,
    pub direct_sampling: DirectSampling,
    pub offset_tuning: bool,
    /// Negative values make every call fail with this code
    pub error_code: i32,
    pub buffer_ready: bool,
    /// Bytes withheld from each sync read
    pub sync_read_discount: usize,
    pub has_eeprom: bool,
    /// Backing store of EEPROM writes; `None` until the first write
    pub eeprom: Option<Vec<u8>>,
    /// Async buffers left before the read loop pauses; `None` never pauses
    pub stall_budget: Option<u64>,
    pub buffers_delivered: u64,
}

impl SimulatedState {
    fn new(index: u32, has_eeprom: bool) -> Self {
        Self {
            index,
            open: true,
            rtl_freq: 0,
            tuner_freq: 0,
            center_freq: 0,
            freq_correction: 0,
            tuner_gain: 0,
            tuner_gain_manual: false,
            tuner_bandwidth: 0,
            if_gains: BTreeMap::new(),
            sample_rate: 0,
            testmode: false,
            agc_mode: false,
            direct_sampling: DirectSampling::Off,
            offset_tuning: false,
            error_code: 0,
            buffer_ready: false,
            sync_read_discount: 0,
            has_eeprom,
            eeprom: None,
            stall_budget: None,
            buffers_delivered: 0,
        }
    }
}

/// Deterministic stand-in for one open RTL-SDR dongle
pub struct SimulatedHandle {
    spec: SimulatedDeviceSpec,
    state: Mutex<SimulatedState>,
    wakeup: Condvar,
}

impl SimulatedHandle {
    pub fn new(index: u32, spec: SimulatedDeviceSpec) -> Self {
        let state = SimulatedState::new(index, spec.has_eeprom);
        Self {
            spec,
            state: Mutex::new(state),
            wakeup: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the state, failing the way the driver would for `call`
    fn checked(&self, call: &'static str) -> SdrResult<MutexGuard<'_, SimulatedState>> {
        let state = self.lock();
        if !state.open {
            return Err(SdrError::transport(call, ERR_INVALID_HANDLE));
        }
        if state.error_code < 0 {
            return Err(SdrError::transport(call, state.error_code));
        }
        Ok(state)
    }

    pub fn spec(&self) -> &SimulatedDeviceSpec {
        &self.spec
    }

    pub fn snapshot(&self) -> SimulatedState {
        self.lock().clone()
    }

    /// Mutate the raw device state, waking a paused read loop
    pub fn update<F: FnOnce(&mut SimulatedState)>(&self, f: F) {
        f(&mut self.lock());
        self.wakeup.notify_all();
    }

    /// Make every subsequent call fail with `code`; 0 clears it
    pub fn inject_error(&self, code: i32) {
        self.update(|s| s.error_code = code);
    }

    pub fn set_buffer_ready(&self, ready: bool) {
        self.update(|s| s.buffer_ready = ready);
    }

    pub fn set_sync_read_discount(&self, discount: usize) {
        self.update(|s| s.sync_read_discount = discount);
    }

    pub fn set_has_eeprom(&self, present: bool) {
        self.update(|s| s.has_eeprom = present);
    }

    /// Deliver `buffers` more async buffers, then pause until cancelled,
    /// failed or released
    pub fn stall_after(&self, buffers: u64) {
        self.update(|s| s.stall_budget = Some(buffers));
    }

    /// Let a paused read loop run freely again
    pub fn release(&self) {
        self.update(|s| s.stall_budget = None);
    }

    pub fn written_eeprom(&self) -> Option<Vec<u8>> {
        self.lock().eeprom.clone()
    }

    fn eeprom_window(state: &SimulatedState, call: &'static str, offset: u8, len: u16) -> SdrResult<()> {
        if offset as usize + len as usize > EEPROM_SIZE {
            return Err(SdrError::transport(call, ERR_EEPROM_SIZE));
        }
        if !state.has_eeprom {
            return Err(SdrError::transport(call, ERR_NO_EEPROM));
        }
        Ok(())
    }

    /// Wait for permission to deliver one more async buffer.
    /// `Ok(false)` means the loop should end normally.
    fn next_async_buffer(&self, call: &'static str) -> SdrResult<bool> {
        let mut state = self.lock();
        loop {
            if !state.open {
                return Err(SdrError::transport(call, ERR_INVALID_HANDLE));
            }
            if state.error_code < 0 {
                state.buffer_ready = false;
                return Err(SdrError::transport(call, state.error_code));
            }
            if !state.buffer_ready {
                return Ok(false);
            }

            let budget = state.stall_budget;
            match budget {
                Some(0) => {
                    state = self
                        .wakeup
                        .wait(state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                Some(n) => {
                    state.stall_budget = Some(n - 1);
                    break;
                }
                None => break,
            }
        }

        state.buffers_delivered += 1;
        Ok(true)
    }
}

fn valid_sample_rate(rate: u32) -> bool {
    (225_001..=300_000).contains(&rate) || (900_001..=3_200_000).contains(&rate)
}

impl RtlHandle for SimulatedHandle {
    fn close(&self) -> SdrResult<()> {
        self.checked("rtlsdr_close")?.open = false;
        self.wakeup.notify_all();
        Ok(())
    }

    fn set_xtal_freq(&self, rtl_freq: u32, tuner_freq: u32) -> SdrResult<()> {
        let mut state = self.checked("rtlsdr_set_xtal_freq")?;
        state.rtl_freq = rtl_freq;
        state.tuner_freq = tuner_freq;
        Ok(())
    }

    fn xtal_freq(&self) -> SdrResult<XtalFreqs> {
        let state = self.checked("rtlsdr_get_xtal_freq")?;
        Ok(XtalFreqs {
            rtl_freq: state.rtl_freq,
            tuner_freq: state.tuner_freq,
        })
    }

    fn usb_strings(&self) -> SdrResult<UsbStrings> {
        self.checked("rtlsdr_get_usb_strings")?;
        Ok(self.spec.usb_strings())
    }

    fn read_eeprom(&self, offset: u8, len: u16) -> SdrResult<Vec<u8>> {
        let state = self.checked("rtlsdr_read_eeprom")?;
        Self::eeprom_window(&state, "rtlsdr_read_eeprom", offset, len)?;

        let mut data = format!("Mock RTLSDR read_eeprom Contents {}+{}", offset, len).into_bytes();
        data.resize(len as usize, 0);
        Ok(data)
    }

    fn write_eeprom(&self, data: &[u8], offset: u8, len: u16) -> SdrResult<()> {
        let mut state = self.checked("rtlsdr_write_eeprom")?;
        Self::eeprom_window(&state, "rtlsdr_write_eeprom", offset, len)?;

        let start = offset as usize;
        let end = start + len as usize;
        let count = (len as usize).min(data.len());
        let backing = state.eeprom.get_or_insert_with(|| vec![0u8; EEPROM_SIZE]);
        backing[start..start + count].copy_from_slice(&data[..count]);
        trace!("simulated EEPROM write {}..{}", start, end);
        Ok(())
    }

    fn set_center_freq(&self, freq: u32) -> SdrResult<()> {
        self.checked("rtlsdr_set_center_freq")?.center_freq = freq;
        Ok(())
    }

    fn center_freq(&self) -> SdrResult<u32> {
        Ok(self.checked("rtlsdr_get_center_freq")?.center_freq)
    }

    fn set_freq_correction(&self, ppm: i32) -> SdrResult<()> {
        self.checked("rtlsdr_set_freq_correction")?.freq_correction = ppm;
        Ok(())
    }

    fn freq_correction(&self) -> SdrResult<i32> {
        Ok(self.checked("rtlsdr_get_freq_correction")?.freq_correction)
    }

    fn tuner_type(&self) -> TunerType {
        if self.lock().open {
            self.spec.tuner_type
        } else {
            TunerType::Unknown
        }
    }

    fn tuner_gains(&self) -> SdrResult<Vec<i32>> {
        self.checked("rtlsdr_get_tuner_gains")?;
        Ok(self.spec.tuner_gains.clone())
    }

    fn set_tuner_gain(&self, gain: i32) -> SdrResult<()> {
        self.checked("rtlsdr_set_tuner_gain")?.tuner_gain = gain;
        Ok(())
    }

    fn tuner_gain(&self) -> SdrResult<i32> {
        Ok(self.checked("rtlsdr_get_tuner_gain")?.tuner_gain)
    }

    fn set_tuner_gain_mode(&self, manual: bool) -> SdrResult<()> {
        self.checked("rtlsdr_set_tuner_gain_mode")?.tuner_gain_manual = manual;
        Ok(())
    }

    fn set_tuner_bandwidth(&self, bw: u32) -> SdrResult<()> {
        self.checked("rtlsdr_set_tuner_bandwidth")?.tuner_bandwidth = bw;
        Ok(())
    }

    fn set_tuner_if_gain(&self, stage: i32, gain: i32) -> SdrResult<()> {
        self.checked("rtlsdr_set_tuner_if_gain")?.if_gains.insert(stage, gain);
        Ok(())
    }

    fn set_sample_rate(&self, rate: u32) -> SdrResult<()> {
        let mut state = self.checked("rtlsdr_set_sample_rate")?;
        if !valid_sample_rate(rate) {
            return Err(SdrError::transport("rtlsdr_set_sample_rate", ERR_INVALID_RATE));
        }
        state.sample_rate = rate;
        Ok(())
    }

    fn sample_rate(&self) -> SdrResult<u32> {
        Ok(self.checked("rtlsdr_get_sample_rate")?.sample_rate)
    }

    fn set_testmode(&self, on: bool) -> SdrResult<()> {
        self.checked("rtlsdr_set_testmode")?.testmode = on;
        Ok(())
    }

    fn set_agc_mode(&self, on: bool) -> SdrResult<()> {
        self.checked("rtlsdr_set_agc_mode")?.agc_mode = on;
        Ok(())
    }

    fn set_direct_sampling(&self, mode: DirectSampling) -> SdrResult<()> {
        self.checked("rtlsdr_set_direct_sampling")?.direct_sampling = mode;
        Ok(())
    }

    fn direct_sampling(&self) -> SdrResult<DirectSampling> {
        Ok(self.checked("rtlsdr_get_direct_sampling")?.direct_sampling)
    }

    fn set_offset_tuning(&self, on: bool) -> SdrResult<()> {
        self.checked("rtlsdr_set_offset_tuning")?.offset_tuning = on;
        Ok(())
    }

    fn offset_tuning(&self) -> SdrResult<bool> {
        Ok(self.checked("rtlsdr_get_offset_tuning")?.offset_tuning)
    }

    fn reset_buffer(&self) -> SdrResult<()> {
        self.checked("rtlsdr_reset_buffer")?.buffer_ready = true;
        self.wakeup.notify_all();
        Ok(())
    }

    fn read_sync(&self, len: usize) -> SdrResult<Vec<u8>> {
        let state = self.checked("rtlsdr_read_sync")?;
        if !state.buffer_ready {
            return Err(SdrError::transport("rtlsdr_read_sync", ERR_BUFFER_NOT_READY));
        }
        Ok(vec![FILL_BYTE; len.saturating_sub(state.sync_read_discount)])
    }

    fn read_async(&self, on_buffer: BufferCallback<'_>, buf_num: u32, buf_len: u32) -> SdrResult<()> {
        const CALL: &str = "rtlsdr_read_async";

        let buf_num = if buf_num == 0 { DEFAULT_BUFFER_COUNT } else { buf_num };
        let buf_len = if buf_len == 0 { DEFAULT_BUFFER_LENGTH } else { buf_len };
        if buf_len % BUFFER_LENGTH_UNIT != 0 {
            return Err(SdrError::transport(CALL, ERR_INVALID_HANDLE));
        }
        drop(self.checked(CALL)?);
        trace!("simulated async read: {} x {} bytes", buf_num, buf_len);

        while self.next_async_buffer(CALL)? {
            let buffer = vec![FILL_BYTE; buf_len as usize];
            on_buffer(&buffer);
        }

        Ok(())
    }

    fn cancel_async(&self) -> SdrResult<()> {
        self.checked("rtlsdr_cancel_async")?.buffer_ready = false;
        self.wakeup.notify_all();
        Ok(())
    }
}
