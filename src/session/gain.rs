use log::debug;
use serde_json::Value;

use super::DeviceSession;
use crate::error::{SdrError, SdrResult};
use crate::hal::GainMode;
use crate::validate;

/// How to change the tuner gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainRequest {
    /// Hardware-controlled gain
    Auto,
    /// Switch to manual gain without touching the gain value
    Manual,
    /// Manual gain, snapped to the closest supported value
    Nearest(f64),
    /// Manual gain, written as given
    Exact(i32),
}

/// Effective tuner gain configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerGainSetting {
    Auto,
    Manual(i32),
}

/// Result of reading the tuner gain: the mode last set through the session
/// and the value the device reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunerGainReading {
    pub mode: Option<GainMode>,
    pub value: i32,
}

impl TunerGainReading {
    /// `None` until a gain mode has been set
    pub fn setting(&self) -> Option<TunerGainSetting> {
        self.mode.map(|mode| match mode {
            GainMode::Auto => TunerGainSetting::Auto,
            GainMode::Manual => TunerGainSetting::Manual(self.value),
        })
    }
}

/// Closest entry of `gains` to `target`; on a tie the earlier entry wins.
/// `target` must be finite.
pub fn nearest_gain(gains: &[i32], target: f64) -> Option<i32> {
    let mut best: Option<(i32, f64)> = None;
    for &gain in gains {
        let distance = (gain as f64 - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((gain, distance)),
        }
    }
    best.map(|(gain, _)| gain)
}

impl DeviceSession {
    /// Supported gains in centibels
    pub fn tuner_gains(&self) -> SdrResult<Vec<i32>> {
        self.live()?.tuner_gains()
    }

    pub fn nearest_tuner_gain(&self, target: f64) -> SdrResult<i32> {
        if !target.is_finite() {
            return Err(SdrError::InvalidArgument(format!(
                "gain target must be a finite number (got {})",
                target
            )));
        }
        let gains = self.tuner_gains()?;
        nearest_gain(&gains, target)
            .ok_or_else(|| SdrError::InvalidState("tuner reports no supported gains".to_string()))
    }

    /// `nearest_tuner_gain` for a dynamically typed target
    pub fn nearest_tuner_gain_value(&self, target: &Value) -> SdrResult<i32> {
        self.nearest_tuner_gain(validate::number("gain", target)?)
    }

    pub fn tuner_gain(&self) -> SdrResult<TunerGainReading> {
        let value = self.live()?.tuner_gain()?;
        Ok(TunerGainReading {
            mode: self.cache.gain_mode,
            value,
        })
    }

    pub fn tuner_gain_mode(&self) -> SdrResult<Option<GainMode>> {
        self.live()?;
        Ok(self.cache.gain_mode)
    }

    pub fn set_tuner_gain(&mut self, request: GainRequest) -> SdrResult<()> {
        debug!("device {} tuner_gain <- {:?}", self.index, request);
        let handle = self.live()?;

        let gain = match request {
            GainRequest::Auto => {
                handle.set_tuner_gain_mode(false)?;
                self.cache.gain_mode = Some(GainMode::Auto);
                return Ok(());
            }
            GainRequest::Manual => {
                handle.set_tuner_gain_mode(true)?;
                self.cache.gain_mode = Some(GainMode::Manual);
                return Ok(());
            }
            GainRequest::Nearest(target) => self.nearest_tuner_gain(target)?,
            GainRequest::Exact(gain) => gain,
        };

        self.live()?.set_tuner_gain_mode(true)?;
        self.cache.gain_mode = Some(GainMode::Manual);
        self.live()?.set_tuner_gain(gain)
    }
}
