use log::{debug, warn};
use serde_json::Value;

use super::{DeviceSession, GainRequest};
use crate::error::{SdrError, SdrResult};
use crate::hal::{Bandwidth, DirectSampling};
use crate::validate;

/// A fully validated batch of device settings.
///
/// Built from a JSON object such as the `settings` section of a host
/// configuration file. Unset fields are left untouched on the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub xtal_freq: Option<(u32, Option<u32>)>,
    pub freq_correction: Option<i32>,
    pub sample_rate: Option<u32>,
    pub center_freq: Option<u32>,
    pub direct_sampling: Option<DirectSampling>,
    pub offset_tuning: Option<bool>,
    pub tuner_bandwidth: Option<Bandwidth>,
    pub tuner_gain: Option<GainRequest>,
    pub if_gains: Vec<(i32, i32)>,
    pub agc: Option<bool>,
    pub testmode: Option<bool>,
}

fn xtal_freq(value: &Value) -> SdrResult<(u32, Option<u32>)> {
    match value {
        Value::Object(map) => {
            let rtl = map.get("rtl").ok_or(SdrError::TypeMismatch {
                field: "xtal_freq",
                expected: "a number or an object with an rtl frequency",
            })?;
            let tuner = map
                .get("tuner")
                .map(|t| validate::uint32("xtal_freq.tuner", t))
                .transpose()?;
            Ok((validate::uint32("xtal_freq.rtl", rtl)?, tuner))
        }
        other => Ok((validate::uint32("xtal_freq", other)?, None)),
    }
}

impl Settings {
    pub fn from_value(value: &Value) -> SdrResult<Self> {
        let map = value.as_object().ok_or(SdrError::TypeMismatch {
            field: "settings",
            expected: "an object",
        })?;

        let mut settings = Settings::default();
        for (key, v) in map {
            match key.as_str() {
                "xtal_freq" => settings.xtal_freq = Some(xtal_freq(v)?),
                "freq_correction" => settings.freq_correction = Some(validate::int32("freq_correction", v)?),
                "sample_rate" => settings.sample_rate = Some(validate::uint32("sample_rate", v)?),
                "center_freq" => settings.center_freq = Some(validate::uint32("center_freq", v)?),
                "direct_sampling" => settings.direct_sampling = Some(validate::direct_sampling(v)?),
                "offset_tuning" => settings.offset_tuning = Some(validate::boolean("offset_tuning", v)?),
                "tuner_bandwidth" => settings.tuner_bandwidth = Some(validate::bandwidth(v)?),
                "tuner_gain" | "tuner_gain_exact" => {
                    if settings.tuner_gain.is_some() {
                        return Err(SdrError::InvalidArgument(
                            "tuner_gain and tuner_gain_exact are mutually exclusive".to_string(),
                        ));
                    }
                    settings.tuner_gain = Some(validate::gain_request(v, key == "tuner_gain_exact")?);
                }
                "if_gains" => {
                    let entries = v.as_array().ok_or(SdrError::TypeMismatch {
                        field: "if_gains",
                        expected: "a list of {stage, gain} objects",
                    })?;
                    settings.if_gains = entries
                        .iter()
                        .map(validate::if_gain_entry)
                        .collect::<SdrResult<_>>()?;
                }
                "agc" => settings.agc = Some(validate::boolean("agc", v)?),
                "testmode" => settings.testmode = Some(validate::boolean("testmode", v)?),
                other => warn!("ignoring unknown device setting '{}'", other),
            }
        }

        Ok(settings)
    }
}

impl DeviceSession {
    /// Validate every setting in `value`, then apply them. Nothing reaches
    /// the device unless the whole object is valid.
    pub fn configure(&mut self, value: &Value) -> SdrResult<()> {
        let settings = Settings::from_value(value)?;
        self.apply(&settings)
    }

    /// Apply settings in hardware dependency order: clocks first, then
    /// tuning, then gain
    pub fn apply(&mut self, settings: &Settings) -> SdrResult<()> {
        self.live()?;
        debug!("device {} applying {:?}", self.index, settings);

        if let Some((rtl, tuner)) = settings.xtal_freq {
            self.set_xtal_freq(rtl, tuner)?;
        }
        if let Some(ppm) = settings.freq_correction {
            self.set_freq_correction(ppm)?;
        }
        if let Some(rate) = settings.sample_rate {
            self.set_sample_rate(rate)?;
        }
        if let Some(mode) = settings.direct_sampling {
            self.set_direct_sampling(mode)?;
        }
        if let Some(on) = settings.offset_tuning {
            self.set_offset_tuning(on)?;
        }
        if let Some(freq) = settings.center_freq {
            self.set_center_freq(freq)?;
        }
        if let Some(bw) = settings.tuner_bandwidth {
            self.set_tuner_bandwidth(bw)?;
        }
        if let Some(request) = settings.tuner_gain {
            self.set_tuner_gain(request)?;
        }
        for &(stage, gain) in &settings.if_gains {
            self.set_tuner_if_gain(stage, gain)?;
        }
        if let Some(on) = settings.agc {
            self.set_agc(on)?;
        }
        if let Some(on) = settings.testmode {
            self.set_testmode(on)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_full_settings() {
        let settings = Settings::from_value(&json!({
            "xtal_freq": {"rtl": 28800000, "tuner": 28800100},
            "center_freq": 100000000,
            "sample_rate": 2048000,
            "tuner_gain": "auto",
            "tuner_bandwidth": "auto",
            "if_gains": [{"stage": 1, "gain": 30}],
            "direct_sampling": 2,
            "agc": false
        }))
        .unwrap();

        assert_eq!(settings.xtal_freq, Some((28_800_000, Some(28_800_100))));
        assert_eq!(settings.tuner_gain, Some(GainRequest::Auto));
        assert_eq!(settings.tuner_bandwidth, Some(Bandwidth::Auto));
        assert_eq!(settings.if_gains, vec![(1, 30)]);
        assert_eq!(settings.direct_sampling, Some(DirectSampling::QAdc));
        assert_eq!(settings.testmode, None);
    }

    #[test]
    fn test_exact_gain_key() {
        let settings = Settings::from_value(&json!({"tuner_gain_exact": 33})).unwrap();
        assert_eq!(settings.tuner_gain, Some(GainRequest::Exact(33)));
    }

    #[test]
    fn test_both_gain_keys_rejected() {
        let err = Settings::from_value(&json!({"tuner_gain": 10, "tuner_gain_exact": 33})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_non_object_rejected() {
        let err = Settings::from_value(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_gain_without_stage() {
        let err = Settings::from_value(&json!({"if_gains": [{"gain": 30}]})).unwrap_err();
        assert_eq!(err.to_string(), "cannot specify gain without specifying stage");
    }
}
