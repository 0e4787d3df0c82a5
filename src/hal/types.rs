use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SdrError;

/// Buffer count librtlsdr uses when `buf_num` is 0
pub const DEFAULT_BUFFER_COUNT: u32 = 15;

/// USB bulk transfers are sized in 512-byte units
pub const BUFFER_LENGTH_UNIT: u32 = 512;

/// Buffer length librtlsdr uses when `buf_len` is 0
pub const DEFAULT_BUFFER_LENGTH: u32 = 32 * BUFFER_LENGTH_UNIT;

/// Largest accepted async buffer count. Each buffer is also a channel slot.
pub const MAX_BUFFER_COUNT: u32 = 1024;

/// Largest accepted async buffer length (4 MiB)
pub const MAX_BUFFER_LENGTH: u32 = 256 * DEFAULT_BUFFER_LENGTH;

/// Addressable EEPROM bytes (8-bit offset)
pub const EEPROM_SIZE: usize = 256;

/// Selected USB descriptor strings of a device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsbStrings {
    /// iManufacturer
    pub vendor: String,
    /// iProduct
    pub product: String,
    /// iSerialNumber
    pub serial: String,
}

/// Crystal frequencies of the RTL2832 and of the tuner, in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XtalFreqs {
    pub rtl_freq: u32,
    pub tuner_freq: u32,
}

/// Device discovery information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_index: u32,
    pub name: String,
    pub usb_strings: UsbStrings,
}

/// Tuner chip fitted to the dongle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunerType {
    Unknown,
    E4000,
    Fc0012,
    Fc0013,
    Fc2580,
    R820T,
    R828D,
}

impl TunerType {
    /// librtlsdr enum name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "RTLSDR_TUNER_UNKNOWN",
            Self::E4000 => "RTLSDR_TUNER_E4000",
            Self::Fc0012 => "RTLSDR_TUNER_FC0012",
            Self::Fc0013 => "RTLSDR_TUNER_FC0013",
            Self::Fc2580 => "RTLSDR_TUNER_FC2580",
            Self::R820T => "RTLSDR_TUNER_R820T",
            Self::R828D => "RTLSDR_TUNER_R828D",
        }
    }
}

impl fmt::Display for TunerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direct sampling input selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectSampling {
    #[default]
    Off,
    /// I-ADC input
    IAdc,
    /// Q-ADC input
    QAdc,
}

impl DirectSampling {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Off => 0,
            Self::IAdc => 1,
            Self::QAdc => 2,
        }
    }
}

impl TryFrom<i64> for DirectSampling {
    type Error = SdrError;

    fn try_from(mode: i64) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::Off),
            1 => Ok(Self::IAdc),
            2 => Ok(Self::QAdc),
            other => Err(SdrError::OutOfRange {
                field: "direct_sampling",
                value: other,
                min: 0,
                max: 2,
            }),
        }
    }
}

/// Tuner IF bandwidth; 0 Hz on the wire means automatic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bandwidth {
    Auto,
    Hz(u32),
}

impl Bandwidth {
    pub fn from_hz(hz: u32) -> Self {
        if hz == 0 {
            Self::Auto
        } else {
            Self::Hz(hz)
        }
    }

    pub fn as_hz(&self) -> u32 {
        match self {
            Self::Auto => 0,
            Self::Hz(hz) => *hz,
        }
    }
}

/// Tuner gain mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainMode {
    Auto,
    Manual,
}

impl GainMode {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl fmt::Display for GainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffer_geometry() {
        assert_eq!(DEFAULT_BUFFER_COUNT, 15);
        assert_eq!(DEFAULT_BUFFER_LENGTH, 16384);
        assert_eq!(DEFAULT_BUFFER_LENGTH % BUFFER_LENGTH_UNIT, 0);
    }

    #[test]
    fn test_bandwidth_zero_is_auto() {
        assert_eq!(Bandwidth::from_hz(0), Bandwidth::Auto);
        assert_eq!(Bandwidth::from_hz(300_000), Bandwidth::Hz(300_000));
        assert_eq!(Bandwidth::Auto.as_hz(), 0);
    }

    #[test]
    fn test_direct_sampling_range() {
        assert_eq!(DirectSampling::try_from(2).unwrap(), DirectSampling::QAdc);
        assert!(DirectSampling::try_from(3).is_err());
        assert!(DirectSampling::try_from(-1).is_err());
    }

    #[test]
    fn test_tuner_type_names() {
        assert_eq!(TunerType::R820T.to_string(), "RTLSDR_TUNER_R820T");
        assert_eq!(TunerType::Unknown.as_str(), "RTLSDR_TUNER_UNKNOWN");
    }
}
