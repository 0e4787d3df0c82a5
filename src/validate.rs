//! Parameter checks applied before anything reaches the hardware.
//!
//! Two families live here: typed range checks used by the session API
//! (EEPROM windows, stream buffer geometry) and checks over dynamic
//! `serde_json::Value`s, which is how settings arrive from configuration
//! files. Everything is pure; the same input always gives the same answer.

use serde_json::Value;

use crate::error::{SdrError, SdrResult};
use crate::hal::types::{
    Bandwidth, DirectSampling, BUFFER_LENGTH_UNIT, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_LENGTH,
    MAX_BUFFER_COUNT, MAX_BUFFER_LENGTH,
};
use crate::session::GainRequest;

pub const EEPROM_OFFSET_MAX: i64 = u8::MAX as i64;
pub const EEPROM_LENGTH_MAX: i64 = u16::MAX as i64;

/// A validated EEPROM byte window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromRegion {
    offset: u8,
    length: u16,
}

impl EepromRegion {
    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }
}

/// Validated async read geometry, defaults already substituted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferGeometry {
    pub buffer_count: u32,
    pub buffer_length: u32,
}

impl Default for BufferGeometry {
    fn default() -> Self {
        Self {
            buffer_count: DEFAULT_BUFFER_COUNT,
            buffer_length: DEFAULT_BUFFER_LENGTH,
        }
    }
}

pub fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> SdrResult<i64> {
    if value < min || value > max {
        return Err(SdrError::OutOfRange { field, value, min, max });
    }
    Ok(value)
}

pub fn eeprom_region(offset: i64, length: i64) -> SdrResult<EepromRegion> {
    let offset = bounded("offset", offset, 0, EEPROM_OFFSET_MAX)?;
    let length = bounded("length", length, 0, EEPROM_LENGTH_MAX)?;
    Ok(EepromRegion {
        offset: offset as u8,
        length: length as u16,
    })
}

/// The buffer handed to an EEPROM write must hold exactly the declared length
pub fn eeprom_write(data: &[u8], region: &EepromRegion) -> SdrResult<()> {
    if data.len() != region.length as usize {
        return Err(SdrError::TypeMismatch {
            field: "data",
            expected: "a byte buffer of the declared write length",
        });
    }
    Ok(())
}

/// Zero or absent values fall back to the driver defaults
pub fn buffer_geometry(buffer_count: Option<u32>, buffer_length: Option<u32>) -> SdrResult<BufferGeometry> {
    let buffer_count = match buffer_count {
        None | Some(0) => DEFAULT_BUFFER_COUNT,
        Some(n) if n > MAX_BUFFER_COUNT => {
            return Err(SdrError::InvalidArgument(format!(
                "buffer count must be at most {} (got {})",
                MAX_BUFFER_COUNT, n
            )));
        }
        Some(n) => n,
    };
    let buffer_length = match buffer_length {
        None | Some(0) => DEFAULT_BUFFER_LENGTH,
        Some(len) if len % BUFFER_LENGTH_UNIT != 0 => {
            return Err(SdrError::InvalidArgument(format!(
                "buffer length must be a multiple of {} (got {})",
                BUFFER_LENGTH_UNIT, len
            )));
        }
        Some(len) if len > MAX_BUFFER_LENGTH => {
            return Err(SdrError::InvalidArgument(format!(
                "buffer length must be at most {} (got {})",
                MAX_BUFFER_LENGTH, len
            )));
        }
        Some(len) => len,
    };

    Ok(BufferGeometry { buffer_count, buffer_length })
}

pub fn number(field: &'static str, value: &Value) -> SdrResult<f64> {
    value.as_f64().ok_or(SdrError::TypeMismatch { field, expected: "a number" })
}

pub fn integer(field: &'static str, value: &Value) -> SdrResult<i64> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    if value.is_u64() {
        // Only u64 values above i64::MAX get here
        return Err(SdrError::OutOfRange { field, value: i64::MAX, min: i64::MIN, max: i64::MAX });
    }

    let f = number(field, value)?;
    if f.fract() != 0.0 || f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(SdrError::TypeMismatch { field, expected: "an integer" });
    }
    Ok(f as i64)
}

pub fn uint32(field: &'static str, value: &Value) -> SdrResult<u32> {
    let v = integer(field, value)?;
    Ok(bounded(field, v, 0, u32::MAX as i64)? as u32)
}

pub fn int32(field: &'static str, value: &Value) -> SdrResult<i32> {
    let v = integer(field, value)?;
    Ok(bounded(field, v, i32::MIN as i64, i32::MAX as i64)? as i32)
}

pub fn boolean(field: &'static str, value: &Value) -> SdrResult<bool> {
    value.as_bool().ok_or(SdrError::TypeMismatch { field, expected: "a boolean" })
}

pub fn string<'a>(field: &'static str, value: &'a Value) -> SdrResult<&'a str> {
    value.as_str().ok_or(SdrError::TypeMismatch { field, expected: "a string" })
}

pub fn direct_sampling(value: &Value) -> SdrResult<DirectSampling> {
    DirectSampling::try_from(integer("direct_sampling", value)?)
}

/// `"auto"`, `0`, or a positive number of Hz, rounded to whole Hz
pub fn bandwidth(value: &Value) -> SdrResult<Bandwidth> {
    let invalid = || SdrError::InvalidArgument("bw must be 'auto' or a positive number".to_string());

    if value.as_str() == Some("auto") {
        return Ok(Bandwidth::Auto);
    }
    let hz = value.as_f64().ok_or_else(invalid)?.round();
    if hz < 0.0 || hz > u32::MAX as f64 {
        return Err(invalid());
    }
    if hz == 0.0 {
        return Ok(Bandwidth::Auto);
    }
    Ok(Bandwidth::Hz(hz as u32))
}

/// `"auto"`, `"manual"`, or a gain in centibels. Exact gains must be
/// integers; nearest-gain targets may be any finite number.
pub fn gain_request(value: &Value, exact: bool) -> SdrResult<GainRequest> {
    match value {
        Value::String(s) if s == "auto" => Ok(GainRequest::Auto),
        Value::String(s) if s == "manual" => Ok(GainRequest::Manual),
        Value::Number(_) if exact => Ok(GainRequest::Exact(int32("gain", value)?)),
        Value::Number(_) => Ok(GainRequest::Nearest(number("gain", value)?)),
        _ => Err(SdrError::InvalidArgument(
            "gain must be 'auto', 'manual', or a number".to_string(),
        )),
    }
}

/// One `{ "stage": n, "gain": g }` entry
pub fn if_gain_entry(value: &Value) -> SdrResult<(i32, i32)> {
    let entry = value.as_object().ok_or(SdrError::TypeMismatch {
        field: "if_gains",
        expected: "a list of {stage, gain} objects",
    })?;

    match (entry.get("stage"), entry.get("gain")) {
        (Some(stage), Some(gain)) => Ok((int32("stage", stage)?, int32("gain", gain)?)),
        (None, Some(_)) => Err(SdrError::InvalidArgument(
            "cannot specify gain without specifying stage".to_string(),
        )),
        (Some(_), None) | (None, None) => Err(SdrError::InvalidArgument(
            "an IF gain entry needs both stage and gain".to_string(),
        )),
    }
}
