use serde::{Deserialize, Serialize};

use crate::hal::types::{TunerType, UsbStrings};

/// Gain list reported by the simulated tuner, in centibels
pub const REFERENCE_TUNER_GAINS: [i32; 5] = [0, 10, 20, 30, 40];

/// Static description of one simulated dongle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDeviceSpec {
    pub name: String,
    pub vendor: String,
    pub product: String,
    pub serial: String,
    #[serde(default = "default_tuner_type")]
    pub tuner_type: TunerType,
    #[serde(default = "default_tuner_gains")]
    pub tuner_gains: Vec<i32>,
    #[serde(default = "default_has_eeprom")]
    pub has_eeprom: bool,
}

fn default_tuner_type() -> TunerType {
    TunerType::R820T
}

fn default_tuner_gains() -> Vec<i32> {
    REFERENCE_TUNER_GAINS.to_vec()
}

fn default_has_eeprom() -> bool {
    true
}

impl SimulatedDeviceSpec {
    /// The reference mock dongle at `index`
    pub fn reference(index: u32) -> Self {
        Self {
            name: format!("Mock RTLSDR Device #{}", index),
            vendor: "Mock".to_string(),
            product: "Mock RTLSDR Device".to_string(),
            serial: format!("{:08}", index + 1),
            tuner_type: default_tuner_type(),
            tuner_gains: default_tuner_gains(),
            has_eeprom: default_has_eeprom(),
        }
    }

    pub fn usb_strings(&self) -> UsbStrings {
        UsbStrings {
            vendor: self.vendor.clone(),
            product: self.product.clone(),
            serial: self.serial.clone(),
        }
    }
}

/// Devices "plugged in" to a simulated driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTable {
    devices: Vec<SimulatedDeviceSpec>,
}

impl DeviceTable {
    pub fn new(devices: Vec<SimulatedDeviceSpec>) -> Self {
        Self { devices }
    }

    /// `count` reference dongles with serials 00000001, 00000002, ...
    pub fn uniform(count: u32) -> Self {
        Self::new((0..count).map(SimulatedDeviceSpec::reference).collect())
    }

    pub fn push(&mut self, spec: SimulatedDeviceSpec) {
        self.devices.push(spec);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&SimulatedDeviceSpec> {
        self.devices.get(index as usize)
    }

    pub fn find_serial(&self, serial: &str) -> Option<u32> {
        self.devices
            .iter()
            .position(|d| d.serial == serial)
            .map(|i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_table_matches_reference_mock() {
        let table = DeviceTable::uniform(2);
        assert_eq!(table.len(), 2);

        let second = table.get(1).unwrap();
        assert_eq!(second.name, "Mock RTLSDR Device #1");
        assert_eq!(second.vendor, "Mock");
        assert_eq!(second.serial, "00000002");
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_find_serial() {
        let table = DeviceTable::uniform(3);
        assert_eq!(table.find_serial("00000001"), Some(0));
        assert_eq!(table.find_serial("00000003"), Some(2));
        assert_eq!(table.find_serial("00000004"), None);
    }

    #[test]
    fn test_spec_defaults_from_json() {
        let spec: SimulatedDeviceSpec = serde_json::from_str(
            r#"{"name": "dongle", "vendor": "Realtek", "product": "RTL2838UHIDIR", "serial": "42"}"#,
        )
        .unwrap();

        assert_eq!(spec.tuner_type, TunerType::R820T);
        assert_eq!(spec.tuner_gains, REFERENCE_TUNER_GAINS.to_vec());
        assert!(spec.has_eeprom);
    }
}
