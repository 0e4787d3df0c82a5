use log::info;
use std::sync::Arc;

use super::{DeviceInfo, RtlDriver, UsbStrings};
use crate::error::{SdrError, SdrResult};
use crate::session::DeviceSession;

/// Entry point for device discovery and opening
#[derive(Clone)]
pub struct DeviceManager {
    driver: Arc<dyn RtlDriver>,
}

impl DeviceManager {
    pub fn new(driver: Arc<dyn RtlDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn RtlDriver> {
        &self.driver
    }

    pub fn device_count(&self) -> u32 {
        self.driver.device_count()
    }

    pub fn device_name(&self, index: u32) -> String {
        self.driver.device_name(index)
    }

    pub fn usb_strings(&self, index: u32) -> SdrResult<UsbStrings> {
        self.driver.usb_strings(index)
    }

    /// `None` when no present device carries `serial`
    pub fn index_by_serial(&self, serial: &str) -> SdrResult<Option<u32>> {
        self.driver.index_by_serial(serial)
    }

    /// Discover all present devices
    pub fn devices(&self) -> SdrResult<Vec<DeviceInfo>> {
        (0..self.device_count())
            .map(|index| {
                Ok(DeviceInfo {
                    device_index: index,
                    name: self.device_name(index),
                    usb_strings: self.usb_strings(index)?,
                })
            })
            .collect()
    }

    pub fn open(&self, index: u32) -> SdrResult<DeviceSession> {
        DeviceSession::open(self.driver.as_ref(), index)
    }

    pub fn open_by_serial(&self, serial: &str) -> SdrResult<DeviceSession> {
        let index = self.index_by_serial(serial)?.ok_or_else(|| {
            SdrError::InvalidArgument(format!("no device with serial {}", serial))
        })?;
        info!("serial {} resolved to device {}", serial, index);
        self.open(index)
    }
}
