use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::device::SimulatedHandle;
use super::device_table::DeviceTable;
use crate::error::{SdrError, SdrResult};
use crate::hal::traits::{RtlDriver, RtlHandle};
use crate::hal::types::UsbStrings;

/// In-process stand-in for librtlsdr's device table
pub struct SimulatedDriver {
    table: DeviceTable,
    handles: Mutex<HashMap<u32, Arc<SimulatedHandle>>>,
}

impl SimulatedDriver {
    pub fn new(table: DeviceTable) -> Self {
        Self {
            table,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// `count` reference mock dongles
    pub fn with_devices(count: u32) -> Self {
        Self::new(DeviceTable::uniform(count))
    }

    pub fn table(&self) -> &DeviceTable {
        &self.table
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<u32, Arc<SimulatedHandle>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Most recently opened handle for `index`
    pub fn handle(&self, index: u32) -> Option<Arc<SimulatedHandle>> {
        self.handles().get(&index).cloned()
    }
}

impl RtlDriver for SimulatedDriver {
    fn device_count(&self) -> u32 {
        self.table.len() as u32
    }

    fn device_name(&self, index: u32) -> String {
        self.table
            .get(index)
            .map(|spec| spec.name.clone())
            .unwrap_or_default()
    }

    fn usb_strings(&self, index: u32) -> SdrResult<UsbStrings> {
        self.table
            .get(index)
            .map(|spec| spec.usb_strings())
            .ok_or(SdrError::transport("rtlsdr_get_device_usb_strings", -1))
    }

    fn index_by_serial(&self, serial: &str) -> SdrResult<Option<u32>> {
        Ok(self.table.find_serial(serial))
    }

    fn open(&self, index: u32) -> SdrResult<Arc<dyn RtlHandle>> {
        let spec = self
            .table
            .get(index)
            .cloned()
            .ok_or(SdrError::transport("rtlsdr_open", -1))?;

        let handle = Arc::new(SimulatedHandle::new(index, spec));
        self.handles().insert(index, handle.clone());
        debug!("simulated device {} opened", index);
        Ok(handle)
    }
}
