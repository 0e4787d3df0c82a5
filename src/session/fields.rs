//! Where each configurable value of a session comes from.
//!
//! Some settings cannot be read back from the hardware, so the session
//! remembers what it last wrote. Everything else is always asked of the
//! device. The accessor macros below generate the get/set pair for each
//! kind; `FIELDS` is the authoritative list.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Remembered by the session; `None` until first set
    CacheBacked,
    /// Read from the device on every call
    LiveQueried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: FieldSource,
}

const fn cached(name: &'static str) -> FieldSpec {
    FieldSpec { name, source: FieldSource::CacheBacked }
}

const fn live(name: &'static str) -> FieldSpec {
    FieldSpec { name, source: FieldSource::LiveQueried }
}

pub const FIELDS: &[FieldSpec] = &[
    live("xtal_freq"),
    live("center_freq"),
    live("freq_correction"),
    live("sample_rate"),
    live("tuner_gain"),
    cached("tuner_gain_mode"),
    cached("tuner_bandwidth"),
    cached("tuner_if_gains"),
    cached("testmode"),
    cached("agc"),
    live("direct_sampling"),
    live("offset_tuning"),
    live("usb_strings"),
    live("tuner_type"),
    live("tuner_gains"),
];

pub fn source_of(name: &str) -> Option<FieldSource> {
    FIELDS.iter().find(|f| f.name == name).map(|f| f.source)
}

/// Getter and setter that both go straight to the hardware
macro_rules! live_field {
    ($name:literal, $getter:ident, $setter:ident, $ty:ty, $hw_get:ident, $hw_set:ident) => {
        pub fn $getter(&self) -> $crate::error::SdrResult<$ty> {
            self.live()?.$hw_get()
        }

        pub fn $setter(&mut self, value: $ty) -> $crate::error::SdrResult<()> {
            log::debug!("device {} {} <- {:?}", self.index, $name, value);
            self.live()?.$hw_set(value)
        }
    };
}

/// Setter writes the hardware, then remembers the value for the getter
macro_rules! cached_field {
    ($name:literal, $getter:ident, $setter:ident, $ty:ty, $slot:ident, $hw_set:ident, $to_hw:expr) => {
        pub fn $getter(&self) -> $crate::error::SdrResult<Option<$ty>> {
            self.live()?;
            Ok(self.cache.$slot)
        }

        pub fn $setter(&mut self, value: $ty) -> $crate::error::SdrResult<()> {
            log::debug!("device {} {} <- {:?}", self.index, $name, value);
            let to_hw = $to_hw;
            self.live()?.$hw_set(to_hw(value))?;
            self.cache.$slot = Some(value);
            Ok(())
        }
    };
}

pub(crate) use cached_field;
pub(crate) use live_field;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_settings_are_cache_backed() {
        for name in ["tuner_gain_mode", "tuner_bandwidth", "tuner_if_gains", "testmode", "agc"] {
            assert_eq!(source_of(name), Some(FieldSource::CacheBacked), "{}", name);
        }
    }

    #[test]
    fn test_readable_settings_are_live() {
        assert_eq!(source_of("center_freq"), Some(FieldSource::LiveQueried));
        assert_eq!(source_of("tuner_gain"), Some(FieldSource::LiveQueried));
        assert_eq!(source_of("bogus"), None);
    }

    #[test]
    fn test_field_names_unique() {
        for (i, a) in FIELDS.iter().enumerate() {
            assert!(FIELDS[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
        }
    }
}
