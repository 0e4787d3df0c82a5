use rtlsdr_host::config::{DeviceSelector, StreamConfig};
use rtlsdr_host::hal::mock::{DeviceTable, SimulatedDriver};
use rtlsdr_host::{DeviceManager, HostConfig};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_load_or_init_writes_default() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("host.json");

    let config = HostConfig::load_or_init(&config_path).await.unwrap();
    assert!(config_path.exists());
    assert_eq!(config, HostConfig::default());
    assert_eq!(config.device, DeviceSelector::Index(0));
}

#[tokio::test]
async fn test_save_then_load() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("host.json");

    let config = HostConfig {
        device: DeviceSelector::Serial("00000002".to_string()),
        settings: json!({"center_freq": 144800000, "tuner_gain": "auto"}),
        stream: StreamConfig { buffer_count: Some(4), buffer_length: Some(8192) },
        simulator: Some(DeviceTable::uniform(2)),
        ..HostConfig::default()
    };
    config.save(&config_path).await.unwrap();

    assert!(!config_path.with_extension("tmp").exists());
    let loaded = HostConfig::load(&config_path).await.unwrap();
    assert_eq!(loaded, config);
}

#[tokio::test]
async fn test_load_reports_parse_errors() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("host.json");
    tokio::fs::write(&config_path, "{ not json").await.unwrap();

    let err = HostConfig::load(&config_path).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config JSON"));
}

#[test]
fn test_open_session_applies_settings() {
    let config = HostConfig {
        device: DeviceSelector::Serial("00000002".to_string()),
        settings: json!({"center_freq": 144800000, "sample_rate": 1024000}),
        ..HostConfig::default()
    };
    let driver = Arc::new(SimulatedDriver::with_devices(2));
    let manager = DeviceManager::new(driver.clone());

    let session = config.open_session(&manager).unwrap();
    assert_eq!(session.device_index(), 1);

    let state = driver.handle(1).unwrap().snapshot();
    assert_eq!(state.center_freq, 144_800_000);
    assert_eq!(state.sample_rate, 1_024_000);
}

#[test]
fn test_open_session_rejects_bad_settings() {
    let config = HostConfig {
        settings: json!({"direct_sampling": 7}),
        ..HostConfig::default()
    };
    let manager = DeviceManager::new(Arc::new(SimulatedDriver::with_devices(1)));

    let err = config.open_session(&manager).err().unwrap();
    assert!(format!("{:#}", err).contains("direct_sampling should be an integer value from 0-2"));
}
