//! End-to-end device scenarios over the public API

use chrono::{NaiveDate, NaiveTime};
use geofence_tracker::storage::STORE_SIZE;
use geofence_tracker::{
    Clock, ConnectivityEvent, ConnectivityManager, DeviceConfig, FileStorage, GeofenceConfig,
    GeofenceStatus, ManualClock, MemoryStorage, MockGpsReceiver, MockTransport,
    PersistentConfigStore, PositionSource, ReceiverState, ReplayGpsReceiver, TelemetryLoop,
};
use std::io::Cursor;
use tempfile::TempDir;

fn device() -> DeviceConfig {
    DeviceConfig {
        device_id: "tracker".to_string(),
        ..DeviceConfig::default()
    }
}

fn fix_at(latitude: f64, longitude: f64) -> ReceiverState {
    ReceiverState::new(latitude, longitude, 600.0)
        .with_date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap())
        .with_time(NaiveTime::from_hms_opt(8, 30, 0).unwrap())
}

#[test]
fn remote_reconfiguration_survives_reboot() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("nv.img");
    let config = device();

    {
        let storage = FileStorage::open(&image, STORE_SIZE).unwrap();
        let store = PersistentConfigStore::open(storage, 0).unwrap();
        assert_eq!(store.config(), GeofenceConfig::unset());

        let mut transport = MockTransport::new();
        transport.inject("mqtt-gps/tracker/geofence/set", r#"{"latitude":40.0,"longitude":-3.0,"radius":100}"#);
        let connectivity =
            ConnectivityManager::with_clock(transport, config.connectivity_config(), ManualClock::new());
        let mut telemetry = TelemetryLoop::new(
            &config,
            store,
            PositionSource::new(MockGpsReceiver::new()),
            connectivity,
        )
        .unwrap();

        // Connect, then service the inbound message
        telemetry.tick();
        telemetry.tick();
        assert_eq!(telemetry.stats().commands_applied, 1);
    }

    // Power cycle
    let storage = FileStorage::open(&image, STORE_SIZE).unwrap();
    let store = PersistentConfigStore::open(storage, 0).unwrap();
    assert_eq!(store.config(), GeofenceConfig::new(40.0, -3.0, 100));
}

#[test]
fn status_follows_position_through_replay() {
    let recording = "\
{\"latitude\":40.0,\"longitude\":-3.0,\"altitude_m\":0.0}
{\"date\":\"2024-05-17\",\"time\":\"08:30:00\",\"latitude\":40.0,\"longitude\":-3.0,\"altitude_m\":650.0}

{\"date\":\"2024-05-17\",\"time\":\"08:30:30\",\"latitude\":40.01,\"longitude\":-3.0,\"altitude_m\":650.0}
";
    let config = device();
    let mut store = PersistentConfigStore::open(MemoryStorage::erased(STORE_SIZE), 0).unwrap();
    store.set_geofence(40.0, -3.0, 100).unwrap();

    let receiver = ReplayGpsReceiver::new(Cursor::new(recording.as_bytes().to_vec()));
    let connectivity =
        ConnectivityManager::with_clock(MockTransport::new(), config.connectivity_config(), ManualClock::new());
    let mut telemetry =
        TelemetryLoop::new(&config, store, PositionSource::new(receiver), connectivity).unwrap();

    let statuses: Vec<_> = (0..3).map(|_| telemetry.tick().status).collect();
    assert_eq!(
        statuses,
        vec![None, Some(GeofenceStatus::Inside), Some(GeofenceStatus::Outside)]
    );

    let published = telemetry.connectivity().transport().published();
    assert_eq!(published.len(), 2);
    let last: serde_json::Value = serde_json::from_slice(&published[1].payload).unwrap();
    assert_eq!(last["geofence"], "outside");
    assert_eq!(last["timestamp"], "2024-05-17T08:30:30");
    let distance = last["distance_m"].as_f64().unwrap();
    assert!((distance - 1112.0).abs() < 2.0, "distance {}", distance);
}

#[test]
fn broker_outage_does_not_stop_evaluation() {
    let config = device();
    let store = PersistentConfigStore::open(MemoryStorage::erased(STORE_SIZE), 0).unwrap();
    let mut receiver = MockGpsReceiver::new();
    for _ in 0..4 {
        receiver.push_state(fix_at(40.0, -3.0));
    }

    let mut transport = MockTransport::new();
    transport.set_refuse_all(true);
    let clock = ManualClock::new();
    let connectivity =
        ConnectivityManager::with_clock(transport, config.connectivity_config(), clock.clone());
    let mut telemetry =
        TelemetryLoop::new(&config, store, PositionSource::new(receiver), connectivity).unwrap();

    for _ in 0..3 {
        let report = telemetry.tick();
        assert_eq!(report.status, Some(GeofenceStatus::Disabled));
        assert!(!report.published);
        telemetry.wait_next_tick(clock.now());
    }

    telemetry.connectivity_mut().transport_mut().set_refuse_all(false);
    let report = telemetry.tick();
    assert_eq!(report.event, ConnectivityEvent::Connected);
    assert!(report.published);
    assert_eq!(telemetry.stats().publish_failures, 3);
}
