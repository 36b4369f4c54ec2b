use std::time::{Duration, SystemTime};

use crate::classify::{HealthStatus, HealthVerdict};
use crate::device::constants::{ATTR_HEALTH, ATTR_MODEL, ATTR_SERIAL};
use crate::device::{DeviceClass, DeviceIdentity, RawSnapshot};
use crate::error::PublishError;
use crate::state::DeviceState;

use super::{HealthRecord, MemoryStateStore, MockStateStore, StatePublisher, StateStore, NOT_AVAILABLE};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn ok_state(name: &str) -> DeviceState {
    let snapshot = RawSnapshot::new(at(100))
        .with_attribute(ATTR_HEALTH, 95.0)
        .with_attribute(ATTR_MODEL, "InnoDisk 3IE3")
        .with_attribute(ATTR_SERIAL, "BCA11712190600251");
    DeviceState {
        identity: DeviceIdentity::new(name, format!("/dev/{name}"), DeviceClass::Ata),
        verdict: HealthVerdict::new(
            HealthStatus::Ok,
            "all attributes within thresholds",
            snapshot.clone(),
        ),
        since: at(100),
        consecutive_failures: 0,
        last_good: Some(snapshot),
    }
}

fn unavailable_state(name: &str) -> DeviceState {
    DeviceState {
        identity: DeviceIdentity::new(name, format!("/dev/{name}"), DeviceClass::Ata),
        verdict: HealthVerdict::unavailable("probe timed out after 10s"),
        since: at(200),
        consecutive_failures: 3,
        last_good: None,
    }
}

#[test]
fn test_record_from_state_carries_identity_fields() {
    let record = HealthRecord::from_state(&ok_state("sda"));
    assert_eq!(record.device, "sda");
    assert_eq!(record.device_node, "/dev/sda");
    assert_eq!(record.class, "ata");
    assert_eq!(record.status, HealthStatus::Ok);
    assert_eq!(record.model, "InnoDisk 3IE3");
    assert_eq!(record.serial, "BCA11712190600251");
    assert_eq!(record.firmware, NOT_AVAILABLE);
    assert_eq!(record.last_update, 100);
}

#[test]
fn test_record_uses_not_available_without_last_good() {
    let record = HealthRecord::from_state(&unavailable_state("sda"));
    assert_eq!(record.model, NOT_AVAILABLE);
    assert_eq!(record.serial, NOT_AVAILABLE);
    assert_eq!(record.firmware, NOT_AVAILABLE);
    assert_eq!(record.status, HealthStatus::NotAvailable);
}

#[test]
fn test_content_match_ignores_timestamp_only_changes() {
    let mut state = ok_state("sda");
    let first = HealthRecord::from_state(&state);
    state.since = at(500);
    let second = HealthRecord::from_state(&state);

    assert_ne!(first, second);
    assert!(first.content_matches(&second));
}

#[test]
fn test_record_serialization_schema_is_stable() {
    let json = serde_json::to_string(&HealthRecord::from_state(&unavailable_state("sda")))
        .expect("serializable");
    assert!(json.contains("\"status\":\"NOT_AVAILABLE\""));
    assert!(json.contains("\"device\":\"sda\""));
    assert!(json.contains("\"model\":\"N/A\""));

    let parsed: HealthRecord = serde_json::from_str(&json).expect("round trips");
    assert_eq!(parsed.status, HealthStatus::NotAvailable);
}

#[tokio::test]
async fn test_unchanged_record_is_never_rewritten() {
    let mut store = MockStateStore::new();
    store.expect_write().times(1).returning(|_| Ok(()));

    let mut publisher = StatePublisher::new(store);
    let states = vec![ok_state("sda")];

    assert_eq!(publisher.publish(&states).await, 1);
    // Identical content on the next cycles: no further writes.
    assert_eq!(publisher.publish(&states).await, 0);
    assert_eq!(publisher.publish(&states).await, 0);
}

#[tokio::test]
async fn test_status_change_republishes() {
    let mut store = MockStateStore::new();
    store.expect_write().times(2).returning(|_| Ok(()));

    let mut publisher = StatePublisher::new(store);
    assert_eq!(publisher.publish(&[ok_state("sda")]).await, 1);
    assert_eq!(publisher.publish(&[unavailable_state("sda")]).await, 1);
}

#[tokio::test]
async fn test_timestamp_refresh_alone_is_a_noop() {
    let mut store = MockStateStore::new();
    store.expect_write().times(1).returning(|_| Ok(()));

    let mut publisher = StatePublisher::new(store);
    let mut state = ok_state("sda");
    assert_eq!(publisher.publish(&[state.clone()]).await, 1);

    state.since = at(900);
    assert_eq!(publisher.publish(&[state]).await, 0);
}

#[tokio::test]
async fn test_failed_write_is_retried_next_cycle() {
    let mut store = MockStateStore::new();
    store
        .expect_write()
        .times(1)
        .returning(|_| Err(PublishError::store("REDIS unavailable")));
    store.expect_write().times(1).returning(|_| Ok(()));

    let mut publisher = StatePublisher::new(store);
    let states = vec![ok_state("sda")];

    // First cycle: the write fails and nothing is marked published.
    assert_eq!(publisher.publish(&states).await, 0);
    // Next cycle: the same delta goes through exactly once.
    assert_eq!(publisher.publish(&states).await, 1);
    // And it is not duplicated afterwards.
    assert_eq!(publisher.publish(&states).await, 0);
}

#[tokio::test]
async fn test_partial_failure_only_retries_failed_record() {
    let mut store = MockStateStore::new();
    store
        .expect_write()
        .withf(|record: &HealthRecord| record.device == "sda")
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_write()
        .withf(|record: &HealthRecord| record.device == "sdb")
        .times(2)
        .returning({
            let mut first = true;
            move |_| {
                if first {
                    first = false;
                    Err(PublishError::store("write burst rejected"))
                } else {
                    Ok(())
                }
            }
        });

    let mut publisher = StatePublisher::new(store);
    let states = vec![ok_state("sda"), ok_state("sdb")];

    assert_eq!(publisher.publish(&states).await, 1);
    assert_eq!(publisher.publish(&states).await, 1);
}

#[tokio::test]
async fn test_memory_store_keeps_latest_record_per_device() {
    let store = MemoryStateStore::new();
    let mut publisher = StatePublisher::new(store);

    publisher.publish(&[ok_state("sda")]).await;
    publisher.publish(&[unavailable_state("sda")]).await;

    let store = publisher.store();
    assert_eq!(store.len(), 1);
    assert_eq!(store.write_count(), 2);
    let record = store.get("sda").expect("record present");
    assert_eq!(record.status, HealthStatus::NotAvailable);
}

#[test]
#[should_panic(expected = "does not match the record schema")]
fn test_memory_store_panics_on_record_that_lost_its_schema() {
    let store = MemoryStateStore::new();
    store
        .records
        .lock()
        .insert("sda".to_string(), "{\"device\":\"sda\"}".to_string());
    store.get("sda");
}

#[tokio::test]
async fn test_memory_store_write_is_idempotent_overwrite() {
    let store = MemoryStateStore::new();
    let record = HealthRecord::from_state(&ok_state("sda"));
    store.write(&record).await.expect("write");
    store.write(&record).await.expect("write");
    assert_eq!(store.len(), 1);
    assert_eq!(store.write_count(), 2);
}
