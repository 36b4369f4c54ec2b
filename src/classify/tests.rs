use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::device::constants::{
    ATTR_HEALTH, ATTR_MODEL, ATTR_RESERVED_BLOCKS, ATTR_TEMPERATURE,
};
use crate::device::{DeviceClass, RawSnapshot};

use super::{HealthClassifier, HealthStatus, ThresholdRule, ThresholdTable};

fn snapshot(health: f64, temperature: f64) -> RawSnapshot {
    RawSnapshot::new(SystemTime::UNIX_EPOCH)
        .with_attribute(ATTR_HEALTH, health)
        .with_attribute(ATTR_TEMPERATURE, temperature)
}

#[test]
fn test_healthy_snapshot_is_ok() {
    let classifier = HealthClassifier::default();
    let verdict = classifier.classify(&DeviceClass::Ata, &snapshot(91.6, 40.1));
    assert_eq!(verdict.status, HealthStatus::Ok);
    assert!(verdict.snapshot.is_some());
}

#[test]
fn test_low_health_is_error_with_attribute_in_reason() {
    let classifier = HealthClassifier::default();
    let verdict = classifier.classify(&DeviceClass::Ata, &snapshot(5.0, 40.0));
    assert_eq!(verdict.status, HealthStatus::Error);
    assert!(verdict.reason.contains(ATTR_HEALTH), "reason was: {}", verdict.reason);
}

#[test]
fn test_degrading_health_is_warning() {
    let classifier = HealthClassifier::default();
    let verdict = classifier.classify(&DeviceClass::Ata, &snapshot(25.0, 40.0));
    assert_eq!(verdict.status, HealthStatus::Warning);
}

#[test]
fn test_critical_outranks_warning() {
    // Health is critical while temperature is only at warning level.
    let classifier = HealthClassifier::default();
    let verdict = classifier.classify(&DeviceClass::Ata, &snapshot(5.0, 75.0));
    assert_eq!(verdict.status, HealthStatus::Error);
}

#[test]
fn test_hot_device_is_error() {
    let classifier = HealthClassifier::default();
    let verdict = classifier.classify(&DeviceClass::Ata, &snapshot(90.0, 85.0));
    assert_eq!(verdict.status, HealthStatus::Error);
    assert!(verdict.reason.contains(ATTR_TEMPERATURE));
}

#[test]
fn test_missing_required_attribute_is_incomplete_telemetry() {
    let classifier = HealthClassifier::default();
    let partial = RawSnapshot::new(SystemTime::UNIX_EPOCH)
        .with_attribute(ATTR_HEALTH, 90.0)
        .with_attribute(ATTR_MODEL, "InnoDisk 3IE3");
    let verdict = classifier.classify(&DeviceClass::Ata, &partial);
    assert_eq!(verdict.status, HealthStatus::Warning);
    assert!(verdict.reason.contains("incomplete telemetry"));
    assert!(verdict.reason.contains(ATTR_TEMPERATURE));
}

#[test]
fn test_emmc_does_not_require_temperature() {
    let classifier = HealthClassifier::default();
    let emmc = RawSnapshot::new(SystemTime::UNIX_EPOCH)
        .with_attribute(ATTR_HEALTH, 80.0)
        .with_attribute(ATTR_RESERVED_BLOCKS, 3_746_218.0);
    let verdict = classifier.classify(&DeviceClass::Emmc, &emmc);
    assert_eq!(verdict.status, HealthStatus::Ok);
}

#[test]
fn test_emmc_spare_block_exhaustion_is_error() {
    let classifier = HealthClassifier::default();
    let emmc = RawSnapshot::new(SystemTime::UNIX_EPOCH)
        .with_attribute(ATTR_HEALTH, 80.0)
        .with_attribute(ATTR_RESERVED_BLOCKS, 4.0);
    let verdict = classifier.classify(&DeviceClass::Emmc, &emmc);
    assert_eq!(verdict.status, HealthStatus::Error);
}

#[test]
fn test_nvme_runs_hotter_before_warning() {
    let classifier = HealthClassifier::default();
    let reading = snapshot(90.0, 72.0);
    assert_eq!(classifier.classify(&DeviceClass::Ata, &reading).status, HealthStatus::Warning);
    assert_eq!(classifier.classify(&DeviceClass::Nvme, &reading).status, HealthStatus::Ok);
}

#[test]
fn test_vendor_class_falls_back_to_ata_defaults() {
    let classifier = HealthClassifier::default();
    let class = DeviceClass::Vendor("acme".to_string());
    assert_eq!(classifier.classify(&class, &snapshot(5.0, 40.0)).status, HealthStatus::Error);
}

#[test]
fn test_vendor_class_uses_configured_override() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "acme".to_string(),
        ThresholdTable {
            required: vec![ATTR_HEALTH.to_string()],
            rules: vec![ThresholdRule::below(ATTR_HEALTH, 50.0, 40.0)],
        },
    );
    let classifier = HealthClassifier::new(overrides);
    let class = DeviceClass::Vendor("acme".to_string());
    let reading = RawSnapshot::new(SystemTime::UNIX_EPOCH).with_attribute(ATTR_HEALTH, 45.0);
    assert_eq!(classifier.classify(&class, &reading).status, HealthStatus::Warning);
}

#[test]
fn test_classification_is_deterministic() {
    let classifier = HealthClassifier::default();
    let reading = snapshot(25.0, 71.0);
    let first = classifier.classify(&DeviceClass::Ata, &reading);
    for _ in 0..10 {
        let again = classifier.classify(&DeviceClass::Ata, &reading);
        assert_eq!(again, first);
    }
}

#[test]
fn test_textual_attribute_never_trips_numeric_rule() {
    let classifier = HealthClassifier::default();
    let odd = RawSnapshot::new(SystemTime::UNIX_EPOCH)
        .with_attribute(ATTR_HEALTH, "N/A")
        .with_attribute(ATTR_TEMPERATURE, 40.0);
    // A textual health reading is skipped by the rule but still counts as
    // present, so this classifies OK rather than incomplete.
    let verdict = classifier.classify(&DeviceClass::Ata, &odd);
    assert_eq!(verdict.status, HealthStatus::Ok);
}
