//! Threshold-based health classification.
//!
//! [`HealthClassifier::classify`] is a pure function from a raw snapshot to
//! a [`HealthVerdict`]. Rules are declarative per device class: each
//! [`ThresholdRule`] names an attribute, a warning and a critical bound,
//! and the direction in which the attribute degrades. Missing-but-required
//! attributes degrade the verdict to WARNING ("incomplete telemetry"),
//! never to a hard failure.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::device::constants::{ATTR_HEALTH, ATTR_RESERVED_BLOCKS, ATTR_TEMPERATURE};
use crate::device::{DeviceClass, RawSnapshot};

/// Discrete health verdict for a device.
///
/// `Unknown` is the state machine's initial state only; the classifier
/// never emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Unknown,
    Ok,
    Warning,
    Error,
    NotAvailable,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HealthStatus::Unknown => "UNKNOWN",
            HealthStatus::Ok => "OK",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Error => "ERROR",
            HealthStatus::NotAvailable => "NOT_AVAILABLE",
        };
        f.write_str(text)
    }
}

/// A verdict plus the evidence it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    /// Human-readable explanation surfaced to show-commands and alerting
    pub reason: String,
    /// The snapshot the verdict was derived from; `None` when unavailable
    pub snapshot: Option<RawSnapshot>,
}

impl HealthVerdict {
    pub fn new(status: HealthStatus, reason: impl Into<String>, snapshot: RawSnapshot) -> Self {
        Self { status, reason: reason.into(), snapshot: Some(snapshot) }
    }

    /// Verdict for a device whose retry budget was exhausted this cycle.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { status: HealthStatus::NotAvailable, reason: reason.into(), snapshot: None }
    }

    /// Initial verdict before the first poll completes.
    pub fn unknown() -> Self {
        Self {
            status: HealthStatus::Unknown,
            reason: "not polled yet".to_string(),
            snapshot: None,
        }
    }
}

/// Which direction an attribute degrades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    /// Larger readings are worse (temperature, error counters)
    AboveIsBad,
    /// Smaller readings are worse (remaining health, spare blocks)
    BelowIsBad,
}

/// One declarative threshold rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub attribute: String,
    pub warning: f64,
    pub critical: f64,
    pub direction: ThresholdDirection,
}

impl ThresholdRule {
    pub fn above(attribute: impl Into<String>, warning: f64, critical: f64) -> Self {
        Self {
            attribute: attribute.into(),
            warning,
            critical,
            direction: ThresholdDirection::AboveIsBad,
        }
    }

    pub fn below(attribute: impl Into<String>, warning: f64, critical: f64) -> Self {
        Self {
            attribute: attribute.into(),
            warning,
            critical,
            direction: ThresholdDirection::BelowIsBad,
        }
    }

    /// Severity breach for a reading, or `None` when within bounds.
    fn breach(&self, value: f64) -> Option<HealthStatus> {
        match self.direction {
            ThresholdDirection::AboveIsBad => {
                if value >= self.critical {
                    Some(HealthStatus::Error)
                } else if value >= self.warning {
                    Some(HealthStatus::Warning)
                } else {
                    None
                }
            }
            ThresholdDirection::BelowIsBad => {
                if value <= self.critical {
                    Some(HealthStatus::Error)
                } else if value <= self.warning {
                    Some(HealthStatus::Warning)
                } else {
                    None
                }
            }
        }
    }
}

/// Rule set applied to one device class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdTable {
    /// Attributes that must be present for full telemetry
    pub required: Vec<String>,
    pub rules: Vec<ThresholdRule>,
}

impl ThresholdTable {
    /// Defaults for ATA/SATA SSDs: remaining health warns below 30%,
    /// critical below 10%; temperature warns at 70°C, critical at 85°C.
    pub fn ata() -> Self {
        Self {
            required: vec![ATTR_HEALTH.to_string(), ATTR_TEMPERATURE.to_string()],
            rules: vec![
                ThresholdRule::below(ATTR_HEALTH, 30.0, 10.0),
                ThresholdRule::above(ATTR_TEMPERATURE, 70.0, 85.0),
            ],
        }
    }

    /// Defaults for NVMe devices; controllers tolerate slightly more heat.
    pub fn nvme() -> Self {
        Self {
            required: vec![ATTR_HEALTH.to_string(), ATTR_TEMPERATURE.to_string()],
            rules: vec![
                ThresholdRule::below(ATTR_HEALTH, 30.0, 10.0),
                ThresholdRule::above(ATTR_TEMPERATURE, 75.0, 90.0),
            ],
        }
    }

    /// Defaults for eMMC: life-time estimate plus spare-block floor.
    /// Many eMMC parts report no temperature, so it is not required.
    pub fn emmc() -> Self {
        Self {
            required: vec![ATTR_HEALTH.to_string()],
            rules: vec![
                ThresholdRule::below(ATTR_HEALTH, 30.0, 10.0),
                ThresholdRule::below(ATTR_RESERVED_BLOCKS, 100.0, 10.0),
            ],
        }
    }
}

static ATA_DEFAULTS: Lazy<ThresholdTable> = Lazy::new(ThresholdTable::ata);
static NVME_DEFAULTS: Lazy<ThresholdTable> = Lazy::new(ThresholdTable::nvme);
static EMMC_DEFAULTS: Lazy<ThresholdTable> = Lazy::new(ThresholdTable::emmc);

/// Pure snapshot-to-verdict mapping with per-class threshold tables.
#[derive(Debug, Clone, Default)]
pub struct HealthClassifier {
    /// Configuration overrides keyed by [`DeviceClass::key`]
    overrides: BTreeMap<String, ThresholdTable>,
}

impl HealthClassifier {
    pub fn new(overrides: BTreeMap<String, ThresholdTable>) -> Self {
        Self { overrides }
    }

    /// Table in effect for a class: configured override first, then the
    /// built-in default. `Vendor` classes without an override fall back to
    /// the ATA table.
    pub fn table_for(&self, class: &DeviceClass) -> &ThresholdTable {
        if let Some(table) = self.overrides.get(class.key()) {
            return table;
        }
        match class {
            DeviceClass::Ata | DeviceClass::Vendor(_) => &ATA_DEFAULTS,
            DeviceClass::Nvme => &NVME_DEFAULTS,
            DeviceClass::Emmc => &EMMC_DEFAULTS,
        }
    }

    /// Map a snapshot to a verdict. Deterministic: the same snapshot always
    /// yields the same verdict.
    pub fn classify(&self, class: &DeviceClass, snapshot: &RawSnapshot) -> HealthVerdict {
        let table = self.table_for(class);

        let mut critical: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        for rule in &table.rules {
            let Some(value) = snapshot.number(&rule.attribute) else {
                continue;
            };
            match rule.breach(value) {
                Some(HealthStatus::Error) => critical.push(format!(
                    "{} {:.1} breaches critical threshold {:.1}",
                    rule.attribute, value, rule.critical
                )),
                Some(HealthStatus::Warning) => warnings.push(format!(
                    "{} {:.1} breaches warning threshold {:.1}",
                    rule.attribute, value, rule.warning
                )),
                _ => {}
            }
        }

        if !critical.is_empty() {
            return HealthVerdict::new(HealthStatus::Error, critical.join("; "), snapshot.clone());
        }
        if !warnings.is_empty() {
            return HealthVerdict::new(
                HealthStatus::Warning,
                warnings.join("; "),
                snapshot.clone(),
            );
        }

        let missing: Vec<&str> = table
            .required
            .iter()
            .filter(|name| !snapshot.has_attribute(name))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            return HealthVerdict::new(
                HealthStatus::Warning,
                format!("incomplete telemetry: missing {}", missing.join(", ")),
                snapshot.clone(),
            );
        }

        HealthVerdict::new(HealthStatus::Ok, "all attributes within thresholds", snapshot.clone())
    }
}

#[cfg(test)]
mod tests;
