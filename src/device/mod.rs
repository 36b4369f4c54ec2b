//! Device identity and raw telemetry types.
//!
//! A [`DeviceIdentity`] is the stable key that correlates polls over time;
//! it is fixed at discovery and never mutated. A [`RawSnapshot`] is the
//! immutable result of one successful probe attempt: a timestamped map of
//! normalized attribute names to values.

pub mod constants;

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// The capability class of a storage device, selected at discovery time.
///
/// The class decides which threshold table the classifier applies; it is
/// never inferred from snapshot contents at runtime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceClass {
    /// ATA/SATA device with basic SMART attributes
    Ata,
    /// NVMe device reporting health-log style attributes
    Nvme,
    /// eMMC device with vendor life-time estimates
    Emmc,
    /// Vendor-specific device; the value names the vendor table to use
    Vendor(String),
}

impl DeviceClass {
    /// Key used to look up threshold-table overrides in the configuration.
    pub fn key(&self) -> &str {
        match self {
            DeviceClass::Ata => "ata",
            DeviceClass::Nvme => "nvme",
            DeviceClass::Emmc => "emmc",
            DeviceClass::Vendor(name) => name.as_str(),
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Stable identity of a storage device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceIdentity {
    /// Short correlatable name, e.g. "sda"
    pub name: String,
    /// Full device node path, e.g. "/dev/sda"
    pub device_node: String,
    /// Capability class chosen at discovery
    pub class: DeviceClass,
}

impl DeviceIdentity {
    pub fn new(
        name: impl Into<String>,
        device_node: impl Into<String>,
        class: DeviceClass,
    ) -> Self {
        Self { name: name.into(), device_node: device_node.into(), class }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.device_node)
    }
}

/// A single normalized attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Number(_) => None,
            AttributeValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Immutable telemetry captured by one probe attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    /// When the snapshot was captured
    pub taken_at: SystemTime,
    /// Normalized attribute name to value
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl RawSnapshot {
    pub fn new(taken_at: SystemTime) -> Self {
        Self { taken_at, attributes: BTreeMap::new() }
    }

    /// Builder-style attribute insertion, used by probes and tests.
    ///
    /// # Examples
    /// ```
    /// use std::time::SystemTime;
    /// use storage_healthd::device::{constants::ATTR_HEALTH, RawSnapshot};
    ///
    /// let snapshot = RawSnapshot::new(SystemTime::now()).with_attribute(ATTR_HEALTH, 91.6);
    /// assert_eq!(snapshot.number(ATTR_HEALTH), Some(91.6));
    /// ```
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Numeric value of an attribute, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttributeValue::as_number)
    }

    /// Text value of an attribute, if present and textual.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_text)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let id = DeviceIdentity::new("sda", "/dev/sda", DeviceClass::Ata);
        assert_eq!(id.to_string(), "sda (/dev/sda)");
    }

    #[test]
    fn test_class_keys() {
        assert_eq!(DeviceClass::Ata.key(), "ata");
        assert_eq!(DeviceClass::Nvme.key(), "nvme");
        assert_eq!(DeviceClass::Emmc.key(), "emmc");
        assert_eq!(DeviceClass::Vendor("acme".to_string()).key(), "acme");
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = RawSnapshot::new(SystemTime::now())
            .with_attribute(constants::ATTR_HEALTH, 83.5)
            .with_attribute(constants::ATTR_MODEL, "InnoDisk 3IE3");

        assert_eq!(snapshot.number(constants::ATTR_HEALTH), Some(83.5));
        assert_eq!(snapshot.text(constants::ATTR_MODEL), Some("InnoDisk 3IE3"));
        assert_eq!(snapshot.number(constants::ATTR_MODEL), None);
        assert_eq!(snapshot.text(constants::ATTR_HEALTH), None);
        assert!(!snapshot.has_attribute(constants::ATTR_TEMPERATURE));
    }

    #[test]
    fn test_identity_ordering_is_stable() {
        let mut ids = vec![
            DeviceIdentity::new("sdb", "/dev/sdb", DeviceClass::Ata),
            DeviceIdentity::new("nvme0", "/dev/nvme0", DeviceClass::Nvme),
            DeviceIdentity::new("sda", "/dev/sda", DeviceClass::Ata),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.name.as_str()).collect();
        assert_eq!(names, vec!["nvme0", "sda", "sdb"]);
    }
}
