//! Canonical attribute names shared between probes and the classifier.
//!
//! Platform probes normalize vendor output into these keys so that one
//! threshold table can cover every backend that reports the attribute.

/// Remaining device health as a percentage (100.0 = new).
pub const ATTR_HEALTH: &str = "health";

/// Composite device temperature in Celsius.
pub const ATTR_TEMPERATURE: &str = "temperature";

/// Manufacturer model string.
pub const ATTR_MODEL: &str = "model";

/// Manufacturer serial number.
pub const ATTR_SERIAL: &str = "serial";

/// Firmware revision string.
pub const ATTR_FIRMWARE: &str = "firmware";

/// Total number of I/O reads over the device lifetime.
pub const ATTR_IO_READS: &str = "io_reads";

/// Total number of I/O writes over the device lifetime.
pub const ATTR_IO_WRITES: &str = "io_writes";

/// Number of reserved (spare) blocks still available.
pub const ATTR_RESERVED_BLOCKS: &str = "reserved_blocks";
