//! Settings Registry
//!
//! The registry is the device's single source of truth for configuration:
//! an insertion-ordered table of named, typed, bounded setting slots.
//! Command dispatch resolves keys against it first (a setting name always
//! shadows a same-named fixed command), and the persistence bridge
//! serializes it to and from a JSON document.
//!
//! ## Lifecycle
//!
//! All entries are constructed once at boot from the default table and
//! then only mutated in place. Entries are addressed by stable index and
//! never reallocated or destroyed, so an index obtained from a lookup is
//! valid for the life of the registry.
//!
//! ## Invariants
//!
//! - `key_hash` is djb2 of the entry name; hashes are unique across the
//!   table (duplicates are rejected at construction)
//! - the table never exceeds [`REGISTRY_CAPACITY`] entries
//! - a failed write leaves the target slot untouched

use crate::protocol::hash::djb2;
use crate::protocol::types::{ValueInput, WireValue};
use crate::settings::value::{BoundedString, FloatVector, SettingError, SettingValue};
use tracing::warn;

/// Maximum number of entries the table will accept. The base table is
/// around 75 entries; the headroom is for device-specific extensions.
pub const REGISTRY_CAPACITY: usize = 256;

/// One registered setting: a name, its hash, the typed slot, and the
/// write-protection flag.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    name: &'static str,
    key_hash: u32,
    value: SettingValue,
    read_only: bool,
}

impl SettingEntry {
    /// Creates an entry from a name and slot; the hash is derived from
    /// the name.
    pub fn new(name: &'static str, value: SettingValue) -> Self {
        Self {
            name,
            key_hash: djb2(name),
            value,
            read_only: false,
        }
    }

    pub fn bool(name: &'static str, default: bool) -> Self {
        Self::new(name, SettingValue::Bool(default))
    }

    pub fn byte(name: &'static str, default: u8) -> Self {
        Self::new(name, SettingValue::Byte(default))
    }

    pub fn float(name: &'static str, default: f32) -> Self {
        Self::new(name, SettingValue::Float(default))
    }

    pub fn int(name: &'static str, default: i32) -> Self {
        Self::new(name, SettingValue::Int(default))
    }

    pub fn str(name: &'static str, capacity: usize, default: &str) -> Self {
        Self::new(name, SettingValue::Str(BoundedString::new(capacity, default)))
    }

    pub fn float_array(name: &'static str, default: &[f32]) -> Self {
        Self::new(name, SettingValue::FloatArray(FloatVector::new(default)))
    }

    /// Marks the entry as writable only in factory mode.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    /// Projects the slot into its wire form.
    pub fn wire_value(&self) -> WireValue {
        self.value.to_wire()
    }
}

/// The device's settings table.
#[derive(Debug, Clone)]
pub struct SettingsRegistry {
    entries: Vec<SettingEntry>,
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SettingsRegistry {
    /// Builds the registry from the standard default table.
    pub fn with_defaults() -> Self {
        Self::from_entries(default_entries())
    }

    /// Builds a registry from an explicit entry list.
    ///
    /// Entries past [`REGISTRY_CAPACITY`] or with a duplicate hash are
    /// dropped with a warning; the survivors keep declaration order.
    pub fn from_entries(entries: Vec<SettingEntry>) -> Self {
        let mut accepted: Vec<SettingEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if accepted.len() >= REGISTRY_CAPACITY {
                warn!(name = entry.name, "settings table full, entry dropped");
                continue;
            }
            if accepted.iter().any(|e| e.key_hash == entry.key_hash) {
                // A hash collision would make one of the two settings
                // unreachable; refuse the later registration.
                warn!(
                    name = entry.name,
                    hash = format_args!("{:08x}", entry.key_hash),
                    "duplicate key hash, entry dropped"
                );
                continue;
            }
            accepted.push(entry);
        }
        Self { entries: accepted }
    }

    /// Looks an entry up by key hash. O(n) over a table of at most 256
    /// entries.
    pub fn find(&self, key_hash: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.key_hash == key_hash)
    }

    /// Looks an entry up by exact name.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Returns the entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` did not come from a lookup on this registry.
    pub fn entry(&self, index: usize) -> &SettingEntry {
        &self.entries[index]
    }

    /// Reads the entry at `index` as a wire value.
    pub fn read(&self, index: usize) -> WireValue {
        self.entries[index].wire_value()
    }

    /// Writes `input` to the entry at `index`.
    ///
    /// Read-only entries reject the write unless the device is in factory
    /// mode. Type and arity failures leave the slot untouched.
    pub fn write(
        &mut self,
        index: usize,
        input: &ValueInput,
        factory_mode: bool,
    ) -> Result<(), SettingError> {
        let entry = &mut self.entries[index];
        if entry.read_only && !factory_mode {
            return Err(SettingError::ReadOnly {
                key: entry.name.to_string(),
            });
        }
        entry.value.apply(input, entry.name)
    }

    /// Iterates over every populated entry in registration order.
    pub fn enumerate(&self) -> impl Iterator<Item = &SettingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the whole table as a JSON document whose top-level keys
    /// are the setting names. This is the persisted configuration form.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::with_capacity(self.entries.len());
        for entry in &self.entries {
            doc.insert(entry.name.to_string(), wire_to_json(&entry.wire_value()));
        }
        serde_json::Value::Object(doc)
    }

    /// Applies a configuration document to the table.
    ///
    /// Validation is per entry and all-or-nothing per entry: an entry
    /// whose document value has the wrong type or array length keeps its
    /// previous value and is skipped with a warning. Document keys with
    /// no matching entry are ignored. Returns the number of entries
    /// applied.
    ///
    /// Loading bypasses the read-only flag: the document is the device's
    /// own persisted state, which includes factory-programmed fields.
    pub fn apply_document(&mut self, doc: &serde_json::Value) -> usize {
        let Some(map) = doc.as_object() else {
            warn!("configuration document root is not an object, ignored");
            return 0;
        };

        let mut applied = 0;
        for (key, json) in map {
            let Some(index) = self.find_by_name(key) else {
                warn!(key = key.as_str(), "unknown configuration key ignored");
                continue;
            };
            let input = json_to_input(json);
            let entry = &mut self.entries[index];
            match entry.value.apply(&input, entry.name) {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!(
                        key = key.as_str(),
                        error = %e,
                        "configuration value rejected, keeping previous value"
                    );
                }
            }
        }
        applied
    }
}

/// Converts a wire value into its JSON document form.
fn wire_to_json(value: &WireValue) -> serde_json::Value {
    use serde_json::{json, Value};
    match value {
        WireValue::Null => Value::Null,
        WireValue::Bool(v) => json!(v),
        WireValue::Byte(v) => json!(v),
        WireValue::Int(v) => json!(v),
        WireValue::Float(v) => json!(v),
        WireValue::Str(s) => json!(s),
        WireValue::FloatArray(values) => json!(values),
    }
}

/// Converts a JSON document value into registry input. Shapes the slot
/// type check can never accept come back as `Undefined`.
fn json_to_input(json: &serde_json::Value) -> ValueInput {
    use serde_json::Value;
    match json {
        Value::Null => ValueInput::Null,
        Value::Bool(v) => ValueInput::Bool(*v),
        Value::Number(n) => n
            .as_f64()
            .map(ValueInput::Number)
            .unwrap_or(ValueInput::Undefined),
        Value::String(s) => ValueInput::Text(s.clone()),
        Value::Array(items) => {
            let floats: Option<Vec<f32>> = items
                .iter()
                .map(|item| item.as_f64().map(|v| v as f32))
                .collect();
            floats.map(ValueInput::Array).unwrap_or(ValueInput::Undefined)
        }
        Value::Object(_) => ValueInput::Undefined,
    }
}

/// The 3x3 identity matrix in row-major order, the default for all
/// misalignment/soft-iron calibration matrices.
const IDENTITY_3X3: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
const ONES_3: [f32; 3] = [1.0, 1.0, 1.0];
const ZEROS_3: [f32; 3] = [0.0, 0.0, 0.0];

/// Builds the standard settings table.
///
/// Declaration order is wire order for `readall` and for the persisted
/// document. Entries marked read-only are factory-programmed identity and
/// calibration fields; they accept writes only in factory mode.
fn default_entries() -> Vec<SettingEntry> {
    vec![
        // Calibration
        SettingEntry::str("calibrationDate", 32, "Unknown").read_only(),
        SettingEntry::float_array("gyroscopeMisalignment", &IDENTITY_3X3),
        SettingEntry::float_array("gyroscopeSensitivity", &ONES_3),
        SettingEntry::float_array("gyroscopeOffset", &ZEROS_3),
        SettingEntry::float_array("accelerometerMisalignment", &IDENTITY_3X3),
        SettingEntry::float_array("accelerometerSensitivity", &ONES_3),
        SettingEntry::float_array("accelerometerOffset", &ZEROS_3),
        SettingEntry::float_array("softIronMatrix", &IDENTITY_3X3),
        SettingEntry::float_array("hardIronOffset", &ZEROS_3),
        SettingEntry::float_array("highGAccelerometerMisalignment", &IDENTITY_3X3),
        SettingEntry::float_array("highGAccelerometerSensitivity", &ONES_3),
        SettingEntry::float_array("highGAccelerometerOffset", &ZEROS_3),
        // Identity
        SettingEntry::str("deviceName", 32, "IMULink"),
        SettingEntry::str("serialNumber", 20, "Unknown").read_only(),
        SettingEntry::str("firmwareVersion", 10, "Unknown").read_only(),
        SettingEntry::str("bootloaderVersion", 10, "Unknown").read_only(),
        SettingEntry::str("hardwareVersion", 8, "Unknown").read_only(),
        // Serial
        SettingEntry::int("serialMode", 0),
        SettingEntry::int("serialBaudRate", 115_200),
        SettingEntry::bool("serialRtsCtsEnabled", false),
        SettingEntry::int("serialAccessoryNumberOfBytes", 1024),
        SettingEntry::byte("serialAccessoryTerminationByte", 10),
        SettingEntry::int("serialAccessoryTimeout", 100),
        // Wireless
        SettingEntry::int("wirelessMode", 2),
        SettingEntry::str("wirelessFirmwareVersion", 10, "Unknown").read_only(),
        SettingEntry::bool("externalAntennaeEnabled", false),
        SettingEntry::int("wiFiRegion", 1),
        SettingEntry::str("wiFiMacAddress", 18, "0").read_only(),
        SettingEntry::str("wiFiIPAddress", 16, "0"),
        SettingEntry::str("wiFiClientSsid", 64, "IMULink Network"),
        SettingEntry::str("wiFiClientKey", 64, ""),
        SettingEntry::int("wiFiClientChannel", 0),
        SettingEntry::bool("wiFiClientDhcpEnabled", true),
        SettingEntry::str("wiFiClientIPAddress", 16, "192.168.1.2"),
        SettingEntry::str("wiFiClientNetmask", 16, "255.255.255.0"),
        SettingEntry::str("wiFiClientGateway", 16, "192.168.1.1"),
        SettingEntry::str("wiFiAPSsid", 64, ""),
        SettingEntry::str("wiFiAPKey", 64, ""),
        SettingEntry::int("wiFiAPChannel", 36),
        // Network
        SettingEntry::int("tcpPort", 7000),
        SettingEntry::str("udpIPAddress", 16, "0"),
        SettingEntry::int("udpSendPort", 0),
        SettingEntry::int("udpReceivePort", 9000),
        SettingEntry::bool("synchronisationEnabled", true),
        SettingEntry::int("synchronisationNetworkLatency", 1500),
        // Bluetooth
        SettingEntry::int("bluetoothAddress", 0),
        SettingEntry::str("bluetoothName", 32, "IMULink"),
        SettingEntry::str("bluetoothPinCode", 5, "1234"),
        SettingEntry::int("bluetoothDiscoveryMode", 2),
        SettingEntry::int("bluetoothPairedAddress", 0),
        SettingEntry::int("bluetoothPairedLinkKey", 0),
        // Data logger
        SettingEntry::bool("dataLoggerEnabled", false),
        SettingEntry::str("dataLoggerFileNamePrefix", 16, ""),
        SettingEntry::bool("dataLoggerFileNameTimeEnabled", true),
        SettingEntry::bool("dataLoggerFileNameCounterEnabled", false),
        SettingEntry::int("dataLoggerMaxFileSize", 0),
        SettingEntry::int("dataLoggerMaxFilePeriod", 0),
        // AHRS
        SettingEntry::int("axesAlignment", 0),
        SettingEntry::bool("gyroscopeOffsetCorrectionEnabled", true),
        SettingEntry::int("ahrsAxesConvention", 0),
        SettingEntry::float("ahrsGain", 0.5),
        SettingEntry::bool("ahrsIgnoreMagnetometer", false),
        SettingEntry::bool("ahrsAccelerationRejectionEnabled", true),
        SettingEntry::bool("ahrsMagneticRejectionEnabled", true),
        // Data message routing
        SettingEntry::bool("binaryModeEnabled", true),
        SettingEntry::bool("usbDataMessagesEnabled", true),
        SettingEntry::bool("serialDataMessagesEnabled", true),
        SettingEntry::bool("tcpDataMessagesEnabled", true),
        SettingEntry::bool("udpDataMessagesEnabled", true),
        SettingEntry::bool("bluetoothDataMessagesEnabled", true),
        SettingEntry::bool("dataLoggerDataMessagesEnabled", true),
        // Message rates
        SettingEntry::int("ahrsMessageType", 0),
        SettingEntry::int("inertialMessageRateDivisor", 8),
        SettingEntry::int("magnetometerMessageRateDivisor", 1),
        SettingEntry::int("ahrsMessageRateDivisor", 8),
        SettingEntry::int("highGAccelerometerMessageRateDivisor", 32),
        SettingEntry::int("temperatureMessageRateDivisor", 5),
        SettingEntry::int("batteryMessageRateDivisor", 5),
        SettingEntry::int("rssiMessageRateDivisor", 1),
    ]
}
