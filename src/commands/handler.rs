//! Command Dispatcher Module
//!
//! This module resolves parsed commands against the device and produces
//! the outbound messages for each one. Dispatch has two tiers, checked in
//! order:
//!
//! 1. **Settings tier** - the key's hash is looked up in the settings
//!    registry. A `null` value is a read; anything else is a write that
//!    echoes the stored value back. A setting name always shadows a
//!    same-named fixed command.
//! 2. **Fixed-command tier** - a closed set of verbs matched by hash:
//!
//!    | Verb                              | Action                                     |
//!    |-----------------------------------|--------------------------------------------|
//!    | `default`                         | reload registry from default configuration |
//!    | `apply`                           | ack only (writes take effect immediately)  |
//!    | `save`                            | persist registry, then ack                 |
//!    | `time`                            | read or write the device clock             |
//!    | `ping`                            | emit device identity                       |
//!    | `reset` `shutdown` `bootloader`   | ack, then delegate to device control       |
//!    | `factory`                         | enter factory mode, ack                    |
//!    | `erase` `format` `test`           | delegate, then ack                         |
//!    | `strobe` `colour`                 | delegate to actuators, ack                 |
//!    | `heading`                         | delegate to AHRS (magnetometer-gated)      |
//!    | `accessory`                       | forward payload to the accessory port      |
//!    | `note`                            | wrap payload as notification telemetry     |
//!    | `readall`                         | dump every registry entry                  |
//!
//! An unrecognized key produces a diagnostic error message carrying the
//! key and its computed hash, so a misbehaving host can be debugged from
//! the device's output alone.
//!
//! Device-side actions are delegated through the [`DeviceControl`]
//! capability trait; the dispatcher itself holds no hardware knowledge.

use crate::protocol::hash::djb2;
use crate::protocol::tokenizer::{tokenize, ParsedCommand};
use crate::protocol::types::{
    Announcement, OutboundMessage, PingInfo, ResponseMessage, TelemetryMessage, ValueInput,
    ValueKind, WireValue,
};
use crate::settings::{ConfigStore, SettingError, SettingsRegistry};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fixed command verb hashes, computed at compile time from the verb
/// strings so they can never drift from the hash function.
mod verbs {
    use crate::protocol::hash::djb2;

    pub const DEFAULT: u32 = djb2("default");
    pub const APPLY: u32 = djb2("apply");
    pub const SAVE: u32 = djb2("save");
    pub const TIME: u32 = djb2("time");
    pub const PING: u32 = djb2("ping");
    pub const RESET: u32 = djb2("reset");
    pub const SHUTDOWN: u32 = djb2("shutdown");
    pub const BOOTLOADER: u32 = djb2("bootloader");
    pub const FACTORY: u32 = djb2("factory");
    pub const ERASE: u32 = djb2("erase");
    pub const FORMAT: u32 = djb2("format");
    pub const TEST: u32 = djb2("test");
    pub const STROBE: u32 = djb2("strobe");
    pub const COLOUR: u32 = djb2("colour");
    pub const HEADING: u32 = djb2("heading");
    pub const ACCESSORY: u32 = djb2("accessory");
    pub const NOTE: u32 = djb2("note");
    pub const READ_ALL: u32 = djb2("readall");
}

/// Capability interface for device-side actions.
///
/// The host environment implements whichever actions its hardware
/// supports; every method has a no-op default, so a partial
/// implementation is always valid. [`NullDeviceControl`] implements
/// nothing at all.
pub trait DeviceControl: Send {
    /// Restarts the device.
    fn reset(&mut self) {}

    /// Powers the device down.
    fn shutdown(&mut self) {}

    /// Reboots into the bootloader.
    fn bootloader(&mut self) {}

    /// Runs the factory-mode entry procedure.
    fn factory(&mut self) {}

    /// Erases persisted state.
    fn erase(&mut self) {}

    /// Formats the storage medium.
    fn format(&mut self) {}

    /// Runs the self-test procedure.
    fn self_test(&mut self) {}

    /// Fires the strobe.
    fn strobe(&mut self) {}

    /// Sets the indicator colour.
    fn colour(&mut self, _colour: &str) {}

    /// Seeds the AHRS heading in degrees.
    fn heading(&mut self, _degrees: f32) {}

    /// Forwards a payload to the serial accessory port.
    fn accessory(&mut self, _payload: &str) {}

    /// Reads the device clock, if the platform has one.
    fn read_time(&self) -> Option<String> {
        None
    }

    /// Writes the device clock. Returns false if unsupported.
    fn write_time(&mut self, _time: &str) -> bool {
        false
    }
}

/// A device control that performs no actions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDeviceControl;

impl DeviceControl for NullDeviceControl {}

/// Process-wide mutable device state, owned by the dispatcher and passed
/// through the whole request path.
#[derive(Debug)]
pub struct DeviceState {
    /// The settings table
    pub registry: SettingsRegistry,
    /// Permits writes to read-only settings
    pub factory_mode: bool,
    /// Gates all outbound sends
    pub active: bool,
}

impl DeviceState {
    pub fn new(registry: SettingsRegistry) -> Self {
        Self {
            registry,
            factory_mode: false,
            active: true,
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(SettingsRegistry::with_defaults())
    }
}

/// Resolves commands against the settings registry and the fixed command
/// table, producing outbound messages.
pub struct CommandHandler {
    state: DeviceState,
    control: Box<dyn DeviceControl>,
    store: Box<dyn ConfigStore>,
    /// Interface name reported by `ping`
    interface: &'static str,
    /// Reference point for the 32-bit microsecond timestamps
    started: Instant,
}

impl CommandHandler {
    /// Creates a handler over the given state, device control and
    /// persistence bridge.
    pub fn new(
        state: DeviceState,
        control: Box<dyn DeviceControl>,
        store: Box<dyn ConfigStore>,
    ) -> Self {
        Self {
            state,
            control,
            store,
            interface: "UDP",
            started: Instant::now(),
        }
    }

    /// Sets the interface name reported by `ping`.
    pub fn with_interface(mut self, interface: &'static str) -> Self {
        self.interface = interface;
        self
    }

    /// Whether outbound sends are enabled.
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    /// Current 32-bit microsecond timestamp. Wraps roughly every 71
    /// minutes, matching the wire format's counter width.
    fn micros(&self) -> u32 {
        self.started.elapsed().as_micros() as u32
    }

    /// Tokenizes and dispatches one terminator-delimited line.
    ///
    /// Malformed lines are dropped silently (no response on the wire),
    /// mirroring the rule that garbage gets no reply.
    pub fn dispatch_line(&mut self, line: &[u8]) -> Vec<OutboundMessage> {
        match tokenize(line) {
            Ok(Some(command)) => self.execute(&command),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!(error = %e, "malformed command dropped");
                Vec::new()
            }
        }
    }

    /// Dispatches one parsed command.
    pub fn execute(&mut self, command: &ParsedCommand) -> Vec<OutboundMessage> {
        let key_hash = djb2(&command.key);

        // Settings tier first: a setting name shadows any fixed command.
        if let Some(index) = self.state.registry.find(key_hash) {
            return self.handle_setting(index, command);
        }

        self.handle_verb(key_hash, command)
    }

    // ========================================================================
    // Settings tier
    // ========================================================================

    fn handle_setting(&mut self, index: usize, command: &ParsedCommand) -> Vec<OutboundMessage> {
        // A null value is a read request; anything else is a write.
        if command.kind == ValueKind::Null {
            return vec![self.setting_response(index)];
        }

        let input = ValueInput::parse(&command.raw_value, command.kind);
        match self
            .state
            .registry
            .write(index, &input, self.state.factory_mode)
        {
            Ok(()) => vec![self.setting_response(index)],
            Err(e @ SettingError::ReadOnly { .. }) => {
                warn!(key = command.key.as_str(), "write to read-only setting rejected");
                vec![self.error(e.to_string())]
            }
            Err(e) => {
                // Reject the write but still echo the unchanged value, so
                // the host sees there was no silent partial update.
                debug!(key = command.key.as_str(), error = %e, "setting write rejected");
                vec![self.error(e.to_string()), self.setting_response(index)]
            }
        }
    }

    fn setting_response(&self, index: usize) -> OutboundMessage {
        let entry = self.state.registry.entry(index);
        ResponseMessage::key_value(entry.name(), entry.wire_value()).into()
    }

    // ========================================================================
    // Fixed-command tier
    // ========================================================================

    fn handle_verb(&mut self, key_hash: u32, command: &ParsedCommand) -> Vec<OutboundMessage> {
        let input = ValueInput::parse(&command.raw_value, command.kind);

        match key_hash {
            verbs::DEFAULT => self.cmd_default(),
            verbs::APPLY => {
                // Settings take effect the moment they are written, so
                // apply is an acknowledgement and nothing else.
                vec![ResponseMessage::ack("apply").into()]
            }
            verbs::SAVE => self.cmd_save(),
            verbs::TIME => self.cmd_time(&input),
            verbs::PING => vec![ResponseMessage::Ping(self.ping_info()).into()],
            verbs::RESET => {
                info!("reset requested");
                let ack = ResponseMessage::ack("reset").into();
                self.control.reset();
                vec![ack]
            }
            verbs::SHUTDOWN => {
                info!("shutdown requested");
                let ack = ResponseMessage::ack("shutdown").into();
                self.control.shutdown();
                vec![ack]
            }
            verbs::BOOTLOADER => {
                info!("bootloader requested");
                let ack = ResponseMessage::ack("bootloader").into();
                self.control.bootloader();
                vec![ack]
            }
            verbs::FACTORY => {
                self.control.factory();
                self.state.factory_mode = true;
                info!("factory mode entered");
                vec![ResponseMessage::ack("factory").into()]
            }
            verbs::ERASE => {
                self.control.erase();
                vec![ResponseMessage::ack("erase").into()]
            }
            verbs::FORMAT => {
                self.control.format();
                vec![ResponseMessage::ack("format").into()]
            }
            verbs::TEST => {
                self.control.self_test();
                vec![ResponseMessage::ack("test").into()]
            }
            verbs::STROBE => {
                self.control.strobe();
                vec![ResponseMessage::ack("strobe").into()]
            }
            verbs::COLOUR => match &input {
                ValueInput::Text(colour) => {
                    self.control.colour(colour);
                    vec![ResponseMessage::ack("colour").into()]
                }
                _ => vec![self.error("colour requires a string value".to_string())],
            },
            verbs::HEADING => self.cmd_heading(&input),
            verbs::ACCESSORY => match &input {
                ValueInput::Text(payload) => {
                    self.control.accessory(payload);
                    vec![ResponseMessage::ack("accessory").into()]
                }
                _ => vec![self.error("accessory requires a string value".to_string())],
            },
            verbs::NOTE => match &input {
                ValueInput::Text(note) => vec![TelemetryMessage::Notification {
                    timestamp: self.micros(),
                    note: note.clone(),
                }
                .into()],
                _ => vec![self.error("note requires a string value".to_string())],
            },
            verbs::READ_ALL => self
                .state
                .registry
                .enumerate()
                .map(|entry| ResponseMessage::key_value(entry.name(), entry.wire_value()).into())
                .collect(),
            _ => {
                debug!(
                    key = command.key.as_str(),
                    hash = format_args!("{key_hash:08x}"),
                    "unrecognized command key"
                );
                vec![self.error(format!(
                    "Did not recognize key: {} as {:08x}",
                    command.key, key_hash
                ))]
            }
        }
    }

    fn cmd_default(&mut self) -> Vec<OutboundMessage> {
        match self.store.load_defaults() {
            Ok(doc) => {
                let applied = self.state.registry.apply_document(&doc);
                info!(applied, "default configuration loaded");
                vec![ResponseMessage::ack("default").into()]
            }
            Err(e) => {
                warn!(error = %e, "default configuration load failed");
                vec![self.error(format!("failed to load default configuration: {e}"))]
            }
        }
    }

    fn cmd_save(&mut self) -> Vec<OutboundMessage> {
        let doc = self.state.registry.to_document();
        match self.store.save(&doc) {
            Ok(()) => {
                info!("configuration saved");
                vec![ResponseMessage::ack("save").into()]
            }
            Err(e) => {
                warn!(error = %e, "configuration save failed");
                vec![self.error(format!("failed to save configuration: {e}"))]
            }
        }
    }

    fn cmd_time(&mut self, input: &ValueInput) -> Vec<OutboundMessage> {
        // A non-null value writes the clock first; a read always follows.
        if let ValueInput::Text(time) = input {
            if !self.control.write_time(time) {
                return vec![self.error("device clock is not writable".to_string())];
            }
        }
        match self.control.read_time() {
            Some(time) => vec![ResponseMessage::key_value("time", WireValue::Str(time)).into()],
            None => vec![self.error("device clock unavailable".to_string())],
        }
    }

    fn cmd_heading(&mut self, input: &ValueInput) -> Vec<OutboundMessage> {
        let ValueInput::Number(degrees) = input else {
            return vec![self.error("heading requires a numeric value".to_string())];
        };
        let degrees = *degrees as f32;

        // The AHRS only takes the seed while the magnetometer is in use.
        if !self.bool_setting("ahrsIgnoreMagnetometer") {
            self.control.heading(degrees);
        }
        vec![ResponseMessage::key_value("heading", WireValue::Float(degrees)).into()]
    }

    fn ping_info(&self) -> PingInfo {
        PingInfo {
            interface: self.interface.to_string(),
            device_name: self.string_setting("deviceName"),
            serial_number: self.string_setting("serialNumber"),
        }
    }

    /// Builds the discovery announcement from the registry plus the
    /// platform-supplied link and battery figures.
    pub fn announcement(&self, rssi: u8, battery: u8, status: u8) -> Announcement {
        Announcement {
            sync: 0,
            name: self.string_setting("deviceName"),
            serial_number: self.string_setting("serialNumber"),
            ip_address: self.string_setting("wiFiIPAddress"),
            tcp_port: self.port_setting("tcpPort"),
            udp_send_port: self.port_setting("udpSendPort"),
            udp_receive_port: self.port_setting("udpReceivePort"),
            rssi,
            battery,
            status,
        }
    }

    fn error(&self, message: String) -> OutboundMessage {
        TelemetryMessage::Error {
            timestamp: self.micros(),
            message,
        }
        .into()
    }

    // ========================================================================
    // Registry helpers
    // ========================================================================

    fn string_setting(&self, name: &str) -> String {
        match self.read_setting(name) {
            Some(WireValue::Str(s)) => s,
            _ => String::new(),
        }
    }

    fn bool_setting(&self, name: &str) -> bool {
        matches!(self.read_setting(name), Some(WireValue::Bool(true)))
    }

    fn port_setting(&self, name: &str) -> u16 {
        match self.read_setting(name) {
            Some(WireValue::Int(n)) if (0..=i32::from(u16::MAX)).contains(&n) => n as u16,
            _ => 0,
        }
    }

    fn read_setting(&self, name: &str) -> Option<WireValue> {
        self.state
            .registry
            .find_by_name(name)
            .map(|index| self.state.registry.read(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryStore, PersistenceError, SettingEntry};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records which device-control actions fired.
    #[derive(Default, Clone)]
    struct RecordingControl {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingControl {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }
    }

    impl DeviceControl for RecordingControl {
        fn reset(&mut self) {
            self.record("reset");
        }
        fn shutdown(&mut self) {
            self.record("shutdown");
        }
        fn factory(&mut self) {
            self.record("factory");
        }
        fn strobe(&mut self) {
            self.record("strobe");
        }
        fn colour(&mut self, colour: &str) {
            self.record(format!("colour:{colour}"));
        }
        fn heading(&mut self, degrees: f32) {
            self.record(format!("heading:{degrees}"));
        }
        fn accessory(&mut self, payload: &str) {
            self.record(format!("accessory:{payload}"));
        }
        fn read_time(&self) -> Option<String> {
            Some("2023-05-19 12:00:00".to_string())
        }
        fn write_time(&mut self, time: &str) -> bool {
            self.record(format!("write_time:{time}"));
            true
        }
    }

    /// A persistence bridge that always fails.
    struct FailStore;

    impl ConfigStore for FailStore {
        fn load(&self) -> Result<serde_json::Value, PersistenceError> {
            Err(std::io::Error::other("medium offline").into())
        }
        fn load_defaults(&self) -> Result<serde_json::Value, PersistenceError> {
            Err(std::io::Error::other("medium offline").into())
        }
        fn save(&self, _doc: &serde_json::Value) -> Result<(), PersistenceError> {
            Err(std::io::Error::other("medium offline").into())
        }
    }

    fn handler() -> CommandHandler {
        CommandHandler::new(
            DeviceState::default(),
            Box::new(NullDeviceControl),
            Box::new(MemoryStore::default()),
        )
    }

    fn handler_with_control() -> (CommandHandler, RecordingControl) {
        let control = RecordingControl::default();
        let h = CommandHandler::new(
            DeviceState::default(),
            Box::new(control.clone()),
            Box::new(MemoryStore::default()),
        );
        (h, control)
    }

    fn wire(messages: &[OutboundMessage]) -> Vec<String> {
        messages
            .iter()
            .map(|m| String::from_utf8(m.serialize()).unwrap())
            .collect()
    }

    #[test]
    fn test_read_setting() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":null}\n"));
        assert_eq!(out, vec!["{\"ahrsGain\":0.5000}\r\n"]);
    }

    #[test]
    fn test_write_setting_echoes_new_value() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":0.8}\n"));
        assert_eq!(out, vec!["{\"ahrsGain\":0.8000}\r\n"]);

        // Write-then-read is idempotent
        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":null}\n"));
        assert_eq!(out, vec!["{\"ahrsGain\":0.8000}\r\n"]);
    }

    #[test]
    fn test_write_string_setting() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"deviceName\":\"Unit A\"}\n"));
        assert_eq!(out, vec!["{\"deviceName\":\"Unit A\"}\r\n"]);
    }

    #[test]
    fn test_write_float_array_setting() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"gyroscopeOffset\":[0.1,0.2,0.3]}\n"));
        assert_eq!(
            out,
            vec!["{\"gyroscopeOffset\":[0.1000,0.2000,0.3000]}\r\n"]
        );
    }

    #[test]
    fn test_arity_mismatch_reports_and_echoes_old_value() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"gyroscopeOffset\":[1.0,2.0]}\n"));
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("F,"), "first message is an error: {}", out[0]);
        assert!(out[0].contains("gyroscopeOffset"));
        assert_eq!(out[1], "{\"gyroscopeOffset\":[0.0000,0.0000,0.0000]}\r\n");
    }

    #[test]
    fn test_type_mismatch_reports_and_echoes_old_value() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":true}\n"));
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("F,"));
        assert_eq!(out[1], "{\"ahrsGain\":0.5000}\r\n");
    }

    #[test]
    fn test_read_only_rejected_outside_factory_mode() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"serialNumber\":\"0001\"}\n"));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("F,"));
        assert!(out[0].contains("read-only"));

        // Enter factory mode; the same write now succeeds.
        h.dispatch_line(b"{\"factory\":null}\n");
        let out = wire(&h.dispatch_line(b"{\"serialNumber\":\"0001\"}\n"));
        assert_eq!(out, vec!["{\"serialNumber\":\"0001\"}\r\n"]);
    }

    #[test]
    fn test_unknown_key_diagnostic() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"frobnicate\":1}\n"));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("F,"));
        assert!(
            out[0].ends_with("Did not recognize key: frobnicate as a1e00be2\r\n"),
            "got: {}",
            out[0]
        );
    }

    #[test]
    fn test_setting_shadows_fixed_command() {
        // A registry entry named "ping" must take priority over the verb.
        let mut entries = vec![SettingEntry::int("ping", 7)];
        entries.push(SettingEntry::float("ahrsGain", 0.5));
        let state = DeviceState::new(SettingsRegistry::from_entries(entries));
        let mut h = CommandHandler::new(
            state,
            Box::new(NullDeviceControl),
            Box::new(MemoryStore::default()),
        );

        let out = wire(&h.dispatch_line(b"{\"ping\":null}\n"));
        assert_eq!(out, vec!["{\"ping\":7}\r\n"]);
    }

    #[test]
    fn test_ping_identity() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"ping\":null}\n"));
        assert_eq!(
            out,
            vec!["{\"ping\":{\"interface\":\"UDP\",\"deviceName\":\"IMULink\",\"serialNumber\":\"Unknown\"}}\r\n"]
        );
    }

    #[test]
    fn test_apply_is_ack_only() {
        let mut h = handler();
        let before = h.state().registry.clone();
        let out = wire(&h.dispatch_line(b"{\"apply\":null}\n"));
        assert_eq!(out, vec!["{\"apply\":null}\r\n"]);
        assert_eq!(
            before.to_document(),
            h.state().registry.to_document(),
            "apply must not touch the registry"
        );
    }

    #[test]
    fn test_save_persists_document() {
        let store = Arc::new(MemoryStore::default());

        struct SharedStore(Arc<MemoryStore>);
        impl ConfigStore for SharedStore {
            fn load(&self) -> Result<serde_json::Value, PersistenceError> {
                self.0.load()
            }
            fn load_defaults(&self) -> Result<serde_json::Value, PersistenceError> {
                self.0.load_defaults()
            }
            fn save(&self, doc: &serde_json::Value) -> Result<(), PersistenceError> {
                self.0.save(doc)
            }
        }

        let mut h = CommandHandler::new(
            DeviceState::default(),
            Box::new(NullDeviceControl),
            Box::new(SharedStore(Arc::clone(&store))),
        );

        h.dispatch_line(b"{\"ahrsGain\":0.25}\n");
        let out = wire(&h.dispatch_line(b"{\"save\":null}\n"));
        assert_eq!(out, vec!["{\"save\":null}\r\n"]);

        let saved = store.saved().expect("document saved");
        assert_eq!(saved.get("ahrsGain"), Some(&json!(0.25)));
    }

    #[test]
    fn test_save_failure_is_failed_ack() {
        let mut h = CommandHandler::new(
            DeviceState::default(),
            Box::new(NullDeviceControl),
            Box::new(FailStore),
        );
        let out = wire(&h.dispatch_line(b"{\"save\":null}\n"));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("F,"));
        assert!(out[0].contains("failed to save configuration"));
    }

    #[test]
    fn test_default_reloads_registry() {
        let store = MemoryStore::new(json!({ "ahrsGain": 0.25 }));
        let mut h = CommandHandler::new(
            DeviceState::default(),
            Box::new(NullDeviceControl),
            Box::new(store),
        );

        h.dispatch_line(b"{\"ahrsGain\":0.9}\n");
        let out = wire(&h.dispatch_line(b"{\"default\":null}\n"));
        assert_eq!(out, vec!["{\"default\":null}\r\n"]);

        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":null}\n"));
        assert_eq!(out, vec!["{\"ahrsGain\":0.2500}\r\n"]);
    }

    #[test]
    fn test_default_failure_leaves_registry() {
        let mut h = CommandHandler::new(
            DeviceState::default(),
            Box::new(NullDeviceControl),
            Box::new(FailStore),
        );
        h.dispatch_line(b"{\"ahrsGain\":0.9}\n");

        let out = wire(&h.dispatch_line(b"{\"default\":null}\n"));
        assert!(out[0].starts_with("F,"));

        let out = wire(&h.dispatch_line(b"{\"ahrsGain\":null}\n"));
        assert_eq!(out, vec!["{\"ahrsGain\":0.9000}\r\n"]);
    }

    #[test]
    fn test_reset_acks_then_delegates() {
        let (mut h, control) = handler_with_control();
        let out = wire(&h.dispatch_line(b"{\"reset\":null}\n"));
        assert_eq!(out, vec!["{\"reset\":null}\r\n"]);
        assert_eq!(control.events(), vec!["reset"]);
    }

    #[test]
    fn test_factory_enters_factory_mode() {
        let (mut h, control) = handler_with_control();
        assert!(!h.state().factory_mode);
        let out = wire(&h.dispatch_line(b"{\"factory\":null}\n"));
        assert_eq!(out, vec!["{\"factory\":null}\r\n"]);
        assert!(h.state().factory_mode);
        assert_eq!(control.events(), vec!["factory"]);
    }

    #[test]
    fn test_strobe_and_colour() {
        let (mut h, control) = handler_with_control();
        h.dispatch_line(b"{\"strobe\":null}\n");
        h.dispatch_line(b"{\"colour\":\"#FF8000\"}\n");
        assert_eq!(control.events(), vec!["strobe", "colour:#FF8000"]);
    }

    #[test]
    fn test_heading_gated_on_magnetometer_setting() {
        let (mut h, control) = handler_with_control();

        // Magnetometer in use: the seed goes through and is echoed.
        let out = wire(&h.dispatch_line(b"{\"heading\":90.0}\n"));
        assert_eq!(out, vec!["{\"heading\":90.0000}\r\n"]);
        assert_eq!(control.events(), vec!["heading:90"]);

        // Magnetometer ignored: the echo is still sent but the AHRS is
        // not seeded.
        h.dispatch_line(b"{\"ahrsIgnoreMagnetometer\":true}\n");
        let out = wire(&h.dispatch_line(b"{\"heading\":45.0}\n"));
        assert_eq!(out, vec!["{\"heading\":45.0000}\r\n"]);
        assert_eq!(control.events(), vec!["heading:90"]);
    }

    #[test]
    fn test_accessory_forwards_payload() {
        let (mut h, control) = handler_with_control();
        let out = wire(&h.dispatch_line(b"{\"accessory\":\"AT+RST\"}\n"));
        assert_eq!(out, vec!["{\"accessory\":null}\r\n"]);
        assert_eq!(control.events(), vec!["accessory:AT+RST"]);
    }

    #[test]
    fn test_note_becomes_notification_telemetry() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"note\":\"calibration start\"}\n"));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("N,"));
        assert!(out[0].ends_with(",calibration start\r\n"));
    }

    #[test]
    fn test_time_read_and_write() {
        let (mut h, control) = handler_with_control();

        let out = wire(&h.dispatch_line(b"{\"time\":null}\n"));
        assert_eq!(out, vec!["{\"time\":\"2023-05-19 12:00:00\"}\r\n"]);

        let out = wire(&h.dispatch_line(b"{\"time\":\"2024-01-01 00:00:00\"}\n"));
        assert_eq!(out, vec!["{\"time\":\"2023-05-19 12:00:00\"}\r\n"]);
        assert_eq!(control.events(), vec!["write_time:2024-01-01 00:00:00"]);
    }

    #[test]
    fn test_time_unavailable() {
        let mut h = handler();
        let out = wire(&h.dispatch_line(b"{\"time\":null}\n"));
        assert!(out[0].starts_with("F,"));
        assert!(out[0].contains("clock unavailable"));
    }

    #[test]
    fn test_readall_dumps_every_entry() {
        let mut h = handler();
        let out = h.dispatch_line(b"{\"readall\":null}\n");
        assert_eq!(out.len(), h.state().registry.len());

        let first = String::from_utf8(out[0].serialize()).unwrap();
        assert!(first.starts_with("{\"calibrationDate\":"));
        let last = String::from_utf8(out[out.len() - 1].serialize()).unwrap();
        assert!(last.starts_with("{\"rssiMessageRateDivisor\":"));
    }

    #[test]
    fn test_malformed_line_is_dropped_silently() {
        let mut h = handler();
        assert!(h.dispatch_line(b"garbage\n").is_empty());
        assert!(h.dispatch_line(b"{\"ping\"\n").is_empty());
        assert!(h.dispatch_line(b"").is_empty());
        assert!(h.dispatch_line(b"\n").is_empty());
    }

    #[test]
    fn test_announcement_snapshot() {
        let h = handler();
        let na = h.announcement(87, 54, 1);
        assert_eq!(na.name, "IMULink");
        assert_eq!(na.udp_receive_port, 9000);
        assert_eq!(na.tcp_port, 7000);
        assert_eq!(na.rssi, 87);
        assert_eq!(na.battery, 54);
        assert_eq!(na.status, 1);
    }
}
