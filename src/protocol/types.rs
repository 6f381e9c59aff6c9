//! Wire Types and Message Encoding
//!
//! This module defines the data types that cross the wire in both
//! directions, plus the encoder that turns outbound messages into bytes.
//!
//! ## Wire Formats
//!
//! Outbound traffic uses two disjoint sublanguages:
//!
//! **Command responses** are single-key JSON objects terminated with CRLF:
//!
//! - Setting read/write echo: `{"ahrsGain":0.5000}\r\n`
//! - Command ack: `{"save":null}\r\n`
//! - Ping: `{"ping":{"interface":"UDP","deviceName":...,"serialNumber":...}}\r\n`
//! - Network announcement: `{"sync":0,"name":...,"sn":...,...}\r\n`
//!
//! **Telemetry messages** are ASCII CSV rows with a single-letter prefix,
//! a 32-bit microsecond timestamp, and CRLF termination:
//!
//! | Prefix | Payload                                  |
//! |--------|------------------------------------------|
//! | `I`    | gx,gy,gz,ax,ay,az                        |
//! | `M`    | mx,my,mz                                 |
//! | `T`    | temperature                              |
//! | `Q`    | w,x,y,z                                  |
//! | `A`    | roll,pitch,yaw                           |
//! | `B`    | percentCharged,voltage,chargingStatus    |
//! | `W`    | rssiPercentage,power                     |
//! | `N`    | note text                                |
//! | `F`    | error text                               |
//!
//! All floats are formatted with exactly four decimal digits so the output
//! is byte-for-byte stable for a given input. Encoding never performs I/O
//! and never fails.

use std::fmt;

/// The CRLF terminator appended to every outbound message.
pub const CRLF: &[u8] = b"\r\n";

/// Classification of an inbound command value, decided from the first
/// significant byte of the raw value text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `null` - a read request
    Null,
    /// `true` / `false`
    Bool,
    /// Digit or leading minus
    Number,
    /// Opening double quote
    String,
    /// Anything else (including arrays, which are resolved at write time)
    Undefined,
}

impl ValueKind {
    /// Classifies a value from its first significant byte.
    pub fn classify(first: u8) -> Self {
        match first {
            b'n' => ValueKind::Null,
            b't' | b'f' => ValueKind::Bool,
            b'-' | b'0'..=b'9' => ValueKind::Number,
            b'"' => ValueKind::String,
            _ => ValueKind::Undefined,
        }
    }
}

/// A command value parsed out of the raw value text.
///
/// This is the untyped input handed to the settings registry; the registry
/// type-checks it against the target slot. Arrays only appear here (there
/// is no `ValueKind::Array`) because an array is recognised from the raw
/// text when the write is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    /// A read request
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Array(Vec<f32>),
    /// Unparseable input; always rejected by the registry
    Undefined,
}

impl ValueInput {
    /// Parses raw value text into a typed input.
    ///
    /// The `kind` is the tokenizer's classification; the raw text is only
    /// interpreted in the way that classification allows. Anything that
    /// does not parse cleanly becomes `Undefined` rather than an error,
    /// so a bad write is rejected by the registry with the setting's own
    /// type information in hand.
    pub fn parse(raw: &str, kind: ValueKind) -> Self {
        let raw = raw.trim();
        match kind {
            ValueKind::Null => ValueInput::Null,
            ValueKind::Bool => match raw {
                "true" => ValueInput::Bool(true),
                "false" => ValueInput::Bool(false),
                _ => ValueInput::Undefined,
            },
            ValueKind::Number => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => ValueInput::Number(n),
                _ => ValueInput::Undefined,
            },
            ValueKind::String => ValueInput::Text(unquote(raw)),
            ValueKind::Undefined => parse_float_array(raw)
                .map(ValueInput::Array)
                .unwrap_or(ValueInput::Undefined),
        }
    }
}

/// Strips surrounding double quotes and resolves backslash escapes for
/// quote and backslash. Other escapes are passed through untouched.
fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses `[1.0,2.0,3.0]` style float arrays. Returns `None` unless the
/// text is a well-formed, non-nested array of finite numbers.
fn parse_float_array(raw: &str) -> Option<Vec<f32>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| match part.trim().parse::<f32>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => None,
        })
        .collect()
}

/// A setting value projected into a form the encoder can serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Byte(u8),
    Int(i32),
    Float(f32),
    Str(String),
    FloatArray(Vec<f32>),
}

impl WireValue {
    /// Serializes this value in its JSON wire form into `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            WireValue::Null => buf.extend_from_slice(b"null"),
            WireValue::Bool(true) => buf.extend_from_slice(b"true"),
            WireValue::Bool(false) => buf.extend_from_slice(b"false"),
            WireValue::Byte(n) => buf.extend_from_slice(n.to_string().as_bytes()),
            WireValue::Int(n) => buf.extend_from_slice(n.to_string().as_bytes()),
            WireValue::Float(v) => write_float(buf, *v),
            WireValue::Str(s) => write_quoted(buf, s),
            WireValue::FloatArray(values) => {
                buf.push(b'[');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        buf.push(b',');
                    }
                    write_float(buf, *v);
                }
                buf.push(b']');
            }
        }
    }
}

/// Device identity reported by the `ping` command.
#[derive(Debug, Clone, PartialEq)]
pub struct PingInfo {
    /// Interface the command arrived on ("USB", "UDP", ...)
    pub interface: String,
    pub device_name: String,
    pub serial_number: String,
}

/// The periodic network announcement used by hosts to discover devices.
///
/// Broadcast on UDP port 10000 at 1 Hz. The link and battery figures are
/// supplied by the platform layer; they default to zero when the platform
/// has no monitor for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    /// Synchronisation word
    pub sync: u16,
    pub name: String,
    pub serial_number: String,
    pub ip_address: String,
    pub tcp_port: u16,
    pub udp_send_port: u16,
    pub udp_receive_port: u16,
    /// Link strength, 0-100
    pub rssi: u8,
    /// Battery charge, 0-100
    pub battery: u8,
    /// Charging status (0 disconnected, 1 charging, 2 charged)
    pub status: u8,
}

/// A command response in the JSON-object wire sublanguage.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseMessage {
    /// Setting read response or write echo: `{"<key>":<value>}`
    KeyValue { key: String, value: WireValue },
    /// Minimal acknowledgement: `{"<cmd>":null}`
    Ack(String),
    /// Device identity: `{"ping":{...}}`
    Ping(PingInfo),
    /// Discovery broadcast
    Announcement(Announcement),
}

impl ResponseMessage {
    /// Convenience constructor for a setting response.
    pub fn key_value(key: impl Into<String>, value: WireValue) -> Self {
        ResponseMessage::KeyValue {
            key: key.into(),
            value,
        }
    }

    /// Convenience constructor for an ack.
    pub fn ack(command: impl Into<String>) -> Self {
        ResponseMessage::Ack(command.into())
    }

    /// Serializes the response to its wire bytes, CRLF included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            ResponseMessage::KeyValue { key, value } => {
                buf.push(b'{');
                write_quoted(buf, key);
                buf.push(b':');
                value.serialize_into(buf);
                buf.push(b'}');
            }
            ResponseMessage::Ack(command) => {
                buf.push(b'{');
                write_quoted(buf, command);
                buf.extend_from_slice(b":null}");
            }
            ResponseMessage::Ping(info) => {
                buf.extend_from_slice(b"{\"ping\":{\"interface\":");
                write_quoted(buf, &info.interface);
                buf.extend_from_slice(b",\"deviceName\":");
                write_quoted(buf, &info.device_name);
                buf.extend_from_slice(b",\"serialNumber\":");
                write_quoted(buf, &info.serial_number);
                buf.extend_from_slice(b"}}");
            }
            ResponseMessage::Announcement(na) => {
                buf.extend_from_slice(b"{\"sync\":");
                buf.extend_from_slice(na.sync.to_string().as_bytes());
                buf.extend_from_slice(b",\"name\":");
                write_quoted(buf, &na.name);
                buf.extend_from_slice(b",\"sn\":");
                write_quoted(buf, &na.serial_number);
                buf.extend_from_slice(b",\"ip\":");
                write_quoted(buf, &na.ip_address);
                buf.extend_from_slice(b",\"port\":");
                buf.extend_from_slice(na.tcp_port.to_string().as_bytes());
                buf.extend_from_slice(b",\"send\":");
                buf.extend_from_slice(na.udp_send_port.to_string().as_bytes());
                buf.extend_from_slice(b",\"receive\":");
                buf.extend_from_slice(na.udp_receive_port.to_string().as_bytes());
                buf.extend_from_slice(b",\"rssi\":");
                buf.extend_from_slice(na.rssi.to_string().as_bytes());
                buf.extend_from_slice(b",\"battery\":");
                buf.extend_from_slice(na.battery.to_string().as_bytes());
                buf.extend_from_slice(b",\"status\":");
                buf.extend_from_slice(na.status.to_string().as_bytes());
                buf.push(b'}');
            }
        }
        buf.extend_from_slice(CRLF);
    }
}

/// A telemetry message in the CSV wire sublanguage.
///
/// All timestamps are unsigned 32-bit microsecond counts.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    Inertial {
        timestamp: u32,
        gx: f32,
        gy: f32,
        gz: f32,
        ax: f32,
        ay: f32,
        az: f32,
    },
    Magnetometer {
        timestamp: u32,
        mx: f32,
        my: f32,
        mz: f32,
    },
    Temperature {
        timestamp: u32,
        /// Degrees Celsius
        celsius: f32,
    },
    Quaternion {
        timestamp: u32,
        w: f32,
        x: f32,
        y: f32,
        z: f32,
    },
    Euler {
        timestamp: u32,
        roll: f32,
        pitch: f32,
        yaw: f32,
    },
    Battery {
        timestamp: u32,
        percent_charged: f32,
        voltage: f32,
        /// Charging status (0 disconnected, 1 charging, 2 charged)
        status: u32,
    },
    Rssi {
        timestamp: u32,
        percentage: f32,
        power: f32,
    },
    Notification {
        timestamp: u32,
        note: String,
    },
    Error {
        timestamp: u32,
        message: String,
    },
}

impl TelemetryMessage {
    /// Returns the single-letter type prefix for this message.
    pub fn prefix(&self) -> u8 {
        match self {
            TelemetryMessage::Inertial { .. } => b'I',
            TelemetryMessage::Magnetometer { .. } => b'M',
            TelemetryMessage::Temperature { .. } => b'T',
            TelemetryMessage::Quaternion { .. } => b'Q',
            TelemetryMessage::Euler { .. } => b'A',
            TelemetryMessage::Battery { .. } => b'B',
            TelemetryMessage::Rssi { .. } => b'W',
            TelemetryMessage::Notification { .. } => b'N',
            TelemetryMessage::Error { .. } => b'F',
        }
    }

    /// Serializes the message to its wire bytes, CRLF included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the message into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.prefix());
        match self {
            TelemetryMessage::Inertial {
                timestamp,
                gx,
                gy,
                gz,
                ax,
                ay,
                az,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*gx, *gy, *gz, *ax, *ay, *az]);
            }
            TelemetryMessage::Magnetometer {
                timestamp,
                mx,
                my,
                mz,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*mx, *my, *mz]);
            }
            TelemetryMessage::Temperature { timestamp, celsius } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*celsius]);
            }
            TelemetryMessage::Quaternion {
                timestamp,
                w,
                x,
                y,
                z,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*w, *x, *y, *z]);
            }
            TelemetryMessage::Euler {
                timestamp,
                roll,
                pitch,
                yaw,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*roll, *pitch, *yaw]);
            }
            TelemetryMessage::Battery {
                timestamp,
                percent_charged,
                voltage,
                status,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*percent_charged, *voltage]);
                buf.push(b',');
                buf.extend_from_slice(status.to_string().as_bytes());
            }
            TelemetryMessage::Rssi {
                timestamp,
                percentage,
                power,
            } => {
                write_timestamp(buf, *timestamp);
                write_floats(buf, &[*percentage, *power]);
            }
            TelemetryMessage::Notification { timestamp, note } => {
                write_timestamp(buf, *timestamp);
                buf.push(b',');
                buf.extend_from_slice(note.as_bytes());
            }
            TelemetryMessage::Error { timestamp, message } => {
                write_timestamp(buf, *timestamp);
                buf.push(b',');
                buf.extend_from_slice(message.as_bytes());
            }
        }
        buf.extend_from_slice(CRLF);
    }
}

impl fmt::Display for TelemetryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.serialize();
        // The CSV sublanguage is ASCII apart from note/error text.
        write!(f, "{}", String::from_utf8_lossy(&bytes).trim_end())
    }
}

/// Any outbound message, spanning both wire sublanguages.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Response(ResponseMessage),
    Telemetry(TelemetryMessage),
}

impl OutboundMessage {
    /// Serializes the message to its wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            OutboundMessage::Response(r) => r.serialize(),
            OutboundMessage::Telemetry(t) => t.serialize(),
        }
    }
}

impl From<ResponseMessage> for OutboundMessage {
    fn from(r: ResponseMessage) -> Self {
        OutboundMessage::Response(r)
    }
}

impl From<TelemetryMessage> for OutboundMessage {
    fn from(t: TelemetryMessage) -> Self {
        OutboundMessage::Telemetry(t)
    }
}

fn write_timestamp(buf: &mut Vec<u8>, timestamp: u32) {
    buf.push(b',');
    buf.extend_from_slice(timestamp.to_string().as_bytes());
}

fn write_floats(buf: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        buf.push(b',');
        write_float(buf, *v);
    }
}

/// Writes a float with exactly four decimal digits.
fn write_float(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(format!("{value:.4}").as_bytes());
}

/// Writes a JSON string literal, escaping quotes, backslashes and control
/// bytes so the output is always a valid single-line object.
fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ValueKind::classify(b'n'), ValueKind::Null);
        assert_eq!(ValueKind::classify(b't'), ValueKind::Bool);
        assert_eq!(ValueKind::classify(b'f'), ValueKind::Bool);
        assert_eq!(ValueKind::classify(b'-'), ValueKind::Number);
        assert_eq!(ValueKind::classify(b'7'), ValueKind::Number);
        assert_eq!(ValueKind::classify(b'"'), ValueKind::String);
        assert_eq!(ValueKind::classify(b'['), ValueKind::Undefined);
        assert_eq!(ValueKind::classify(b'x'), ValueKind::Undefined);
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(ValueInput::parse("null", ValueKind::Null), ValueInput::Null);
        assert_eq!(
            ValueInput::parse("true", ValueKind::Bool),
            ValueInput::Bool(true)
        );
        assert_eq!(
            ValueInput::parse("false", ValueKind::Bool),
            ValueInput::Bool(false)
        );
        assert_eq!(
            ValueInput::parse("0.8", ValueKind::Number),
            ValueInput::Number(0.8)
        );
        assert_eq!(
            ValueInput::parse("-42", ValueKind::Number),
            ValueInput::Number(-42.0)
        );
        assert_eq!(
            ValueInput::parse("\"hello\"", ValueKind::String),
            ValueInput::Text("hello".to_string())
        );
    }

    #[test]
    fn test_parse_escaped_string() {
        assert_eq!(
            ValueInput::parse(r#""a\"b\\c""#, ValueKind::String),
            ValueInput::Text(r#"a"b\c"#.to_string())
        );
    }

    #[test]
    fn test_parse_float_array() {
        assert_eq!(
            ValueInput::parse("[1,2.5,-3]", ValueKind::Undefined),
            ValueInput::Array(vec![1.0, 2.5, -3.0])
        );
        assert_eq!(
            ValueInput::parse("[ 0.1 , 0.2 ]", ValueKind::Undefined),
            ValueInput::Array(vec![0.1, 0.2])
        );
        assert_eq!(
            ValueInput::parse("[]", ValueKind::Undefined),
            ValueInput::Array(vec![])
        );
    }

    #[test]
    fn test_parse_garbage_is_undefined() {
        assert_eq!(
            ValueInput::parse("truthy", ValueKind::Bool),
            ValueInput::Undefined
        );
        assert_eq!(
            ValueInput::parse("1.2.3", ValueKind::Number),
            ValueInput::Undefined
        );
        assert_eq!(
            ValueInput::parse("[1,two]", ValueKind::Undefined),
            ValueInput::Undefined
        );
        assert_eq!(
            ValueInput::parse("{}", ValueKind::Undefined),
            ValueInput::Undefined
        );
    }

    #[test]
    fn test_key_value_serialize() {
        let msg = ResponseMessage::key_value("ahrsGain", WireValue::Float(0.5));
        assert_eq!(msg.serialize(), b"{\"ahrsGain\":0.5000}\r\n");

        let msg = ResponseMessage::key_value("udpReceivePort", WireValue::Int(9000));
        assert_eq!(msg.serialize(), b"{\"udpReceivePort\":9000}\r\n");

        let msg = ResponseMessage::key_value("deviceName", WireValue::Str("IMULink".into()));
        assert_eq!(msg.serialize(), b"{\"deviceName\":\"IMULink\"}\r\n");

        let msg = ResponseMessage::key_value(
            "gyroscopeOffset",
            WireValue::FloatArray(vec![0.0, 1.5, -2.0]),
        );
        assert_eq!(
            msg.serialize(),
            b"{\"gyroscopeOffset\":[0.0000,1.5000,-2.0000]}\r\n"
        );
    }

    #[test]
    fn test_ack_serialize() {
        assert_eq!(
            ResponseMessage::ack("save").serialize(),
            b"{\"save\":null}\r\n"
        );
    }

    #[test]
    fn test_ping_serialize() {
        let msg = ResponseMessage::Ping(PingInfo {
            interface: "UDP".into(),
            device_name: "IMULink".into(),
            serial_number: "0001-0002".into(),
        });
        assert_eq!(
            msg.serialize(),
            b"{\"ping\":{\"interface\":\"UDP\",\"deviceName\":\"IMULink\",\"serialNumber\":\"0001-0002\"}}\r\n".to_vec()
        );
    }

    #[test]
    fn test_announcement_serialize() {
        let msg = ResponseMessage::Announcement(Announcement {
            sync: 3,
            name: "IMULink".into(),
            serial_number: "0001".into(),
            ip_address: "192.168.1.2".into(),
            tcp_port: 7000,
            udp_send_port: 0,
            udp_receive_port: 9000,
            rssi: 87,
            battery: 54,
            status: 1,
        });
        assert_eq!(
            msg.serialize(),
            b"{\"sync\":3,\"name\":\"IMULink\",\"sn\":\"0001\",\"ip\":\"192.168.1.2\",\"port\":7000,\"send\":0,\"receive\":9000,\"rssi\":87,\"battery\":54,\"status\":1}\r\n".to_vec()
        );
    }

    #[test]
    fn test_string_escaping() {
        let msg = ResponseMessage::key_value("note", WireValue::Str("say \"hi\"\n".into()));
        assert_eq!(msg.serialize(), b"{\"note\":\"say \\\"hi\\\"\\n\"}\r\n");
    }

    #[test]
    fn test_inertial_golden() {
        let msg = TelemetryMessage::Inertial {
            timestamp: 12345,
            gx: 1.0,
            gy: 2.0,
            gz: 3.0,
            ax: 4.0,
            ay: 5.0,
            az: 6.0,
        };
        assert_eq!(
            msg.serialize(),
            b"I,12345,1.0000,2.0000,3.0000,4.0000,5.0000,6.0000\r\n".to_vec()
        );
    }

    #[test]
    fn test_magnetometer_and_temperature() {
        let msg = TelemetryMessage::Magnetometer {
            timestamp: 1,
            mx: -0.25,
            my: 0.5,
            mz: 0.75,
        };
        assert_eq!(msg.serialize(), b"M,1,-0.2500,0.5000,0.7500\r\n");

        let msg = TelemetryMessage::Temperature {
            timestamp: 42,
            celsius: 21.125,
        };
        assert_eq!(msg.serialize(), b"T,42,21.1250\r\n");
    }

    #[test]
    fn test_quaternion_and_euler() {
        let msg = TelemetryMessage::Quaternion {
            timestamp: 7,
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        assert_eq!(msg.serialize(), b"Q,7,1.0000,0.0000,0.0000,0.0000\r\n");

        let msg = TelemetryMessage::Euler {
            timestamp: 8,
            roll: -10.5,
            pitch: 0.0,
            yaw: 180.0,
        };
        assert_eq!(msg.serialize(), b"A,8,-10.5000,0.0000,180.0000\r\n");
    }

    #[test]
    fn test_battery_status_is_unsigned_int() {
        let msg = TelemetryMessage::Battery {
            timestamp: 9,
            percent_charged: 55.5,
            voltage: 3.7,
            status: 2,
        };
        assert_eq!(msg.serialize(), b"B,9,55.5000,3.7000,2\r\n");
    }

    #[test]
    fn test_rssi() {
        let msg = TelemetryMessage::Rssi {
            timestamp: 10,
            percentage: 80.0,
            power: -41.25,
        };
        assert_eq!(msg.serialize(), b"W,10,80.0000,-41.2500\r\n");
    }

    #[test]
    fn test_notification_and_error_are_raw_text() {
        let msg = TelemetryMessage::Notification {
            timestamp: 11,
            note: "hello device".into(),
        };
        assert_eq!(msg.serialize(), b"N,11,hello device\r\n");

        let msg = TelemetryMessage::Error {
            timestamp: 12,
            message: "Did not recognize key: frobnicate as a1e00be2".into(),
        };
        assert_eq!(
            msg.serialize(),
            b"F,12,Did not recognize key: frobnicate as a1e00be2\r\n".to_vec()
        );
    }

    #[test]
    fn test_serialize_is_stable() {
        let msg = TelemetryMessage::Inertial {
            timestamp: 99,
            gx: 0.1,
            gy: 0.2,
            gz: 0.3,
            ax: 0.4,
            ay: 0.5,
            az: 0.6,
        };
        assert_eq!(msg.serialize(), msg.serialize());
    }
}
