use serde::{Deserialize, Serialize};

/// Gateway operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Dispatch,
    Heartbeat,
    Identify,
    Reconnect,
    InvalidSession,
    Hello,
    HeartbeatAck,
}

impl Opcode {
    pub fn code(self) -> u64 {
        match self {
            Opcode::Dispatch => 0,
            Opcode::Heartbeat => 1,
            Opcode::Identify => 2,
            Opcode::Reconnect => 7,
            Opcode::InvalidSession => 9,
            Opcode::Hello => 10,
            Opcode::HeartbeatAck => 11,
        }
    }

    /// `None` for codes this client does not handle.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Opcode::Dispatch),
            1 => Some(Opcode::Heartbeat),
            2 => Some(Opcode::Identify),
            7 => Some(Opcode::Reconnect),
            9 => Some(Opcode::InvalidSession),
            10 => Some(Opcode::Hello),
            11 => Some(Opcode::HeartbeatAck),
            _ => None,
        }
    }
}

/// Gateway message envelope.
///
/// `s` and `t` are always serialized (as `null` when absent) to match the
/// wire shape the gateway itself uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u64,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayMessage {
    pub fn new(op: Opcode, d: serde_json::Value) -> Self {
        Self {
            op: op.code(),
            d,
            s: None,
            t: None,
        }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_code(self.op)
    }

    /// Heartbeat frame carrying the last seen sequence number, or `null`.
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(Opcode::Heartbeat, serde_json::json!(last_sequence))
    }

    pub fn identify(data: &IdentifyData) -> Self {
        // IdentifyData only holds strings and integers, so this cannot fail.
        let d = serde_json::to_value(data).unwrap_or_default();
        Self::new(Opcode::Identify, d)
    }
}

/// HELLO payload data.
#[derive(Debug, Deserialize)]
pub struct HelloData {
    pub heartbeat_interval: u64,
}

/// IDENTIFY payload data.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyData {
    pub token: String,
    pub intents: u64,
    pub properties: ConnectionProperties,
}

/// Fixed client descriptor sent with every IDENTIFY.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// A decoded dispatch (op 0) as handed to event handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub sequence: Option<u64>,
}
