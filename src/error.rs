use std::fmt;

use tokio_tungstenite::tungstenite;

#[derive(Debug)]
pub enum GatewayError {
    /// No socket is open, so the frame could not be written.
    NotConnected,
    Transport(tungstenite::Error),
    Decode(serde_json::Error),
    Config(String),
    /// The connection driver has exited and no longer accepts commands.
    Shutdown,
}

impl GatewayError {
    /// The socket itself is broken and the connection recovers by cycling it.
    /// Everything else is reported to the caller and leaves the socket alone.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NotConnected => write!(f, "gateway socket is not open"),
            GatewayError::Transport(e) => write!(f, "transport error: {e}"),
            GatewayError::Decode(e) => write!(f, "malformed gateway frame: {e}"),
            GatewayError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            GatewayError::Shutdown => write!(f, "gateway connection has shut down"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Transport(e) => Some(e),
            GatewayError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tungstenite::Error> for GatewayError {
    fn from(e: tungstenite::Error) -> Self {
        GatewayError::Transport(e)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e)
    }
}
