use std::fmt;

use super::events::{ConnectionProperties, IdentifyData};

/// Lifecycle state of a gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Identifying,
    Ready,
    Reconnecting,
}

impl ConnectionState {
    /// States in which a connection cycle is already under way, so `connect()`
    /// has nothing to do.
    pub fn is_active(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Identifying => "identifying",
            ConnectionState::Ready => "ready",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Token and intents used to identify. Immutable once built.
#[derive(Clone)]
pub struct SessionCredentials {
    token: String,
    intents: u64,
}

impl SessionCredentials {
    pub fn new(token: impl Into<String>, intents: u64) -> Self {
        Self {
            token: token.into(),
            intents,
        }
    }

    pub fn intents(&self) -> u64 {
        self.intents
    }

    /// Token safe for logs: the first four characters followed by an ellipsis.
    pub fn redacted_token(&self) -> String {
        let prefix: String = self.token.chars().take(4).collect();
        format!("{prefix}…")
    }

    pub fn identify_data(&self) -> IdentifyData {
        IdentifyData {
            token: self.token.clone(),
            intents: self.intents,
            properties: ConnectionProperties::default(),
        }
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("token", &self.redacted_token())
            .field("intents", &self.intents)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_full_token() {
        let creds = SessionCredentials::new("MTIzNDU2.secret-part", 1024);
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret-part"));
        assert!(debug.contains("MTIz…"));
    }

    #[test]
    fn test_identify_data_carries_token_and_intents() {
        let creds = SessionCredentials::new("tok", 513);
        let data = creds.identify_data();
        assert_eq!(data.token, "tok");
        assert_eq!(data.intents, 513);
        assert_eq!(data.properties, ConnectionProperties::default());
    }

    #[test]
    fn test_only_disconnected_is_inactive() {
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Reconnecting.is_active());
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
    }
}
