use std::time::Duration;

use crate::error::GatewayError;
use crate::gateway::heartbeat::DEFAULT_MAX_MISSED_ACKS;
use crate::gateway::intents;
use crate::gateway::session::SessionCredentials;
use crate::gateway::{GatewaySettings, DEFAULT_API_VERSION, DEFAULT_GATEWAY_URL};

pub const DEFAULT_INTENTS: u64 = intents::GUILD_MESSAGE_REACTIONS;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: SessionCredentials,
    pub gateway: GatewaySettings,
}

impl Config {
    /// Read configuration from the process environment. Call
    /// [`load_env_file`] first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, GatewayError> {
        let token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GatewayError::Config("DISCORD_TOKEN is required".to_string()))?;

        let intents = match std::env::var("DISCORD_INTENTS") {
            Ok(value) if !value.trim().is_empty() => intents::parse(&value)?,
            _ => DEFAULT_INTENTS,
        };

        let gateway = GatewaySettings {
            url: std::env::var("DISCORD_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            api_version: std::env::var("DISCORD_GATEWAY_VERSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_API_VERSION),
            reconnect_delay: Duration::from_millis(
                std::env::var("DISCORD_RECONNECT_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
            ),
            max_missed_acks: std::env::var("DISCORD_MAX_MISSED_ACKS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_MISSED_ACKS),
        };

        Ok(Self {
            credentials: SessionCredentials::new(token, intents),
            gateway,
        })
    }
}

/// Load variables from `path`, or from `./.env` when no path is given.
/// A missing default file is not an error; a missing explicit file is.
pub fn load_env_file(path: Option<&std::path::Path>) -> Result<(), GatewayError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map_err(|e| GatewayError::Config(format!("failed to load {}: {e}", path.display()))),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("DISCORD_TOKEN");
        std::env::remove_var("DISCORD_INTENTS");
        std::env::remove_var("DISCORD_GATEWAY_URL");
        std::env::remove_var("DISCORD_GATEWAY_VERSION");
        std::env::remove_var("DISCORD_RECONNECT_DELAY_MS");
        std::env::remove_var("DISCORD_MAX_MISSED_ACKS");
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc.def");
        let config = Config::from_env().unwrap();
        assert_eq!(config.credentials.intents(), intents::GUILD_MESSAGE_REACTIONS);
        assert_eq!(config.gateway.url, "wss://gateway.discord.gg");
        assert_eq!(config.gateway.api_version, 10);
        assert_eq!(config.gateway.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.gateway.max_missed_acks, 2);
    }

    #[test]
    #[serial]
    fn test_missing_token_is_an_error() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN is required"));
    }

    #[test]
    #[serial]
    fn test_blank_token_is_an_error() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "   ");
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_intents_from_names() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc");
        std::env::set_var("DISCORD_INTENTS", "GUILDS,GUILD_MESSAGES");
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.credentials.intents(),
            intents::GUILDS | intents::GUILD_MESSAGES
        );
    }

    #[test]
    #[serial]
    fn test_intents_from_bitmask() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc");
        std::env::set_var("DISCORD_INTENTS", "33281");
        let config = Config::from_env().unwrap();
        assert_eq!(config.credentials.intents(), 33281);
    }

    #[test]
    #[serial]
    fn test_unknown_intent_is_an_error() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc");
        std::env::set_var("DISCORD_INTENTS", "GUILDS,EVERYTHING");
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_gateway_overrides() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc");
        std::env::set_var("DISCORD_GATEWAY_URL", "ws://127.0.0.1:9000");
        std::env::set_var("DISCORD_GATEWAY_VERSION", "9");
        std::env::set_var("DISCORD_RECONNECT_DELAY_MS", "250");
        std::env::set_var("DISCORD_MAX_MISSED_ACKS", "4");
        let config = Config::from_env().unwrap();
        assert_eq!(config.gateway.url, "ws://127.0.0.1:9000");
        assert_eq!(config.gateway.api_version, 9);
        assert_eq!(config.gateway.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.gateway.max_missed_acks, 4);
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("DISCORD_TOKEN", "abc");
        std::env::set_var("DISCORD_GATEWAY_VERSION", "ten");
        std::env::set_var("DISCORD_RECONNECT_DELAY_MS", "-1");
        let config = Config::from_env().unwrap();
        assert_eq!(config.gateway.api_version, 10);
        assert_eq!(config.gateway.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let path = std::path::Path::new("/nonexistent/cordlink.env");
        assert!(load_env_file(Some(path)).is_err());
    }
}
