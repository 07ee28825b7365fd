//! Server configuration.
//!
//! Loaded from environment variables. The signing secret is redacted in
//! Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use huddle_room::RoomConfig;
use huddle_session::SessionConfig;
use secrecy::SecretString;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Huddle server configuration.
#[derive(Clone)]
pub struct Config {
    /// HMAC secret that signs session tokens.
    pub jwt_secret: SecretString,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// How long issued tokens stay valid (default: 300 s).
    pub token_ttl: Duration,

    /// Per-connection outbox capacity (default: 256).
    pub outbox_capacity: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("token_ttl", &self.token_ttl)
            .field("outbox_capacity", &self.outbox_capacity)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with defaults for everything but the secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        let rooms = RoomConfig::default();
        Self {
            jwt_secret: SecretString::from(jwt_secret.into()),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            token_ttl: SessionConfig::default().token_ttl,
            outbox_capacity: rooms.outbox_capacity,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let mut config = Self::new(jwt_secret.as_str());

        if let Some(addr) = vars.get("BIND_ADDRESS") {
            config.bind_address = addr.clone();
        }
        if let Some(secs) = positive::<u64>(vars, "TOKEN_TTL_SECONDS")? {
            config.token_ttl = Duration::from_secs(secs);
        }
        if let Some(cap) = positive::<usize>(vars, "OUTBOX_CAPACITY")? {
            config.outbox_capacity = cap;
        }

        Ok(config)
    }

    /// Outbox sizing for the room layer.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            outbox_capacity: self.outbox_capacity,
        }
    }

    /// Token settings for the session layer.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            token_ttl: self.token_ttl,
        }
    }
}

/// Parses an optional variable that must be a positive integer.
fn positive<T>(vars: &HashMap<String, String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(raw) = vars.get(name) else {
        return Ok(None);
    };
    let value: T = raw.parse().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("must be a positive integer, got '{raw}': {e}"),
    })?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(value))
}
