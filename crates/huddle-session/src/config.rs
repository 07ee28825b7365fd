//! Session configuration.

use std::time::Duration;

/// Default lifetime of a freshly issued token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300);

/// Maximum accepted token size in bytes. Anything larger is rejected
/// before it is parsed.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Configuration for token issuance.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an issued token stays valid. A token only has to survive
    /// the gap between `/create` or `/join` and the socket upgrade, so this
    /// is short.
    pub token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}
