//! Issuing and verifying room-scoped tokens.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use huddle_protocol::RoomId;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{MAX_TOKEN_SIZE_BYTES, SessionConfig, SessionError};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClaims {
    /// The room this token admits its bearer to.
    pub room: RoomId,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

/// Signs and verifies session tokens with a process-wide HMAC secret.
///
/// Created once at startup and shared by every request handler; it holds
/// no mutable state.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Creates a service that signs with `secret`.
    pub fn new(secret: &SecretString, config: SessionConfig) -> Self {
        let key = secret.expose_secret().as_bytes();

        // Only HS256 is accepted, `exp` must be present, and expiry is
        // exact (no leeway).
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl: config.token_ttl,
        }
    }

    /// Returns how long issued tokens stay valid.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `room`, valid from now for the configured TTL.
    ///
    /// # Errors
    /// Returns [`SessionError::Signing`] if the token cannot be signed.
    pub fn issue(&self, room: &RoomId) -> Result<String, SessionError> {
        self.issue_at(room, Utc::now())
    }

    /// Issues a token for `room` as if it were minted at `issued_at`.
    ///
    /// # Errors
    /// Returns [`SessionError::Signing`] if the token cannot be signed.
    pub fn issue_at(
        &self,
        room: &RoomId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let iat = issued_at.timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = RoomClaims {
            room: room.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)?;
        tracing::debug!(room_id = %room, exp = claims.exp, "session token issued");
        Ok(token)
    }

    /// Verifies `token` and returns the room it is bound to.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidToken`] if the token is oversized,
    /// malformed, signed with another key or algorithm, expired, or lacks
    /// the `room` claim.
    pub fn verify(&self, token: &str) -> Result<RoomId, SessionError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(size = token.len(), "token rejected: oversized");
            return Err(SessionError::InvalidToken);
        }

        let data = decode::<RoomClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                SessionError::InvalidToken
            })?;

        Ok(data.claims.room)
    }

    /// Verifies `token` and checks that it is bound to `room`.
    ///
    /// # Errors
    /// Everything [`verify`](Self::verify) returns, plus
    /// [`SessionError::RoomMismatch`] when the token names another room.
    pub fn verify_for(
        &self,
        token: &str,
        room: &RoomId,
    ) -> Result<(), SessionError> {
        let bound = self.verify(token)?;
        if &bound != room {
            return Err(SessionError::RoomMismatch {
                bound,
                requested: room.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}
