//! Core protocol types for Huddle's wire format.
//!
//! Every frame a client sends or receives is one JSON object whose `type`
//! field picks exactly one [`Message`] variant. The variants fall into two
//! families with different fan-out rules, see [`MessageFamily`].

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room.
///
/// Room ids are short opaque strings handed out by the registry. They show
/// up in HTTP paths and token claims, so they serialize as a bare string:
/// `RoomId("x7Kp2Q")` becomes `"x7Kp2Q"` in JSON.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a string as a room id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// ---------------------------------------------------------------------------
// MessageFamily — which fan-out rule applies?
// ---------------------------------------------------------------------------

/// The routing family a [`Message`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    /// Chat and presence. Broadcast to every member, the sender included,
    /// so a sender sees its own chat echoed back.
    Room,

    /// Peer negotiation (offer / answer / candidate). Broadcast to every
    /// member except the sender. In a two-party room this is exactly
    /// point-to-point.
    Relay,
}

impl fmt::Display for MessageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room => write!(f, "room"),
            Self::Relay => write!(f, "relay"),
        }
    }
}

// ---------------------------------------------------------------------------
// Message — the closed set of wire messages
// ---------------------------------------------------------------------------

/// A single wire message.
///
/// `#[serde(tag = "type", rename_all = "lowercase")]` produces internally
/// tagged JSON such as `{"type":"chat","user":"alice","content":"hi"}`.
/// A frame whose `type` names none of these variants fails to decode; there
/// is no catch-all variant, so unknown traffic is never routed.
///
/// The relay `payload` is opaque to the server: it is a session description
/// or an ICE candidate produced by the peers, and is relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// A chat line.
    Chat { user: String, content: String },

    /// Presence: `user` entered the room. Synthesized by the room on
    /// register.
    Join { user: String },

    /// Presence: `user` left the room. Synthesized by the room on
    /// unregister or eviction.
    Leave { user: String },

    /// Session description offer.
    Offer { payload: String },

    /// Session description answer.
    Answer { payload: String },

    /// ICE candidate.
    Candidate { payload: String },
}

impl Message {
    /// Builds a `join` presence message.
    pub fn join(user: impl Into<String>) -> Self {
        Self::Join { user: user.into() }
    }

    /// Builds a `leave` presence message.
    pub fn leave(user: impl Into<String>) -> Self {
        Self::Leave { user: user.into() }
    }

    /// Returns the routing family for this message.
    pub fn family(&self) -> MessageFamily {
        match self {
            Self::Chat { .. } | Self::Join { .. } | Self::Leave { .. } => {
                MessageFamily::Room
            }
            Self::Offer { .. } | Self::Answer { .. } | Self::Candidate { .. } => {
                MessageFamily::Relay
            }
        }
    }

    /// Returns the wire discriminator (`"chat"`, `"offer"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
        }
    }

    /// Classifies a raw frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` when the frame is not JSON, lacks a
    /// required field, or carries an unrecognized `type`.
    #[cfg(feature = "json")]
    pub fn classify(data: &[u8]) -> Result<Self, crate::ProtocolError> {
        use crate::Codec;
        crate::JsonCodec.decode(data)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what browser clients parse, so each test
    //! pins an exact byte layout rather than just a round trip.

    use super::*;

    fn round_trip(wire: &str) {
        let msg: Message = serde_json::from_str(wire).unwrap();
        let back = serde_json::to_string(&msg).unwrap();
        assert_eq!(back, wire);
    }

    // =====================================================================
    // RoomId
    // =====================================================================

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::new("abc123")).unwrap();
        assert_eq!(json, "\"abc123\"");
    }

    #[test]
    fn test_room_id_display_is_raw_id() {
        assert_eq!(RoomId::from("R1").to_string(), "R1");
    }

    // =====================================================================
    // Message — exact wire format of each of the six types
    // =====================================================================

    #[test]
    fn test_chat_round_trip() {
        round_trip(r#"{"type":"chat","user":"alice","content":"hi"}"#);
    }

    #[test]
    fn test_join_round_trip() {
        round_trip(r#"{"type":"join","user":"alice"}"#);
    }

    #[test]
    fn test_leave_round_trip() {
        round_trip(r#"{"type":"leave","user":"bob"}"#);
    }

    #[test]
    fn test_offer_round_trip() {
        round_trip(r#"{"type":"offer","payload":"v=0\r\no=- 46117 2 IN IP4 127.0.0.1"}"#);
    }

    #[test]
    fn test_answer_round_trip() {
        round_trip(r#"{"type":"answer","payload":"v=0"}"#);
    }

    #[test]
    fn test_candidate_round_trip() {
        round_trip(
            r#"{"type":"candidate","payload":"candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host"}"#,
        );
    }

    // =====================================================================
    // Families
    // =====================================================================

    #[test]
    fn test_room_family() {
        assert_eq!(Message::join("a").family(), MessageFamily::Room);
        assert_eq!(Message::leave("a").family(), MessageFamily::Room);
        let chat = Message::Chat {
            user: "a".into(),
            content: "b".into(),
        };
        assert_eq!(chat.family(), MessageFamily::Room);
    }

    #[test]
    fn test_relay_family() {
        for msg in [
            Message::Offer { payload: "x".into() },
            Message::Answer { payload: "x".into() },
            Message::Candidate { payload: "x".into() },
        ] {
            assert_eq!(msg.family(), MessageFamily::Relay, "{}", msg.kind());
        }
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let msg = Message::Candidate { payload: "c".into() };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
    }

    // =====================================================================
    // Classification — rejects instead of guessing
    // =====================================================================

    #[test]
    fn test_classify_accepts_known_type() {
        let msg = Message::classify(br#"{"type":"offer","payload":"sdp"}"#)
            .unwrap();
        assert_eq!(msg, Message::Offer { payload: "sdp".into() });
    }

    #[test]
    fn test_classify_rejects_unknown_type() {
        let result = Message::classify(br#"{"type":"teleport","user":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_classify_rejects_missing_type() {
        let result = Message::classify(br#"{"user":"x","content":"y"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_classify_rejects_missing_field() {
        let result = Message::classify(br#"{"type":"chat","user":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert!(Message::classify(b"not json at all").is_err());
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let result = Message::classify(br#"{"type":"Chat","user":"x","content":"y"}"#);
        assert!(result.is_err());
    }
}
