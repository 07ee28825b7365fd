//! HTTP routes for Huddle.
//!
//! Defines the Axum router and application state.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use huddle_protocol::RoomId;
use huddle_room::RoomRegistry;
use huddle_session::TokenService;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, RoomTicket};
use crate::{Config, HuddleError};

/// Application state shared across all handlers.
#[derive(Debug)]
pub struct AppState {
    /// Every room in this process.
    pub registry: RoomRegistry,

    /// Issues and checks room tokens.
    pub tokens: TokenService,
}

impl AppState {
    /// Builds fresh state from `config`: an empty registry and a token
    /// service keyed by the configured secret.
    pub fn new(config: &Config) -> Self {
        Self {
            registry: RoomRegistry::new(config.room_config()),
            tokens: TokenService::new(&config.jwt_secret, config.session_config()),
        }
    }

    /// Mints a ticket for `room`.
    pub(crate) fn ticket(&self, room: &RoomId) -> Result<RoomTicket, HuddleError> {
        Ok(RoomTicket {
            room: room.clone(),
            token: self.tokens.issue(room)?,
        })
    }
}

/// Build the application routes.
///
/// - `POST /create` - create a room, returns a ticket
/// - `GET /join/:room` - ticket for an existing room
/// - `GET /ws` - WebSocket endpoint, gated by a ticket's token
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create", post(handlers::create_room))
        .route("/join/:room", get(handlers::join_room))
        .route("/ws", get(handlers::connect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
