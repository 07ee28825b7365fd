//! HTTP handlers: room creation, join tickets, and the WebSocket endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        ws::{WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use huddle_protocol::RoomId;
use huddle_room::{ClientConnection, RoomHandle};
use huddle_transport::WebSocketConnection;
use serde::{Deserialize, Serialize};

use crate::HuddleError;
use crate::routes::AppState;

/// A room id and a token admitting its bearer to that room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTicket {
    pub room: RoomId,
    pub token: String,
}

/// Query parameters of `GET /ws`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    pub username: Option<String>,
}

/// Handler for `POST /create`.
///
/// Creates a room and returns a ticket for it.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RoomTicket>, HuddleError> {
    let room = state.registry.create_room().await?;
    let ticket = state.ticket(room.room_id())?;
    tracing::debug!(room_id = %room.room_id(), "create ticket issued");
    Ok(Json(ticket))
}

/// Handler for `GET /join/:room`.
///
/// Returns a fresh ticket for an existing room; 404 otherwise, with no
/// token issued.
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomTicket>, HuddleError> {
    let room = state.registry.get(&room_id).await?;
    let ticket = state.ticket(room.room_id())?;
    tracing::debug!(%room_id, "join ticket issued");
    Ok(Json(ticket))
}

/// Handler for `GET /ws?token=..&username=..`.
///
/// The token is checked and its room resolved before the upgrade, so a
/// rejected client gets a plain HTTP error and never reaches a room.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, HuddleError> {
    let room_id = state.tokens.verify(params.token.as_deref().unwrap_or_default())?;
    let room = state.registry.get(&room_id).await?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let display_name = params.username.unwrap_or_default();
    let outbox_capacity = state.registry.config().outbox_capacity;
    Ok(upgrade.on_upgrade(move |socket| serve_socket(socket, room, display_name, outbox_capacity)))
}

async fn serve_socket(
    socket: WebSocket,
    room: RoomHandle,
    display_name: String,
    outbox_capacity: usize,
) {
    let client = ClientConnection::new(WebSocketConnection::new(socket), display_name, room);
    match client.start(outbox_capacity).await {
        Ok(tasks) => tasks.join().await,
        Err(e) => tracing::warn!(error = %e, "could not admit connection"),
    }
}
