//! Creating and joining a lobby.

use totallytarian_core::protocol::{
    CreateLobbyRequest, Envelope, JoinLobbyRequest, LobbyJoined, validate_join, validate_username,
};
use totallytarian_core::session::SessionState;

use crate::api::{ActionError, GameApi};

pub const CREATE_FAILED: &str = "Failed to create lobby";
pub const JOIN_FAILED: &str = "Failed to join lobby";

/// Create a lobby and bind the session as its host.
pub async fn create_lobby<A: GameApi>(
    api: &A,
    username: &str,
) -> Result<SessionState, ActionError> {
    let username = validate_username(username)?;
    let reply = api
        .create_lobby(&CreateLobbyRequest {
            username: username.to_string(),
        })
        .await?;
    let session = bind(reply, CREATE_FAILED, true)?;
    tracing::info!(lobby = ?session.lobby_id(), "lobby created");
    Ok(session)
}

/// Join an existing lobby as a regular player.
pub async fn join_lobby<A: GameApi>(
    api: &A,
    lobby_id: &str,
    username: &str,
) -> Result<SessionState, ActionError> {
    validate_join(lobby_id, username)?;
    let reply = api
        .join_lobby(&JoinLobbyRequest {
            lobby_id: lobby_id.trim().to_string(),
            username: username.trim().to_string(),
        })
        .await?;
    let session = bind(reply, JOIN_FAILED, false)?;
    tracing::info!(lobby = ?session.lobby_id(), "lobby joined");
    Ok(session)
}

fn bind(reply: LobbyJoined, fallback: &str, is_host: bool) -> Result<SessionState, ActionError> {
    if let Some(message) = reply.rejection(fallback) {
        return Err(ActionError::Rejected(message));
    }
    match (reply.lobby_id, reply.player_id) {
        (Some(lobby_id), Some(player_id)) => Ok(SessionState::joined(lobby_id, player_id, is_host)),
        _ => Err(ActionError::Rejected(fallback.to_string())),
    }
}
