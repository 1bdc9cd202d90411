//! Game server API abstraction.
//!
//! Decouples the poller and controller from any specific HTTP stack.
//! [`HttpApi`](crate::http::HttpApi) talks to the real server; tests plug in
//! an in-memory double.
//!
//! Every method resolves to `Err(ApiError)` only for transport-level
//! failures. A reply with `success: false` is still `Ok` and carries its
//! message in the response envelope.

use std::future::Future;

use thiserror::Error;
use totallytarian_core::protocol::{
    Ack, ApprovalVoteRequest, CreateLobbyRequest, ExecutionVoteRequest, InitiateExecutionRequest,
    InputError, JoinLobbyRequest, LobbyJoined, NominateMinistersRequest, NominatePresidentRequest,
    PolicyVoteRequest, RoleResponse, StartGameRequest, StatusResponse,
};

/// Transport-level failure talking to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status and no readable body.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Why a user action did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Caught locally before any request was sent.
    #[error(transparent)]
    Invalid(#[from] InputError),

    /// The action is not available on the current screen.
    #[error("{0}")]
    Unavailable(&'static str),

    /// The server answered `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    /// The inline text to show for this error. Network failures collapse to
    /// the per-action `fallback`; everything else is shown verbatim.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ActionError::Api(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

/// The game server's request/reply operations.
///
/// Futures are not required to be `Send`: the client runs on a single
/// cooperative task, which also lets the WASM implementation satisfy the
/// trait.
pub trait GameApi: Clone + 'static {
    fn create_lobby(
        &self,
        req: &CreateLobbyRequest,
    ) -> impl Future<Output = Result<LobbyJoined, ApiError>>;

    fn join_lobby(
        &self,
        req: &JoinLobbyRequest,
    ) -> impl Future<Output = Result<LobbyJoined, ApiError>>;

    fn start_game(&self, req: &StartGameRequest) -> impl Future<Output = Result<Ack, ApiError>>;

    fn lobby_status(&self, lobby_id: &str)
    -> impl Future<Output = Result<StatusResponse, ApiError>>;

    fn nominate_president(
        &self,
        req: &NominatePresidentRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn nominate_ministers(
        &self,
        req: &NominateMinistersRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn submit_approval_vote(
        &self,
        req: &ApprovalVoteRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn submit_policy_vote(
        &self,
        req: &PolicyVoteRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn initiate_execution(
        &self,
        req: &InitiateExecutionRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn submit_execution_vote(
        &self,
        req: &ExecutionVoteRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>>;

    fn player_role(
        &self,
        lobby_id: &str,
        player_id: &str,
    ) -> impl Future<Output = Result<RoleResponse, ApiError>>;
}
