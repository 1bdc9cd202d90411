//! In-memory [`GameApi`] double for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use totallytarian_core::protocol::{
    Ack, ApprovalVoteRequest, CreateLobbyRequest, ExecutionVoteRequest, InitiateExecutionRequest,
    JoinLobbyRequest, LobbyJoined, LobbySnapshot, NominateMinistersRequest,
    NominatePresidentRequest, PolicyVoteRequest, Role, RoleResponse, StartGameRequest,
    StatusResponse,
};

use crate::api::{ApiError, GameApi};

#[derive(Default)]
struct Inner {
    statuses: VecDeque<Result<StatusResponse, ApiError>>,
    last_status: Option<Result<StatusResponse, ApiError>>,
    status_calls: usize,
    fail_actions: bool,
    policy_reply: Option<Ack>,
    join_reply: Option<LobbyJoined>,
    role: Option<Role>,
    role_lookups: usize,
    created: Vec<CreateLobbyRequest>,
    joined: Vec<JoinLobbyRequest>,
    started: Vec<StartGameRequest>,
    presidents: Vec<NominatePresidentRequest>,
    ministers: Vec<NominateMinistersRequest>,
    approval_votes: Vec<ApprovalVoteRequest>,
    policy_votes: Vec<PolicyVoteRequest>,
    executions: Vec<InitiateExecutionRequest>,
    execution_votes: Vec<ExecutionVoteRequest>,
}

/// Scripted server. Status replies are served in order; the last one repeats.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn push_snapshot(&self, snapshot: LobbySnapshot) {
        self.push_status(Ok(StatusResponse {
            success: true,
            status: Some(snapshot),
            message: None,
        }));
    }

    pub fn push_status(&self, reply: Result<StatusResponse, ApiError>) {
        self.lock().statuses.push_back(reply);
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    /// Every action request fails at the transport level.
    pub fn fail_actions(&self) {
        self.lock().fail_actions = true;
    }

    pub fn reply_to_policy_vote(&self, reply: Ack) {
        self.lock().policy_reply = Some(reply);
    }

    pub fn reply_to_join(&self, reply: LobbyJoined) {
        self.lock().join_reply = Some(reply);
    }

    pub fn set_role(&self, role: Role) {
        self.lock().role = Some(role);
    }

    pub fn role_lookups(&self) -> usize {
        self.lock().role_lookups
    }

    pub fn created(&self) -> Vec<CreateLobbyRequest> {
        self.lock().created.clone()
    }

    pub fn joined(&self) -> Vec<JoinLobbyRequest> {
        self.lock().joined.clone()
    }

    pub fn started(&self) -> Vec<StartGameRequest> {
        self.lock().started.clone()
    }

    pub fn presidents(&self) -> Vec<NominatePresidentRequest> {
        self.lock().presidents.clone()
    }

    pub fn approval_votes(&self) -> Vec<ApprovalVoteRequest> {
        self.lock().approval_votes.clone()
    }

    pub fn minister_nominations(&self) -> Vec<NominateMinistersRequest> {
        self.lock().ministers.clone()
    }

    pub fn policy_votes(&self) -> Vec<PolicyVoteRequest> {
        self.lock().policy_votes.clone()
    }

    pub fn executions(&self) -> Vec<InitiateExecutionRequest> {
        self.lock().executions.clone()
    }

    pub fn execution_votes(&self) -> Vec<ExecutionVoteRequest> {
        self.lock().execution_votes.clone()
    }

    fn record<T>(
        &self,
        push: impl FnOnce(&mut Inner) -> &mut Vec<T>,
        req: T,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        if inner.fail_actions {
            return Err(ApiError::Network("connection refused".into()));
        }
        push(&mut *inner).push(req);
        Ok(())
    }
}

fn ok() -> Ack {
    Ack {
        success: true,
        message: None,
    }
}

impl GameApi for FakeApi {
    async fn create_lobby(&self, req: &CreateLobbyRequest) -> Result<LobbyJoined, ApiError> {
        self.record(|i| &mut i.created, req.clone())?;
        Ok(LobbyJoined {
            success: true,
            lobby_id: Some("L1".into()),
            player_id: Some("p1".into()),
            message: None,
        })
    }

    async fn join_lobby(&self, req: &JoinLobbyRequest) -> Result<LobbyJoined, ApiError> {
        self.record(|i| &mut i.joined, req.clone())?;
        let reply = self.lock().join_reply.clone();
        Ok(reply.unwrap_or(LobbyJoined {
            success: true,
            lobby_id: Some(req.lobby_id.clone()),
            player_id: Some("p2".into()),
            message: None,
        }))
    }

    async fn start_game(&self, req: &StartGameRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.started, req.clone())?;
        Ok(ok())
    }

    async fn lobby_status(&self, _lobby_id: &str) -> Result<StatusResponse, ApiError> {
        let mut inner = self.lock();
        inner.status_calls += 1;
        if let Some(next) = inner.statuses.pop_front() {
            inner.last_status = Some(next);
        }
        inner
            .last_status
            .clone()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted status".into())))
    }

    async fn nominate_president(&self, req: &NominatePresidentRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.presidents, req.clone())?;
        Ok(ok())
    }

    async fn nominate_ministers(&self, req: &NominateMinistersRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.ministers, req.clone())?;
        Ok(ok())
    }

    async fn submit_approval_vote(&self, req: &ApprovalVoteRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.approval_votes, req.clone())?;
        Ok(ok())
    }

    async fn submit_policy_vote(&self, req: &PolicyVoteRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.policy_votes, req.clone())?;
        Ok(self.lock().policy_reply.clone().unwrap_or_else(ok))
    }

    async fn initiate_execution(&self, req: &InitiateExecutionRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.executions, req.clone())?;
        Ok(ok())
    }

    async fn submit_execution_vote(&self, req: &ExecutionVoteRequest) -> Result<Ack, ApiError> {
        self.record(|i| &mut i.execution_votes, req.clone())?;
        Ok(ok())
    }

    async fn player_role(
        &self,
        _lobby_id: &str,
        _player_id: &str,
    ) -> Result<RoleResponse, ApiError> {
        let mut inner = self.lock();
        inner.role_lookups += 1;
        Ok(RoleResponse {
            success: inner.role.is_some(),
            role: inner.role,
            message: None,
        })
    }
}
