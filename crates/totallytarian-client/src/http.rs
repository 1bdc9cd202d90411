//! HTTP implementation of [`GameApi`].
//!
//! Native builds use `reqwest`; WASM builds (`web` feature) use
//! `gloo-net`'s fetch wrapper. Both read the JSON body even on a non-2xx
//! status, because the server reports rejections as `success: false` with a
//! message regardless of status code.

use serde::Serialize;
use serde::de::DeserializeOwned;
use totallytarian_core::protocol::{
    Ack, ApprovalVoteRequest, CreateLobbyRequest, ExecutionVoteRequest, InitiateExecutionRequest,
    JoinLobbyRequest, LobbyJoined, NominateMinistersRequest, NominatePresidentRequest,
    PolicyVoteRequest, RoleResponse, StartGameRequest, StatusResponse,
};

use crate::api::{ApiError, GameApi};
#[cfg(feature = "native")]
use crate::config::ClientConfig;

/// Decode a response body, preferring the JSON envelope over the status code.
fn decode<R: DeserializeOwned>(status: u16, ok: bool, body: &str) -> Result<R, ApiError> {
    match serde_json::from_str(body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !ok => Err(ApiError::Status(status)),
        Err(e) => Err(ApiError::Decode(e.to_string())),
    }
}

/// Game server client over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpApi {
    #[cfg(feature = "native")]
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "native")]
impl HttpApi {
    /// Build a client for `config.api_base_url` with its request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let url = self.url(path);
        tracing::trace!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let url = self.url(path);
        tracing::trace!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn read<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode(status.as_u16(), status.is_success(), &body)
    }
}

#[cfg(all(feature = "web", not(feature = "native")))]
impl HttpApi {
    /// Build a client for the given API base URL.
    pub fn new(api_base_url: &str) -> Self {
        Self {
            base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let response = gloo_net::http::Request::get(&self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let response = gloo_net::http::Request::post(&self.url(path))
            .json(body)
            .map_err(|e| ApiError::Decode(e.to_string()))?
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn read<R: DeserializeOwned>(response: gloo_net::http::Response) -> Result<R, ApiError> {
        let status = response.status();
        let ok = response.ok();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode(status, ok, &body)
    }
}

impl HttpApi {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl GameApi for HttpApi {
    async fn create_lobby(&self, req: &CreateLobbyRequest) -> Result<LobbyJoined, ApiError> {
        self.post("/game/create", req).await
    }

    async fn join_lobby(&self, req: &JoinLobbyRequest) -> Result<LobbyJoined, ApiError> {
        self.post("/game/join", req).await
    }

    async fn start_game(&self, req: &StartGameRequest) -> Result<Ack, ApiError> {
        self.post("/game/start", req).await
    }

    async fn lobby_status(&self, lobby_id: &str) -> Result<StatusResponse, ApiError> {
        self.get(&format!("/game/status/{lobby_id}")).await
    }

    async fn nominate_president(&self, req: &NominatePresidentRequest) -> Result<Ack, ApiError> {
        self.post("/game/nominate/president", req).await
    }

    async fn nominate_ministers(&self, req: &NominateMinistersRequest) -> Result<Ack, ApiError> {
        self.post("/game/nominate/ministers", req).await
    }

    async fn submit_approval_vote(&self, req: &ApprovalVoteRequest) -> Result<Ack, ApiError> {
        self.post("/game/vote/approval", req).await
    }

    async fn submit_policy_vote(&self, req: &PolicyVoteRequest) -> Result<Ack, ApiError> {
        self.post("/game/vote/policy", req).await
    }

    async fn initiate_execution(&self, req: &InitiateExecutionRequest) -> Result<Ack, ApiError> {
        self.post("/game/execute/initiate", req).await
    }

    async fn submit_execution_vote(&self, req: &ExecutionVoteRequest) -> Result<Ack, ApiError> {
        self.post("/game/execute/vote", req).await
    }

    async fn player_role(
        &self,
        lobby_id: &str,
        player_id: &str,
    ) -> Result<RoleResponse, ApiError> {
        self.get(&format!("/game/role/{lobby_id}/{player_id}")).await
    }
}
