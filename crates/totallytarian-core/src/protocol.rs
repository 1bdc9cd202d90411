//! Wire types for the TotallyTarian game server's HTTP/JSON API.
//!
//! The server is the sole source of truth. Every field of
//! [`LobbySnapshot`] tolerates being missing, `null` or of the wrong type so
//! that a partial snapshot sent mid-transition degrades to empty values
//! instead of failing the whole poll.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Opaque lobby identifier assigned by the server.
pub type LobbyId = String;

/// Opaque player identifier assigned by the server.
pub type PlayerId = String;

/// Upper bound of the order meter as rendered by the reference server.
pub const ORDER_METER_MAX: i64 = 300;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Server-side game stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Lobby,
    Nominating,
    MinisterSelection,
    Voting,
    Policy,
    Execution,
    Ended,
    /// A stage string this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Lobby => "Lobby",
            Stage::Nominating => "Nominating",
            Stage::MinisterSelection => "Minister Selection",
            Stage::Voting => "Voting",
            Stage::Policy => "Policy",
            Stage::Execution => "Execution",
            Stage::Ended => "Ended",
            Stage::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Secret role assigned to a player at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ThoughtPolice,
    Resistance,
    Proles,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn title(self) -> &'static str {
        match self {
            Role::ThoughtPolice => "Thought Police",
            Role::Resistance => "Resistance",
            Role::Proles => "Prole",
            Role::Unknown => "Unknown",
        }
    }

    /// Briefing shown once the role is revealed.
    pub fn description(self) -> &'static str {
        match self {
            Role::ThoughtPolice => {
                "You are a member of the Thought Police. Your mission is to maintain order and \
                 identify dissidents. Win by either reaching maximum social order or eliminating \
                 all resistance members."
            }
            Role::Resistance => {
                "You are a member of the Resistance. Appear loyal while secretly working to \
                 destabilize the regime. Win by reducing social order to minimum through careful \
                 sabotage."
            }
            Role::Proles => {
                "You are a Prole. Survive by appearing loyal to the Party. You win with the \
                 Resistance if they succeed, or survive if the Party maintains control."
            }
            Role::Unknown => "Role not assigned",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Winning faction once `game_over` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    ThoughtPolice,
    Resistance,
    #[serde(other)]
    Unknown,
}

impl Winner {
    pub fn headline(self) -> &'static str {
        match self {
            Winner::ThoughtPolice => "VICTORY FOR BIG BROTHER",
            Winner::Resistance | Winner::Unknown => "THE RESISTANCE PREVAILS",
        }
    }
}

/// Approval vote on the president's speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalVote {
    Inspiring,
    Acceptable,
    Suspicious,
}

impl ApprovalVote {
    /// Numeric value sent on the wire.
    pub fn value(self) -> i8 {
        match self {
            ApprovalVote::Inspiring => 1,
            ApprovalVote::Acceptable => 0,
            ApprovalVote::Suspicious => -1,
        }
    }
}

impl Serialize for ApprovalVote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

/// A minister's secret policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyVote {
    Support,
    Sabotage,
}

/// Choice offered on the execution ballot. Only [`ExecutionChoice::Execute`]
/// is sent as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionChoice {
    Execute,
    Abstain,
    Spare,
}

impl ExecutionChoice {
    pub fn as_vote(self) -> bool {
        matches!(self, ExecutionChoice::Execute)
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Player id → display name, kept in join order.
///
/// JSON objects are decoded in document order, which the server emits in the
/// order players joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster(Vec<(PlayerId, String)>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or rename a player, keeping the original join position.
    pub fn insert(&mut self, id: impl Into<PlayerId>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = name,
            None => self.0.push((id, name)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, name)| name.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

impl<I: Into<PlayerId>, N: Into<String>> FromIterator<(I, N)> for Roster {
    fn from_iter<T: IntoIterator<Item = (I, N)>>(iter: T) -> Self {
        let mut roster = Roster::new();
        for (id, name) in iter {
            roster.insert(id, name);
        }
        roster
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, name)| (id, name)))
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = Roster;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of player ids to display names")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Roster, E> {
                Ok(Roster::new())
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Roster, M::Error> {
                let mut roster = Roster::new();
                while let Some((id, name)) = map.next_entry::<PlayerId, Option<String>>()? {
                    roster.insert(id, name.unwrap_or_default());
                }
                Ok(roster)
            }
        }

        deserializer.deserialize_any(RosterVisitor)
    }
}

// ---------------------------------------------------------------------------
// Lobby snapshot
// ---------------------------------------------------------------------------

/// Decode through [`Value`] so that `null` or a value of the wrong shape
/// falls back to the default instead of failing the snapshot.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Id collections keep their string entries and drop everything else.
fn lenient_ids<'de, D, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: FromIterator<PlayerId> + Default,
{
    let ids = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
        _ => C::default(),
    };
    Ok(ids)
}

/// The meter is an integer, but floats are truncated and numeric strings
/// are accepted.
fn lenient_meter<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let meter = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    Ok(meter.unwrap_or_default())
}

/// Full lobby status as returned by `GET /game/status/{lobby_id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySnapshot {
    #[serde(deserialize_with = "lenient")]
    pub stage: Stage,
    #[serde(deserialize_with = "lenient")]
    pub players: Roster,
    #[serde(deserialize_with = "lenient_ids")]
    pub living_players: BTreeSet<PlayerId>,
    #[serde(deserialize_with = "lenient")]
    pub current_president: Option<PlayerId>,
    #[serde(deserialize_with = "lenient_ids")]
    pub nominated_ministers: Vec<PlayerId>,
    #[serde(deserialize_with = "lenient")]
    pub execution_accuser: Option<PlayerId>,
    #[serde(deserialize_with = "lenient")]
    pub execution_target: Option<PlayerId>,
    #[serde(deserialize_with = "lenient")]
    pub policy_votes: BTreeMap<PlayerId, Value>,
    #[serde(rename = "votes", alias = "approval_votes", deserialize_with = "lenient")]
    pub approval_votes: BTreeMap<PlayerId, Value>,
    #[serde(deserialize_with = "lenient")]
    pub execution_votes: BTreeMap<PlayerId, Value>,
    #[serde(deserialize_with = "lenient_meter")]
    pub order_meter: i64,
    #[serde(deserialize_with = "lenient")]
    pub game_over: bool,
    #[serde(deserialize_with = "lenient")]
    pub winner: Option<Winner>,
    #[serde(deserialize_with = "lenient")]
    pub round_number: u64,
    #[serde(deserialize_with = "lenient")]
    pub host: Option<PlayerId>,
    #[serde(deserialize_with = "lenient")]
    pub is_started: bool,
}

impl LobbySnapshot {
    /// Display name for `id`, or an empty string when the roster has no entry.
    pub fn player_name(&self, id: &str) -> String {
        self.players.get(id).unwrap_or_default().to_string()
    }

    /// Display name for an optional id (president, accuser, target).
    pub fn name_of(&self, id: Option<&str>) -> String {
        id.map(|id| self.player_name(id)).unwrap_or_default()
    }

    pub fn is_living(&self, id: &str) -> bool {
        self.living_players.contains(id)
    }

    pub fn is_nominated_minister(&self, id: &str) -> bool {
        self.nominated_ministers.iter().any(|m| m == id)
    }

    /// Presidency is decided solely by `current_president` equality.
    pub fn is_president(&self, id: &str) -> bool {
        self.current_president_id() == Some(id)
    }

    pub fn current_president_id(&self) -> Option<&str> {
        non_empty(self.current_president.as_deref())
    }

    pub fn execution_accuser_id(&self) -> Option<&str> {
        non_empty(self.execution_accuser.as_deref())
    }

    pub fn execution_target_id(&self) -> Option<&str> {
        non_empty(self.execution_target.as_deref())
    }

    pub fn is_host(&self, id: &str) -> bool {
        non_empty(self.host.as_deref()) == Some(id)
    }

    /// Whether the game has left the lobby, by flag or by stage.
    pub fn has_started(&self) -> bool {
        self.is_started || !matches!(self.stage, Stage::Lobby)
    }

    /// Minister display names joined with " and ".
    pub fn minister_names(&self) -> String {
        self.nominated_ministers
            .iter()
            .map(|id| self.player_name(id))
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// The nominated minister other than `id`, if any.
    pub fn fellow_minister(&self, id: &str) -> Option<&str> {
        self.nominated_ministers
            .iter()
            .map(String::as_str)
            .find(|m| *m != id && !m.is_empty())
    }

    /// Ballots cast in the current vote (execution ballots during the
    /// execution stage, approval ballots otherwise).
    pub fn votes_cast(&self) -> usize {
        match self.stage {
            Stage::Execution => self.execution_votes.len(),
            _ => self.approval_votes.len(),
        }
    }

    pub fn policy_decisions(&self) -> usize {
        self.policy_votes.len()
    }

    /// Order meter position as a percentage of [`ORDER_METER_MAX`].
    pub fn order_meter_percent(&self) -> f64 {
        let clamped = self.order_meter.clamp(0, ORDER_METER_MAX);
        clamped as f64 / ORDER_METER_MAX as f64 * 100.0
    }
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreateLobbyRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinLobbyRequest {
    pub lobby_id: LobbyId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartGameRequest {
    pub lobby_id: LobbyId,
    pub host_id: PlayerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct NominatePresidentRequest {
    pub lobby_id: LobbyId,
    pub nominee_id: PlayerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct NominateMinistersRequest {
    pub lobby_id: LobbyId,
    pub president_id: PlayerId,
    pub nominee_ids: [PlayerId; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalVoteRequest {
    pub lobby_id: LobbyId,
    pub voter_id: PlayerId,
    pub vote: ApprovalVote,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyVoteRequest {
    pub lobby_id: LobbyId,
    pub minister_id: PlayerId,
    pub vote: PolicyVote,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiateExecutionRequest {
    pub lobby_id: LobbyId,
    pub accuser_id: PlayerId,
    pub accused_id: PlayerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionVoteRequest {
    pub lobby_id: LobbyId,
    pub voter_id: PlayerId,
    pub vote: bool,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Common shape of every server reply: a `success` flag and an optional
/// human-readable `message`.
pub trait Envelope {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;

    /// The message to show for a rejected request, falling back to
    /// `fallback` when the server sent none. `None` on success.
    fn rejection(&self, fallback: &str) -> Option<String> {
        if self.success() {
            return None;
        }
        Some(
            self.message()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(fallback)
                .to_string(),
        )
    }
}

macro_rules! envelope {
    ($($ty:ty),+ $(,)?) => {
        $(impl Envelope for $ty {
            fn success(&self) -> bool {
                self.success
            }

            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        })+
    };
}

/// Reply carrying nothing but the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ack {
    pub success: bool,
    pub message: Option<String>,
}

/// Reply to create/join lobby.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyJoined {
    pub success: bool,
    pub lobby_id: Option<LobbyId>,
    pub player_id: Option<PlayerId>,
    pub message: Option<String>,
}

/// Reply to a status poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub success: bool,
    pub status: Option<LobbySnapshot>,
    pub message: Option<String>,
}

/// Reply to a role lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleResponse {
    pub success: bool,
    pub role: Option<Role>,
    pub message: Option<String>,
}

envelope!(Ack, LobbyJoined, StatusResponse, RoleResponse);

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Rejected local input, caught before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Username is required")]
    MissingUsername,
    #[error("Both username and lobby ID are required")]
    MissingJoinFields,
}

pub fn validate_username(username: &str) -> Result<&str, InputError> {
    match username.trim() {
        "" => Err(InputError::MissingUsername),
        trimmed => Ok(trimmed),
    }
}

pub fn validate_join(lobby_id: &str, username: &str) -> Result<(), InputError> {
    if lobby_id.trim().is_empty() || username.trim().is_empty() {
        return Err(InputError::MissingJoinFields);
    }
    Ok(())
}
