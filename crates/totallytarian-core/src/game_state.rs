use crate::protocol::{
    ApprovalVote, ExecutionChoice, LobbySnapshot, PlayerId, PolicyVote, Role, Stage,
};
use crate::screen::{self, MainPanel, RoleView, Screen};
use crate::session::SessionState;

/// Describes what changed after replacing the snapshot.
///
/// Frontends can inspect these flags to decide what to re-render. All flags
/// default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanged {
    /// The server stage changed.
    pub stage: bool,
    /// A new round (new president) began.
    pub round: bool,
    /// The roster or living set changed.
    pub players: bool,
    /// `game_over` flipped to true in this update.
    pub game_over: bool,
}

/// Per-screen input state that only lives on this client.
///
/// Flags are set after the server accepts the matching request and never
/// on rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub role_revealed: bool,
    pub selected_nominee: Option<PlayerId>,
    pub nomination_submitted: bool,
    pub selected_ministers: Vec<PlayerId>,
    pub ministers_submitted: bool,
    pub loyalty_confirmed: bool,
    pub vote_submitted: bool,
    pub approval_vote: Option<ApprovalVote>,
    pub execution_choice: Option<ExecutionChoice>,
    pub policy_submitted: bool,
    pub policy_vote: Option<PolicyVote>,
    pub execution_submitted: bool,
}

impl LocalState {
    fn reset_round(&mut self) {
        self.selected_nominee = None;
        self.nomination_submitted = false;
        self.selected_ministers.clear();
        self.ministers_submitted = false;
        self.loyalty_confirmed = false;
        self.reset_minister();
    }

    fn reset_vote(&mut self) {
        self.vote_submitted = false;
        self.approval_vote = None;
        self.execution_choice = None;
    }

    fn reset_minister(&mut self) {
        self.policy_submitted = false;
        self.policy_vote = None;
        self.execution_submitted = false;
    }
}

/// Everything the client knows: who it is, the latest server snapshot, and
/// local input state.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub session: SessionState,
    pub snapshot: LobbySnapshot,
    pub local: LocalState,
    /// Inline error from the last rejected or failed action.
    pub error: Option<String>,
    /// Recoverable polling warning; cleared by the next successful poll.
    pub poll_warning: Option<String>,
}

impl ClientState {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn screen(&self) -> Screen {
        screen::resolve_screen(&self.session, &self.snapshot)
    }

    pub fn main_panel(&self) -> MainPanel {
        screen::main_panel(&self.session, &self.snapshot)
    }

    pub fn role_view(&self) -> RoleView {
        screen::role_view(&self.session, &self.snapshot, self.local.role_revealed)
    }

    pub fn player_id(&self) -> Option<&str> {
        self.session.player_id()
    }

    /// Replace the snapshot wholesale and reset local flags that belong to a
    /// finished stage or round.
    pub fn apply_snapshot(&mut self, snapshot: LobbySnapshot) -> StateChanged {
        let previous = std::mem::replace(&mut self.snapshot, snapshot);
        let current = &self.snapshot;
        let changed = StateChanged {
            stage: previous.stage != current.stage,
            round: previous.round_number != current.round_number,
            players: previous.players != current.players
                || previous.living_players != current.living_players,
            game_over: current.game_over && !previous.game_over,
        };

        if changed.round {
            self.local.reset_round();
        }
        if changed.stage {
            self.local.reset_vote();
        }
        if let Some(me) = self.session.player_id()
            && previous.is_living(me)
            && !current.is_living(me)
        {
            self.local.reset_minister();
        }
        changed
    }

    /// Whether the host may start the game now.
    pub fn can_start_game(&self) -> bool {
        self.session.is_host() && !self.snapshot.has_started() && self.snapshot.players.len() >= 2
    }

    /// Nominee selection is open to living Thought Police during nomination
    /// and targets any living player.
    pub fn can_nominate(&self, nominee: &str) -> bool {
        self.snapshot.stage == Stage::Nominating
            && self.session.player_role() == Some(Role::ThoughtPolice)
            && self.player_id().is_some_and(|me| self.snapshot.is_living(me))
            && self.snapshot.is_living(nominee)
            && !self.local.nomination_submitted
    }

    pub fn select_nominee(&mut self, nominee: &str) -> bool {
        if !self.can_nominate(nominee) {
            return false;
        }
        self.local.selected_nominee = Some(nominee.to_string());
        true
    }

    /// Whether `candidate` may be picked as a minister by this player.
    pub fn can_pick_minister(&self, candidate: &str) -> bool {
        let Some(me) = self.player_id() else {
            return false;
        };
        self.snapshot.stage == Stage::MinisterSelection
            && self.snapshot.is_president(me)
            && !self.local.ministers_submitted
            && candidate != me
            && !self.snapshot.is_president(candidate)
            && self.snapshot.is_living(candidate)
    }

    /// Toggle a minister pick; at most two may be selected.
    pub fn toggle_minister(&mut self, candidate: &str) -> bool {
        if !self.can_pick_minister(candidate) {
            return false;
        }
        let picks = &mut self.local.selected_ministers;
        if let Some(pos) = picks.iter().position(|id| id == candidate) {
            picks.remove(pos);
            return true;
        }
        if picks.len() >= 2 {
            return false;
        }
        picks.push(candidate.to_string());
        true
    }

    /// The two picks, once exactly two are selected.
    pub fn minister_picks(&self) -> Option<[PlayerId; 2]> {
        match self.local.selected_ministers.as_slice() {
            [a, b] => Some([a.clone(), b.clone()]),
            _ => None,
        }
    }

    /// Loyalty is a local gesture for non-Thought-Police during nomination.
    pub fn confirm_loyalty(&mut self) -> bool {
        if self.main_panel() != MainPanel::ConfirmLoyalty || self.local.loyalty_confirmed {
            return false;
        }
        self.local.loyalty_confirmed = true;
        true
    }

    /// "votes cast / living players" for the active ballot.
    pub fn vote_tally(&self) -> (usize, usize) {
        (self.snapshot.votes_cast(), self.snapshot.living_players.len())
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
