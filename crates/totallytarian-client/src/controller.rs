//! Framework-agnostic client controller.
//!
//! Owns a [`GameApi`], the [`ClientState`], the [`Poller`] and the
//! [`AnnouncementSequencer`], and is the single mutation gateway for all of
//! them:
//!
//! - Poll results are fed back through [`ClientController::complete_poll`],
//!   which replaces the snapshot before anything is recomputed from it.
//! - Player input goes through [`ClientController::handle_action`], which
//!   calls the server and only flips local flags on acceptance.
//! - Announcement timers are armed by the caller from
//!   [`ClientController::active_timer`] and fed back through
//!   [`ClientController::on_timer`].
//!
//! Frontends drive it from one event loop; see [`crate::runtime`].

use std::time::Duration;

use totallytarian_core::announcement::{
    Announcement, AnnouncementSequencer, Phase, TimerRequest, TimerToken,
};
use totallytarian_core::game_state::{ClientState, StateChanged};
use totallytarian_core::protocol::{
    ApprovalVote, ApprovalVoteRequest, Envelope, ExecutionChoice, ExecutionVoteRequest,
    InitiateExecutionRequest, LobbyId, LobbySnapshot, NominateMinistersRequest,
    NominatePresidentRequest, PlayerId, PolicyVote, PolicyVoteRequest, Role, StartGameRequest,
    StatusResponse,
};
use totallytarian_core::screen::{MainPanel, RoleView, Screen, VoteKind};
use totallytarian_core::session::SessionState;

use crate::api::{ActionError, ApiError, GameApi};
use crate::config::PollConfig;
use crate::poller::{POLL_FAILURE_MESSAGE, PollOutcome, PollTicket, Poller};

/// Shown when the role lookup is rejected.
pub const ROLE_FETCH_FAILED: &str = "Failed to fetch role";

/// Everything the event loop reacts to, in arrival order.
#[derive(Debug)]
pub enum ClientEvent {
    /// The periodic poll schedule fired.
    PollDue,
    /// A status fetch finished.
    SnapshotReceived(PollTicket, Result<StatusResponse, ApiError>),
    /// An announcement timer fired.
    TimerFired(TimerToken),
    UserAction(UserAction),
}

/// Player input, independent of how the frontend collects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    StartGame,
    RevealRole,
    ConfirmRole,
    SelectNominee(PlayerId),
    NominatePresident,
    ToggleMinister(PlayerId),
    SubmitMinisters,
    ConfirmLoyalty,
    ApprovalVote(ApprovalVote),
    ExecutionVote(ExecutionChoice),
    PolicyVote(PolicyVote),
    /// Accuse the fellow minister of thoughtcrime.
    CallExecution,
    CloseAnnouncement,
}

impl UserAction {
    /// Inline message used when the request fails without a server message.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            UserAction::StartGame => "Failed to start game",
            UserAction::NominatePresident => "Failed to submit nomination",
            UserAction::SubmitMinisters => "Failed to submit minister nominations",
            UserAction::ApprovalVote(_) | UserAction::ExecutionVote(_) => "Failed to submit vote",
            UserAction::PolicyVote(_) => "Failed to submit policy vote",
            UserAction::CallExecution => "Failed to initiate execution",
            UserAction::RevealRole
            | UserAction::ConfirmRole
            | UserAction::SelectNominee(_)
            | UserAction::ToggleMinister(_)
            | UserAction::ConfirmLoyalty
            | UserAction::CloseAnnouncement => "Action not available",
        }
    }
}

/// Outcome of feeding one poll result into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// A snapshot was applied; the flags describe what changed.
    Updated {
        changed: StateChanged,
        reschedule: Option<Duration>,
    },
    /// The fetch failed and a warning is shown.
    Failed { reschedule: Option<Duration> },
    /// A late response for a stopped poller.
    Discarded,
}

impl PollResult {
    /// New periodic interval, if the schedule must be replaced.
    pub fn reschedule(&self) -> Option<Duration> {
        match self {
            PollResult::Updated { reschedule, .. } | PollResult::Failed { reschedule } => {
                *reschedule
            }
            PollResult::Discarded => None,
        }
    }
}

/// What a frontend renders. Cheap to clone and publish after every event.
#[derive(Debug, Clone)]
pub struct ClientView {
    pub screen: Screen,
    pub main_panel: MainPanel,
    pub role_view: RoleView,
    pub state: ClientState,
    /// The fully visible announcement, if any.
    pub announcement: Option<Announcement>,
    pub announcement_phase: Phase,
}

pub struct ClientController<A: GameApi> {
    api: A,
    pub state: ClientState,
    poller: Poller,
    announcements: AnnouncementSequencer,
    role_rejected: bool,
}

impl<A: GameApi> ClientController<A> {
    pub fn new(api: A, session: SessionState, poll: PollConfig) -> Self {
        Self {
            api,
            state: ClientState::new(session),
            poller: Poller::new(poll),
            announcements: AnnouncementSequencer::new(),
            role_rejected: false,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn announcements(&self) -> &AnnouncementSequencer {
        &self.announcements
    }

    pub fn view(&self) -> ClientView {
        ClientView {
            screen: self.state.screen(),
            main_panel: self.state.main_panel(),
            role_view: self.state.role_view(),
            state: self.state.clone(),
            announcement: self.announcements.visible().cloned(),
            announcement_phase: self.announcements.phase(),
        }
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Start polling the bound lobby. `false` if nothing changed.
    pub fn start_polling(&mut self) -> bool {
        self.poller.start(self.state.session.lobby_id())
    }

    pub fn stop_polling(&mut self) {
        self.poller.stop();
    }

    pub fn poll_interval(&self) -> Duration {
        self.poller.interval()
    }

    /// Reserve the fetch slot for a due poll.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        self.poller.begin_tick()
    }

    /// Feed a finished fetch back in.
    pub fn complete_poll(
        &mut self,
        ticket: PollTicket,
        result: Result<StatusResponse, ApiError>,
    ) -> PollResult {
        match self.poller.complete(ticket, result) {
            PollOutcome::Applied {
                snapshot,
                reschedule,
            } => PollResult::Updated {
                changed: self.apply_snapshot(snapshot),
                reschedule,
            },
            PollOutcome::Failed { reschedule, .. } => {
                self.state.poll_warning = Some(POLL_FAILURE_MESSAGE.to_string());
                PollResult::Failed { reschedule }
            }
            PollOutcome::Discarded => PollResult::Discarded,
        }
    }

    /// One complete poll: fetch, apply, and sync the role.
    pub async fn poll_once(&mut self) -> Option<PollResult> {
        let ticket = self.begin_poll()?;
        let result = self.api.lobby_status(ticket.lobby_id()).await;
        let outcome = self.complete_poll(ticket, result);
        self.sync_role().await;
        Some(outcome)
    }

    fn apply_snapshot(&mut self, snapshot: LobbySnapshot) -> StateChanged {
        let changed = self.state.apply_snapshot(snapshot);
        self.state.poll_warning = None;
        let snapshot = &self.state.snapshot;
        if changed.stage {
            tracing::debug!(
                stage = %snapshot.stage,
                round = snapshot.round_number,
                "stage changed"
            );
        }
        if self.announcements.observe(snapshot) {
            tracing::debug!(stage = %snapshot.stage, "stage announcement queued");
        }
        if changed.game_over {
            self.announcements.show(Announcement::game_end(snapshot));
        }
        changed
    }

    // ------------------------------------------------------------------
    // Role
    // ------------------------------------------------------------------

    /// Whether the role should be fetched now.
    pub fn needs_role(&self) -> bool {
        self.state.session.membership().is_some()
            && self.state.session.player_role().is_none()
            && self.state.snapshot.has_started()
            && !self.role_rejected
    }

    /// Fetch and cache the role once the game has started. A network failure
    /// is retried on the next call; a rejection is reported and not retried.
    pub async fn sync_role(&mut self) -> Option<Role> {
        if !self.needs_role() {
            return self.state.session.player_role();
        }
        let (lobby_id, player_id) = self.member_ids().ok()?;
        match self.api.player_role(&lobby_id, &player_id).await {
            Ok(reply) => match reply.role {
                Some(role) if reply.success() => {
                    tracing::debug!(%role, "role fetched");
                    self.state.session.cache_role(role);
                }
                _ => {
                    tracing::info!(message = ?reply.message, "role lookup rejected");
                    self.role_rejected = true;
                    self.state.set_error(ROLE_FETCH_FAILED);
                }
            },
            Err(err) => tracing::warn!(%err, "role lookup failed, will retry"),
        }
        self.state.session.player_role()
    }

    // ------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------

    /// The timer the runtime should have armed.
    pub fn active_timer(&self) -> Option<TimerRequest> {
        self.announcements.active_timer()
    }

    pub fn on_timer(&mut self, token: TimerToken) -> bool {
        self.announcements.on_timer(token)
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Run an action and record its outcome as the inline error.
    pub async fn handle_action(&mut self, action: UserAction) -> Result<(), ActionError> {
        let fallback = action.fallback_message();
        let result = self.perform(action).await;
        match &result {
            Ok(()) => self.state.clear_error(),
            Err(err) => {
                tracing::info!(%err, "action not accepted");
                self.state.set_error(err.user_message(fallback));
            }
        }
        result
    }

    async fn perform(&mut self, action: UserAction) -> Result<(), ActionError> {
        match action {
            UserAction::StartGame => self.start_game().await,
            UserAction::RevealRole => self.reveal_role(),
            UserAction::ConfirmRole => self.confirm_role(),
            UserAction::SelectNominee(nominee) => {
                if !self.state.select_nominee(&nominee) {
                    return Err(ActionError::Unavailable("That player cannot be nominated"));
                }
                Ok(())
            }
            UserAction::NominatePresident => self.nominate_president().await,
            UserAction::ToggleMinister(candidate) => {
                if !self.state.toggle_minister(&candidate) {
                    return Err(ActionError::Unavailable("That player cannot be selected"));
                }
                Ok(())
            }
            UserAction::SubmitMinisters => self.submit_ministers().await,
            UserAction::ConfirmLoyalty => {
                if !self.state.confirm_loyalty() {
                    return Err(ActionError::Unavailable("Nothing to confirm"));
                }
                Ok(())
            }
            UserAction::ApprovalVote(vote) => self.approval_vote(vote).await,
            UserAction::ExecutionVote(choice) => self.execution_vote(choice).await,
            UserAction::PolicyVote(vote) => self.policy_vote(vote).await,
            UserAction::CallExecution => self.call_execution().await,
            UserAction::CloseAnnouncement => {
                if !self.announcements.close() {
                    return Err(ActionError::Unavailable("No announcement to close"));
                }
                Ok(())
            }
        }
    }

    async fn start_game(&mut self) -> Result<(), ActionError> {
        if !self.state.can_start_game() {
            return Err(ActionError::Unavailable(
                "Only the host can start the game, with at least two players",
            ));
        }
        let (lobby_id, host_id) = self.member_ids()?;
        let reply = self
            .api
            .start_game(&StartGameRequest { lobby_id, host_id })
            .await?;
        accepted(&reply, "Failed to start game")
    }

    fn reveal_role(&mut self) -> Result<(), ActionError> {
        if self.state.role_view() != RoleView::Hidden || self.state.session.player_role().is_none()
        {
            return Err(ActionError::Unavailable("Role is not available yet"));
        }
        self.state.local.role_revealed = true;
        Ok(())
    }

    fn confirm_role(&mut self) -> Result<(), ActionError> {
        if !matches!(self.state.role_view(), RoleView::Revealed(_)) {
            return Err(ActionError::Unavailable("Reveal your role first"));
        }
        self.state.session.confirm_role();
        Ok(())
    }

    async fn nominate_president(&mut self) -> Result<(), ActionError> {
        if self.state.main_panel() != MainPanel::NominatePresident
            || self.state.local.nomination_submitted
        {
            return Err(ActionError::Unavailable("Nomination is not open"));
        }
        let nominee_id = self
            .state
            .local
            .selected_nominee
            .clone()
            .ok_or(ActionError::Unavailable("Select a nominee first"))?;
        let (lobby_id, _) = self.member_ids()?;
        let reply = self
            .api
            .nominate_president(&NominatePresidentRequest {
                lobby_id,
                nominee_id,
            })
            .await?;
        accepted(&reply, "Failed to submit nomination")?;
        self.state.local.nomination_submitted = true;
        Ok(())
    }

    async fn submit_ministers(&mut self) -> Result<(), ActionError> {
        if self.state.main_panel() != MainPanel::SelectMinisters
            || self.state.local.ministers_submitted
        {
            return Err(ActionError::Unavailable("Minister selection is not open"));
        }
        let nominee_ids = self
            .state
            .minister_picks()
            .ok_or(ActionError::Unavailable("Select exactly two ministers"))?;
        let (lobby_id, president_id) = self.member_ids()?;
        let reply = self
            .api
            .nominate_ministers(&NominateMinistersRequest {
                lobby_id,
                president_id,
                nominee_ids,
            })
            .await?;
        accepted(&reply, "Failed to submit minister nominations")?;
        self.state.local.ministers_submitted = true;
        Ok(())
    }

    async fn approval_vote(&mut self, vote: ApprovalVote) -> Result<(), ActionError> {
        self.require_open_ballot(VoteKind::Approval)?;
        let (lobby_id, voter_id) = self.member_ids()?;
        let reply = self
            .api
            .submit_approval_vote(&ApprovalVoteRequest {
                lobby_id,
                voter_id,
                vote,
            })
            .await?;
        accepted(&reply, "Failed to submit vote")?;
        self.state.local.vote_submitted = true;
        self.state.local.approval_vote = Some(vote);
        Ok(())
    }

    async fn execution_vote(&mut self, choice: ExecutionChoice) -> Result<(), ActionError> {
        self.require_open_ballot(VoteKind::Execution)?;
        let (lobby_id, voter_id) = self.member_ids()?;
        let reply = self
            .api
            .submit_execution_vote(&ExecutionVoteRequest {
                lobby_id,
                voter_id,
                vote: choice.as_vote(),
            })
            .await?;
        accepted(&reply, "Failed to submit vote")?;
        self.state.local.vote_submitted = true;
        self.state.local.execution_choice = Some(choice);
        Ok(())
    }

    async fn policy_vote(&mut self, vote: PolicyVote) -> Result<(), ActionError> {
        if self.state.screen() != Screen::Minister || self.state.local.policy_submitted {
            return Err(ActionError::Unavailable("Policy voting is not open"));
        }
        let (lobby_id, minister_id) = self.member_ids()?;
        let reply = self
            .api
            .submit_policy_vote(&PolicyVoteRequest {
                lobby_id,
                minister_id,
                vote,
            })
            .await?;
        accepted(&reply, "Failed to submit policy vote")?;
        self.state.local.policy_submitted = true;
        self.state.local.policy_vote = Some(vote);
        Ok(())
    }

    async fn call_execution(&mut self) -> Result<(), ActionError> {
        if self.state.screen() != Screen::Minister || self.state.local.execution_submitted {
            return Err(ActionError::Unavailable("Execution cannot be called now"));
        }
        let (lobby_id, accuser_id) = self.member_ids()?;
        let accused_id = self
            .state
            .snapshot
            .fellow_minister(&accuser_id)
            .map(str::to_string)
            .ok_or(ActionError::Unavailable("There is no other minister to accuse"))?;
        let reply = self
            .api
            .initiate_execution(&InitiateExecutionRequest {
                lobby_id,
                accuser_id,
                accused_id,
            })
            .await?;
        accepted(&reply, "Failed to initiate execution")?;
        self.state.local.execution_submitted = true;
        Ok(())
    }

    fn require_open_ballot(&self, kind: VoteKind) -> Result<(), ActionError> {
        if self.state.screen() != Screen::Vote(kind) || self.state.local.vote_submitted {
            return Err(ActionError::Unavailable("Voting is not open"));
        }
        Ok(())
    }

    fn member_ids(&self) -> Result<(LobbyId, PlayerId), ActionError> {
        self.state
            .session
            .membership()
            .map(|m| (m.lobby_id.clone(), m.player_id.clone()))
            .ok_or(ActionError::Unavailable("Not in a lobby"))
    }
}

fn accepted(reply: &impl Envelope, fallback: &str) -> Result<(), ActionError> {
    match reply.rejection(fallback) {
        Some(message) => Err(ActionError::Rejected(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use totallytarian_core::protocol::{Ack, Roster, Stage};
    use tokio_test::block_on;

    fn snapshot(stage: Stage) -> LobbySnapshot {
        LobbySnapshot {
            stage,
            players: [("p1", "Alice"), ("p2", "Bob"), ("p3", "Carol")]
                .into_iter()
                .collect::<Roster>(),
            living_players: ["p1", "p2", "p3"].map(String::from).into(),
            current_president: Some("p1".into()),
            nominated_ministers: vec!["p2".into(), "p3".into()],
            round_number: 1,
            is_started: true,
            ..Default::default()
        }
    }

    fn controller(api: &FakeApi, player: &str) -> ClientController<FakeApi> {
        let mut session = SessionState::joined("L1", player, player == "p1");
        session.cache_role(Role::Resistance);
        session.confirm_role();
        let mut ctrl = ClientController::new(api.clone(), session, PollConfig::default());
        assert!(ctrl.start_polling());
        ctrl
    }

    fn deliver(ctrl: &mut ClientController<FakeApi>, snapshot: LobbySnapshot) -> PollResult {
        let ticket = ctrl.begin_poll().unwrap();
        ctrl.complete_poll(
            ticket,
            Ok(StatusResponse {
                success: true,
                status: Some(snapshot),
                message: None,
            }),
        )
    }

    #[test]
    fn rejected_policy_vote_keeps_flag_unset() {
        let api = FakeApi::new();
        api.reply_to_policy_vote(Ack {
            success: false,
            message: Some("already voted".into()),
        });
        let mut ctrl = controller(&api, "p2");
        deliver(&mut ctrl, snapshot(Stage::Policy));
        assert_eq!(ctrl.state.screen(), Screen::Minister);

        let err = block_on(ctrl.handle_action(UserAction::PolicyVote(PolicyVote::Support)));
        assert_eq!(err, Err(ActionError::Rejected("already voted".into())));
        assert!(!ctrl.state.local.policy_submitted);
        assert_eq!(ctrl.state.error.as_deref(), Some("already voted"));
    }

    #[test]
    fn accepted_policy_vote_sets_flag() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        deliver(&mut ctrl, snapshot(Stage::Policy));
        block_on(ctrl.handle_action(UserAction::PolicyVote(PolicyVote::Sabotage))).unwrap();
        assert!(ctrl.state.local.policy_submitted);
        assert_eq!(ctrl.state.local.policy_vote, Some(PolicyVote::Sabotage));
        assert_eq!(ctrl.state.error, None);

        let sent = api.policy_votes();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].minister_id, "p2");
    }

    #[test]
    fn network_failure_shows_fallback() {
        let api = FakeApi::new();
        api.fail_actions();
        let mut ctrl = controller(&api, "p2");
        deliver(&mut ctrl, snapshot(Stage::Voting));
        let vote = UserAction::ApprovalVote(ApprovalVote::Inspiring);
        let result = block_on(ctrl.handle_action(vote));
        assert!(matches!(result, Err(ActionError::Api(_))));
        assert_eq!(ctrl.state.error.as_deref(), Some("Failed to submit vote"));
        assert!(!ctrl.state.local.vote_submitted);
    }

    #[test]
    fn votes_need_the_matching_screen() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        deliver(&mut ctrl, snapshot(Stage::Voting));
        let vote = UserAction::ExecutionVote(ExecutionChoice::Execute);
        let result = block_on(ctrl.handle_action(vote));
        assert!(matches!(result, Err(ActionError::Unavailable(_))));
        assert!(api.execution_votes().is_empty());
    }

    #[test]
    fn minister_accuses_the_other_minister() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        deliver(&mut ctrl, snapshot(Stage::Policy));
        block_on(ctrl.handle_action(UserAction::CallExecution)).unwrap();
        let calls = api.executions();
        assert_eq!(calls[0].accuser_id, "p2");
        assert_eq!(calls[0].accused_id, "p3");
        assert!(ctrl.state.local.execution_submitted);
    }

    #[test]
    fn snapshot_replaced_before_announcement() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        let mut nominating = snapshot(Stage::Nominating);
        nominating.nominated_ministers.clear();
        let result = deliver(&mut ctrl, nominating);
        assert!(matches!(result, PollResult::Updated { changed, .. } if changed.stage));

        let view = ctrl.view();
        assert_eq!(
            view.announcement,
            Some(Announcement::Nomination {
                president_name: "Alice".into(),
                message: None,
            })
        );
        assert_eq!(ctrl.active_timer().map(|t| t.delay), Some(Duration::from_secs(3)));
    }

    #[test]
    fn poll_failure_sets_warning_until_success() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        let ticket = ctrl.begin_poll().unwrap();
        let result = ctrl.complete_poll(ticket, Err(ApiError::Status(500)));
        assert_eq!(result, PollResult::Failed { reschedule: None });
        assert_eq!(ctrl.state.poll_warning.as_deref(), Some(POLL_FAILURE_MESSAGE));

        deliver(&mut ctrl, snapshot(Stage::Voting));
        assert_eq!(ctrl.state.poll_warning, None);
    }

    #[test]
    fn game_over_shows_end_announcement() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p2");
        let mut ended = snapshot(Stage::Ended);
        ended.game_over = true;
        deliver(&mut ctrl, ended);

        assert_eq!(ctrl.state.screen(), Screen::End);
        assert!(ctrl.poller().is_terminated());
        let shown = ctrl.view().announcement.unwrap();
        assert!(shown.requires_dismissal());
        assert_eq!(ctrl.active_timer(), None);

        block_on(ctrl.handle_action(UserAction::CloseAnnouncement)).unwrap();
        assert_eq!(ctrl.view().announcement, None);
    }

    #[test]
    fn role_is_fetched_once_started() {
        let api = FakeApi::new();
        api.set_role(Role::ThoughtPolice);
        let session = SessionState::joined("L1", "p2", false);
        let mut ctrl = ClientController::new(api.clone(), session, PollConfig::default());
        ctrl.start_polling();

        let mut lobby = snapshot(Stage::Lobby);
        lobby.is_started = false;
        deliver(&mut ctrl, lobby);
        assert!(!ctrl.needs_role());
        assert_eq!(ctrl.state.role_view(), RoleView::WaitingForStart);

        deliver(&mut ctrl, snapshot(Stage::Nominating));
        assert_eq!(block_on(ctrl.sync_role()), Some(Role::ThoughtPolice));
        assert_eq!(block_on(ctrl.sync_role()), Some(Role::ThoughtPolice));
        assert_eq!(api.role_lookups(), 1);

        block_on(ctrl.handle_action(UserAction::RevealRole)).unwrap();
        block_on(ctrl.handle_action(UserAction::ConfirmRole)).unwrap();
        assert!(ctrl.state.session.has_confirmed_role());
        assert_eq!(ctrl.state.main_panel(), MainPanel::NominatePresident);
    }

    #[test]
    fn poll_once_applies_snapshot_then_fetches_role() {
        let api = FakeApi::new();
        api.set_role(Role::ThoughtPolice);
        api.push_snapshot(snapshot(Stage::Nominating));
        let session = SessionState::joined("L1", "p2", false);
        let mut ctrl = ClientController::new(api.clone(), session, PollConfig::default());
        assert_eq!(block_on(ctrl.poll_once()), None);
        assert_eq!(api.status_calls(), 0);

        ctrl.start_polling();
        let result = block_on(ctrl.poll_once());
        assert!(matches!(result, Some(PollResult::Updated { changed, .. }) if changed.stage));
        assert_eq!(ctrl.state.snapshot.stage, Stage::Nominating);
        assert_eq!(ctrl.state.session.player_role(), Some(Role::ThoughtPolice));
        assert_eq!(api.status_calls(), 1);
        assert_eq!(api.role_lookups(), 1);
    }

    #[test]
    fn only_the_host_starts_the_game() {
        let api = FakeApi::new();
        let mut lobby = snapshot(Stage::Lobby);
        lobby.is_started = false;

        let mut guest = controller(&api, "p2");
        deliver(&mut guest, lobby.clone());
        let refused = block_on(guest.handle_action(UserAction::StartGame));
        assert!(matches!(refused, Err(ActionError::Unavailable(_))));
        assert!(api.started().is_empty());

        let mut host = controller(&api, "p1");
        deliver(&mut host, lobby);
        block_on(host.handle_action(UserAction::StartGame)).unwrap();
        let sent = api.started();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].lobby_id, "L1");
        assert_eq!(sent[0].host_id, "p1");
    }

    #[test]
    fn thought_police_nominate_a_living_player() {
        let api = FakeApi::new();
        let mut session = SessionState::joined("L1", "p2", false);
        session.cache_role(Role::ThoughtPolice);
        session.confirm_role();
        let mut ctrl = ClientController::new(api.clone(), session, PollConfig::default());
        ctrl.start_polling();
        let mut nominating = snapshot(Stage::Nominating);
        nominating.living_players.remove("p3");
        deliver(&mut ctrl, nominating);

        let dead = block_on(ctrl.handle_action(UserAction::SelectNominee("p3".into())));
        assert!(matches!(dead, Err(ActionError::Unavailable(_))));
        block_on(ctrl.handle_action(UserAction::SelectNominee("p1".into()))).unwrap();
        block_on(ctrl.handle_action(UserAction::NominatePresident)).unwrap();

        assert!(ctrl.state.local.nomination_submitted);
        let sent = api.presidents();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].nominee_id, "p1");
    }

    #[test]
    fn rejected_role_lookup_is_reported() {
        let api = FakeApi::new();
        let session = SessionState::joined("L1", "p2", false);
        let mut ctrl = ClientController::new(api.clone(), session, PollConfig::default());
        ctrl.start_polling();
        deliver(&mut ctrl, snapshot(Stage::Nominating));

        assert_eq!(block_on(ctrl.sync_role()), None);
        assert_eq!(ctrl.state.error.as_deref(), Some(ROLE_FETCH_FAILED));
        assert!(!ctrl.needs_role());
    }

    #[test]
    fn president_submits_two_ministers() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api, "p1");
        let mut selecting = snapshot(Stage::MinisterSelection);
        selecting.nominated_ministers.clear();
        deliver(&mut ctrl, selecting);

        let early = block_on(ctrl.handle_action(UserAction::SubmitMinisters));
        assert_eq!(
            early,
            Err(ActionError::Unavailable("Select exactly two ministers"))
        );
        block_on(ctrl.handle_action(UserAction::ToggleMinister("p2".into()))).unwrap();
        block_on(ctrl.handle_action(UserAction::ToggleMinister("p3".into()))).unwrap();
        block_on(ctrl.handle_action(UserAction::SubmitMinisters)).unwrap();

        assert!(ctrl.state.local.ministers_submitted);
        assert_eq!(
            api.minister_nominations()[0].nominee_ids,
            ["p2".to_string(), "p3".to_string()]
        );
    }
}
