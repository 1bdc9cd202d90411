//! Platform-agnostic client event loop.
//!
//! One `tokio::select!` loop serialises every [`ClientEvent`]: the periodic
//! poll schedule, the status fetch, the announcement timer and player
//! actions. The fetch lives in an owned slot so it runs alongside timers and
//! input without spawning a task; the poll schedule and the announcement
//! timer are single slots as well, so replacing one cancels the old timer.
//!
//! The loop is parameterised over an async sleep function so that native and
//! WASM frontends can share it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use totallytarian_core::announcement::TimerToken;
use totallytarian_core::protocol::StatusResponse;

use crate::api::{ApiError, GameApi};
use crate::controller::{ClientController, ClientEvent, ClientView, UserAction};
use crate::poller::PollTicket;

type Fetch = Pin<Box<dyn Future<Output = (PollTicket, Result<StatusResponse, ApiError>)>>>;

/// Run the session until the action channel closes.
///
/// Polling starts immediately. A fresh [`ClientView`] is published on `view`
/// after every event. User actions are awaited inline, so two actions never
/// overlap; the status fetch keeps running meanwhile.
pub async fn run_session<A, F, Fut>(
    ctrl: &mut ClientController<A>,
    actions: &mut UnboundedReceiver<UserAction>,
    view: &watch::Sender<ClientView>,
    sleep_ms: F,
) where
    A: GameApi,
    F: Fn(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    ctrl.start_polling();
    let mut poll_due: Option<Pin<Box<Fut>>> =
        ctrl.poller().is_running().then(|| Box::pin(sleep_ms(0)));
    let mut fetch: Option<Fetch> = None;
    let mut armed: Option<TimerToken> = None;
    let mut announce_due: Option<Pin<Box<Fut>>> = None;

    view.send_replace(ctrl.view());

    loop {
        // Keep the armed announcement timer in step with the sequencer.
        let wanted = ctrl.active_timer();
        if wanted.map(|t| t.token) != armed {
            armed = wanted.map(|t| t.token);
            announce_due = wanted.map(|t| Box::pin(sleep_ms(millis(t.delay))));
        }

        let event = tokio::select! {
            () = wait(&mut poll_due) => ClientEvent::PollDue,
            (ticket, result) = wait(&mut fetch) => ClientEvent::SnapshotReceived(ticket, result),
            () = wait(&mut announce_due) => match armed.take() {
                Some(token) => ClientEvent::TimerFired(token),
                None => continue,
            },
            action = actions.recv() => match action {
                Some(action) => ClientEvent::UserAction(action),
                None => break,
            },
        };

        match event {
            ClientEvent::PollDue => {
                poll_due = ctrl
                    .poller()
                    .is_running()
                    .then(|| Box::pin(sleep_ms(millis(ctrl.poll_interval()))));
                if let Some(ticket) = ctrl.begin_poll() {
                    let api = ctrl.api().clone();
                    fetch = Some(Box::pin(async move {
                        let result = api.lobby_status(ticket.lobby_id()).await;
                        (ticket, result)
                    }));
                }
            }
            ClientEvent::SnapshotReceived(ticket, result) => {
                let outcome = ctrl.complete_poll(ticket, result);
                if let Some(interval) = outcome.reschedule() {
                    poll_due = Some(Box::pin(sleep_ms(millis(interval))));
                }
                if !ctrl.poller().is_running() {
                    poll_due = None;
                }
                ctrl.sync_role().await;
            }
            ClientEvent::TimerFired(token) => {
                ctrl.on_timer(token);
            }
            ClientEvent::UserAction(action) => {
                let _ = ctrl.handle_action(action).await;
            }
        }

        view.send_replace(ctrl.view());
    }

    ctrl.stop_polling();
    tracing::debug!("client session ended");
}

/// Await the future in `slot` and clear it; pend forever when empty.
async fn wait<F: Future + ?Sized>(slot: &mut Option<Pin<Box<F>>>) -> F::Output {
    let Some(fut) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let output = fut.as_mut().await;
    *slot = None;
    output
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::testing::FakeApi;
    use tokio::sync::mpsc;
    use tokio::time::sleep;
    use totallytarian_core::announcement::{Announcement, Phase};
    use totallytarian_core::protocol::{LobbySnapshot, Role, Roster, Stage};
    use totallytarian_core::session::SessionState;

    fn sleep_ms(ms: u64) -> tokio::time::Sleep {
        sleep(Duration::from_millis(ms))
    }

    fn controller(api: &FakeApi) -> ClientController<FakeApi> {
        let mut session = SessionState::joined("L1", "p2", false);
        session.cache_role(Role::Proles);
        session.confirm_role();
        ClientController::new(api.clone(), session, PollConfig::default())
    }

    fn nominating() -> LobbySnapshot {
        LobbySnapshot {
            stage: Stage::Nominating,
            players: [("p1", "Alice"), ("p2", "Bob")]
                .into_iter()
                .collect::<Roster>(),
            living_players: ["p1", "p2"].map(String::from).into(),
            current_president: Some("p1".into()),
            round_number: 1,
            is_started: true,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nomination_announcement_clears_after_dwell() {
        let api = FakeApi::new();
        api.push_snapshot(nominating());
        let mut ctrl = controller(&api);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ctrl.view());

        let driver = async move {
            sleep(Duration::from_millis(10)).await;
            let shown = view_rx.borrow().clone();
            assert_eq!(
                shown.announcement,
                Some(Announcement::Nomination {
                    president_name: "Alice".into(),
                    message: None,
                })
            );

            sleep(Duration::from_millis(3_090)).await;
            let fading = view_rx.borrow().clone();
            assert_eq!(fading.announcement, None);
            assert_eq!(fading.announcement_phase, Phase::FadingOut);

            sleep(Duration::from_millis(500)).await;
            assert_eq!(view_rx.borrow().announcement_phase, Phase::Idle);
            drop(tx);
        };

        tokio::join!(run_session(&mut ctrl, &mut rx, &view_tx, sleep_ms), driver);
        // Same stage on every poll: announced once.
        assert!(api.status_calls() >= 3);
        assert_eq!(ctrl.announcements().phase(), Phase::Idle);
        assert!(!ctrl.poller().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_stretches_the_schedule() {
        let api = FakeApi::new();
        let mut ctrl = controller(&api);
        let (tx, mut rx) = mpsc::unbounded_channel::<UserAction>();
        let (view_tx, view_rx) = watch::channel(ctrl.view());
        let calls = api.clone();

        let driver = async move {
            // Failures at 0..=4 s; the fifth doubles the interval to 2 s and the
            // sixth (at 6 s) doubles it again.
            sleep(Duration::from_millis(9_000)).await;
            assert_eq!(calls.status_calls(), 6);
            assert!(view_rx.borrow().state.poll_warning.is_some());
            drop(tx);
        };

        tokio::join!(run_session(&mut ctrl, &mut rx, &view_tx, sleep_ms), driver);
        assert_eq!(ctrl.poll_interval(), Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn game_over_stops_polling_and_waits_for_close() {
        let api = FakeApi::new();
        let mut ended = nominating();
        ended.stage = Stage::Ended;
        ended.game_over = true;
        api.push_snapshot(ended);
        let mut ctrl = controller(&api);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ctrl.view());
        let calls = api.clone();

        let driver = async move {
            sleep(Duration::from_millis(20_000)).await;
            assert_eq!(calls.status_calls(), 1);
            let view = view_rx.borrow().clone();
            assert!(view.announcement.is_some_and(|a| a.requires_dismissal()));

            tx.send(UserAction::CloseAnnouncement).unwrap();
            sleep(Duration::from_millis(10)).await;
            assert_eq!(view_rx.borrow().announcement_phase, Phase::FadingOut);
            sleep(Duration::from_millis(600)).await;
            assert_eq!(view_rx.borrow().announcement_phase, Phase::Idle);
            drop(tx);
        };

        tokio::join!(run_session(&mut ctrl, &mut rx, &view_tx, sleep_ms), driver);
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn actions_are_applied_between_polls() {
        let api = FakeApi::new();
        let mut voting = nominating();
        voting.stage = Stage::Voting;
        voting.nominated_ministers = vec!["p1".into(), "p2".into()];
        api.push_snapshot(voting);
        let mut ctrl = controller(&api);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ctrl.view());

        let driver = async move {
            sleep(Duration::from_millis(10)).await;
            tx.send(UserAction::ApprovalVote(
                totallytarian_core::protocol::ApprovalVote::Suspicious,
            ))
            .unwrap();
            sleep(Duration::from_millis(10)).await;
            assert!(view_rx.borrow().state.local.vote_submitted);
            drop(tx);
        };

        tokio::join!(run_session(&mut ctrl, &mut rx, &view_tx, sleep_ms), driver);
        let votes = api.approval_votes();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].voter_id, "p2");
    }
}
