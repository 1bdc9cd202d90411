//! Screen selection.
//!
//! [`resolve_screen`] is a pure function of the session and the latest
//! snapshot, re-evaluated after every snapshot update. Rules are checked top
//! to bottom and the first match wins:
//!
//! | # | Condition                                              | Screen     |
//! |---|--------------------------------------------------------|------------|
//! | 1 | no lobby bound                                         | `start`    |
//! | 2 | `game_over`                                            | `end`      |
//! | 3 | role not yet acknowledged                              | `role`     |
//! | 4 | stage `execution`, player alive                        | `vote`     |
//! | 5 | stage `policy`, player nominated minister and alive    | `minister` |
//! | 6 | stage `voting`, player alive                           | `vote`     |
//! | 7 | otherwise                                              | `main`     |
//!
//! The main screen's own panel choice ([`main_panel`]) and the role screen's
//! sub-state ([`role_view`]) use the same [`LobbySnapshot`] predicates, so the
//! two layers cannot disagree about who is alive, nominated, or president.

use std::fmt;

use crate::protocol::{LobbySnapshot, Role, Stage};
use crate::session::SessionState;

/// Which ballot the vote screen is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteKind {
    /// Approval of the president's speech and nominated ministers.
    Approval,
    /// Whether the accused should be executed.
    Execution,
}

/// The single active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Start,
    End,
    Role,
    Vote(VoteKind),
    Minister,
    Main,
}

impl Screen {
    pub fn name(self) -> &'static str {
        match self {
            Screen::Start => "start",
            Screen::End => "end",
            Screen::Role => "role",
            Screen::Vote(_) => "vote",
            Screen::Minister => "minister",
            Screen::Main => "main",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Vote(VoteKind::Execution) => f.write_str("vote (execution)"),
            Screen::Vote(VoteKind::Approval) => f.write_str("vote (approval)"),
            other => f.write_str(other.name()),
        }
    }
}

/// Select exactly one screen for this player.
pub fn resolve_screen(session: &SessionState, snapshot: &LobbySnapshot) -> Screen {
    let Some(player_id) = session.player_id() else {
        return Screen::Start;
    };
    if snapshot.game_over {
        return Screen::End;
    }
    if !session.has_confirmed_role() {
        return Screen::Role;
    }
    action_screen(player_id, snapshot).unwrap_or(Screen::Main)
}

/// The action screen a living player owes input on, if any.
///
/// Living-player membership is checked first, so an eliminated player who is
/// still listed as a minister (a contradictory snapshot) gets `None`.
fn action_screen(player_id: &str, snapshot: &LobbySnapshot) -> Option<Screen> {
    if !snapshot.is_living(player_id) {
        return None;
    }
    match snapshot.stage {
        Stage::Execution => Some(Screen::Vote(VoteKind::Execution)),
        Stage::Policy if snapshot.is_nominated_minister(player_id) => Some(Screen::Minister),
        Stage::Voting => Some(Screen::Vote(VoteKind::Approval)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Main screen
// ---------------------------------------------------------------------------

/// What the main screen shows below the order meter and player grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainPanel {
    /// Eliminated player watching the game.
    Spectator,
    /// Thought Police pick the next president.
    NominatePresident,
    /// Everyone else affirms their loyalty while the nomination happens.
    ConfirmLoyalty,
    /// The president picks two ministers.
    SelectMinisters,
    /// Nothing to do but watch the board.
    Board,
}

pub fn main_panel(session: &SessionState, snapshot: &LobbySnapshot) -> MainPanel {
    let Some(player_id) = session.player_id() else {
        return MainPanel::Board;
    };
    if snapshot.has_started() && !snapshot.is_living(player_id) {
        return MainPanel::Spectator;
    }
    match (snapshot.stage, session.player_role()) {
        (Stage::Nominating, Some(Role::ThoughtPolice)) => MainPanel::NominatePresident,
        (Stage::Nominating, Some(_)) => MainPanel::ConfirmLoyalty,
        (Stage::MinisterSelection, _) if snapshot.is_president(player_id) => {
            MainPanel::SelectMinisters
        }
        _ => MainPanel::Board,
    }
}

// ---------------------------------------------------------------------------
// Role screen
// ---------------------------------------------------------------------------

/// Sub-state of the role screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleView {
    /// Lobby still open: roster and, for the host, the start button.
    WaitingForStart,
    /// Game started; the role card is face down.
    Hidden,
    Revealed(Role),
}

pub fn role_view(session: &SessionState, snapshot: &LobbySnapshot, revealed: bool) -> RoleView {
    if !snapshot.has_started() {
        return RoleView::WaitingForStart;
    }
    match (revealed, session.player_role()) {
        (true, Some(role)) => RoleView::Revealed(role),
        _ => RoleView::Hidden,
    }
}
