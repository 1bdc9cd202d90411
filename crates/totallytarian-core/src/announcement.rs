//! Announcement sequencing.
//!
//! Turns stage *transitions* across consecutive snapshots into time-boxed
//! announcements, one at a time. The sequencer owns no clock: every state
//! entry that needs a timer publishes a [`TimerRequest`] through
//! [`AnnouncementSequencer::active_timer`], and the runtime calls
//! [`AnnouncementSequencer::on_timer`] with the token when it fires. Each new
//! request supersedes the previous one, and stale tokens are ignored, so an
//! old dismiss timer can never clear a newer announcement.
//!
//! ```text
//!   Idle ──observe/show──▶ Showing ──dwell or close──▶ FadingOut ──500 ms──▶ Idle
//!                            ▲  │                          │
//!                            └──┘ replace                  └─ pending? ─▶ Showing
//! ```

use std::time::Duration;

use crate::protocol::{LobbySnapshot, Stage, Winner};

/// Dwell time for announcements triggered by a stage change.
pub const STAGE_ANNOUNCEMENT_DWELL: Duration = Duration::from_millis(3_000);

/// Dwell time for announcements shown through [`AnnouncementSequencer::show`].
pub const DEFAULT_ANNOUNCEMENT_DWELL: Duration = Duration::from_millis(5_000);

/// Fade-out between dismissal and clearing the record.
pub const FADE_OUT: Duration = Duration::from_millis(500);

/// A single full-screen announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// A president was nominated, is picking ministers, or faces the vote.
    Nomination {
        president_name: String,
        message: Option<String>,
    },
    /// The ministers were approved and policy voting begins.
    VoteResultApproved { message: String },
    /// A minister accused someone of thoughtcrime.
    ExecutionCall {
        accuser_name: String,
        accused_name: String,
    },
    /// The game ended. Stays up until closed.
    GameEnd {
        winner: Option<Winner>,
        message: String,
    },
}

impl Announcement {
    /// Build the announcement for entering `snapshot.stage`, if that stage has
    /// one and the snapshot carries the fields it needs.
    pub fn for_stage(snapshot: &LobbySnapshot) -> Option<Self> {
        let president_name = snapshot.name_of(snapshot.current_president_id());
        match snapshot.stage {
            Stage::Nominating => {
                snapshot.current_president_id()?;
                Some(Announcement::Nomination {
                    president_name,
                    message: None,
                })
            }
            Stage::MinisterSelection => Some(Announcement::Nomination {
                message: Some(format!("{president_name} is selecting ministers.")),
                president_name,
            }),
            Stage::Voting => Some(Announcement::Nomination {
                president_name,
                message: Some(format!("Vote on ministers {}.", snapshot.minister_names())),
            }),
            Stage::Policy => Some(Announcement::VoteResultApproved {
                message: "Ministers approved. Policy voting begins.".to_string(),
            }),
            Stage::Execution => {
                let accuser = snapshot.execution_accuser_id()?;
                let accused = snapshot.execution_target_id()?;
                Some(Announcement::ExecutionCall {
                    accuser_name: snapshot.player_name(accuser),
                    accused_name: snapshot.player_name(accused),
                })
            }
            Stage::Lobby | Stage::Ended | Stage::Unknown => None,
        }
    }

    /// End-of-game announcement for a finished snapshot.
    pub fn game_end(snapshot: &LobbySnapshot) -> Self {
        let message = match snapshot.winner {
            Some(Winner::ThoughtPolice) => "The Party has crushed all dissent.",
            Some(Winner::Resistance) => "Social order has collapsed.",
            Some(Winner::Unknown) | None => "The game is over.",
        };
        Announcement::GameEnd {
            winner: snapshot.winner,
            message: message.to_string(),
        }
    }

    /// Only the end-of-game announcement waits for the player to close it.
    pub fn requires_dismissal(&self) -> bool {
        matches!(self, Announcement::GameEnd { .. })
    }

    pub fn title(&self) -> &'static str {
        match self {
            Announcement::Nomination { .. } => "Presidential Nomination",
            Announcement::VoteResultApproved { .. } => "Ministers Approved",
            Announcement::ExecutionCall { .. } => "EXECUTION PROPOSED",
            Announcement::GameEnd { winner, .. } => {
                winner.unwrap_or(Winner::Unknown).headline()
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Announcement::Nomination {
                president_name,
                message: None,
            } => format!("Comrade {president_name} has been nominated as President"),
            Announcement::Nomination {
                message: Some(message),
                ..
            }
            | Announcement::VoteResultApproved { message }
            | Announcement::GameEnd { message, .. } => message.clone(),
            Announcement::ExecutionCall {
                accuser_name,
                accused_name,
            } => format!("Minister {accuser_name} has accused {accused_name} of thoughtcrime!"),
        }
    }
}

/// Identifies one timer request. Only the most recent token is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A timer the runtime should arm: call `on_timer(token)` after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub token: TimerToken,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Showing,
    /// Dismissed; the record is still present until the fade completes.
    FadingOut,
}

#[derive(Debug, Clone)]
pub struct AnnouncementSequencer {
    current: Option<Announcement>,
    pending: Option<(Announcement, Option<Duration>)>,
    last_announced_stage: Option<Stage>,
    phase: Phase,
    generation: u64,
    timer: Option<TimerRequest>,
}

impl Default for AnnouncementSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementSequencer {
    pub fn new() -> Self {
        Self {
            current: None,
            pending: None,
            last_announced_stage: None,
            phase: Phase::Idle,
            generation: 0,
            timer: None,
        }
    }

    pub fn current(&self) -> Option<&Announcement> {
        self.current.as_ref()
    }

    /// The announcement while it is fully visible (not fading out).
    pub fn visible(&self) -> Option<&Announcement> {
        match self.phase {
            Phase::Showing => self.current.as_ref(),
            Phase::Idle | Phase::FadingOut => None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_announced_stage(&self) -> Option<Stage> {
        self.last_announced_stage
    }

    /// The timer the runtime should currently have armed, if any.
    pub fn active_timer(&self) -> Option<TimerRequest> {
        self.timer
    }

    /// Feed the latest snapshot. Returns `true` when a new announcement was
    /// accepted (shown now, or queued behind a fade-out).
    ///
    /// An unchanged stage is a no-op. A changed stage without a recognised
    /// announcement (or missing the fields it needs) is left unrecorded, so a
    /// later snapshot of the same stage that fills the gap still announces.
    pub fn observe(&mut self, snapshot: &LobbySnapshot) -> bool {
        if self.last_announced_stage == Some(snapshot.stage) {
            return false;
        }
        let Some(announcement) = Announcement::for_stage(snapshot) else {
            return false;
        };
        self.last_announced_stage = Some(snapshot.stage);
        self.present(announcement, Some(STAGE_ANNOUNCEMENT_DWELL));
        true
    }

    /// Generic display path: 5 s dwell unless the announcement needs an
    /// explicit close.
    pub fn show(&mut self, announcement: Announcement) {
        let dwell = (!announcement.requires_dismissal()).then_some(DEFAULT_ANNOUNCEMENT_DWELL);
        self.present(announcement, dwell);
    }

    /// Close the end-of-game announcement. Other announcements dismiss
    /// themselves and ignore this.
    pub fn close(&mut self) -> bool {
        let closable = self.phase == Phase::Showing
            && self.current.as_ref().is_some_and(Announcement::requires_dismissal);
        if closable {
            self.begin_fade();
        }
        closable
    }

    /// Handle a fired timer. Returns `false` for superseded tokens.
    pub fn on_timer(&mut self, token: TimerToken) -> bool {
        if self.timer.map(|t| t.token) != Some(token) {
            return false;
        }
        self.timer = None;
        match self.phase {
            Phase::Showing => self.begin_fade(),
            Phase::FadingOut => {
                self.current = None;
                self.phase = Phase::Idle;
                if let Some((announcement, dwell)) = self.pending.take() {
                    self.present(announcement, dwell);
                }
            }
            Phase::Idle => {}
        }
        true
    }

    fn present(&mut self, announcement: Announcement, dwell: Option<Duration>) {
        if self.phase == Phase::FadingOut {
            self.pending = Some((announcement, dwell));
            return;
        }
        self.current = Some(announcement);
        self.phase = Phase::Showing;
        self.arm(dwell);
    }

    fn begin_fade(&mut self) {
        self.phase = Phase::FadingOut;
        self.arm(Some(FADE_OUT));
    }

    fn arm(&mut self, delay: Option<Duration>) {
        self.generation += 1;
        self.timer = delay.map(|delay| TimerRequest {
            token: TimerToken(self.generation),
            delay,
        });
    }
}
