//! Lobby status poller.
//!
//! Owns all polling state: the backoff interval, the consecutive error count,
//! and the in-flight flag. It performs no scheduling itself; the runtime
//! arms a timer at [`Poller::interval`] and replaces it whenever an outcome
//! carries a `reschedule`.
//!
//! A fetch is split into [`Poller::begin_tick`], which reserves the single
//! in-flight slot and hands out a [`PollTicket`], and [`Poller::complete`],
//! which consumes the ticket. Tickets carry the poller's epoch, so a response
//! that lands after [`Poller::stop`] is discarded instead of reviving polling.
//! The slot itself stays taken until the outstanding ticket comes back, even
//! across a stop and restart, so there is never more than one fetch out.

use std::time::Duration;

use totallytarian_core::protocol::{Envelope, LobbyId, LobbySnapshot, StatusResponse};

use crate::api::{ApiError, GameApi};
use crate::config::PollConfig;

/// Warning surfaced to the UI while polls are failing.
pub const POLL_FAILURE_MESSAGE: &str = "Failed to fetch lobby status";

/// Backoff bookkeeping. Resets on any successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub consecutive_errors: u32,
    pub interval: Duration,
    pub in_flight: bool,
}

/// Permission to run one fetch. Obtain from [`Poller::begin_tick`].
///
/// Not `Clone`: at most one ticket exists at a time, and handing it back to
/// [`Poller::complete`] is what frees the in-flight slot.
#[derive(Debug, PartialEq, Eq)]
pub struct PollTicket {
    epoch: u64,
    lobby_id: LobbyId,
}

impl PollTicket {
    pub fn lobby_id(&self) -> &str {
        &self.lobby_id
    }
}

/// Why a poll failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    Api(ApiError),
    /// The server answered `success: false` or omitted the status.
    Rejected(Option<String>),
}

/// Result of feeding a fetch result back into the poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A fresh snapshot to install wholesale.
    Applied {
        snapshot: LobbySnapshot,
        /// New periodic interval if backoff was just reset.
        reschedule: Option<Duration>,
    },
    /// The fetch failed; polling continues.
    Failed {
        failure: PollFailure,
        consecutive_errors: u32,
        /// New periodic interval if backoff just grew.
        reschedule: Option<Duration>,
    },
    /// The ticket belonged to a stopped or restarted poller.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
    state: PollState,
    lobby_id: Option<LobbyId>,
    running: bool,
    terminated: bool,
    epoch: u64,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            state: PollState {
                consecutive_errors: 0,
                interval: config.base_interval,
                in_flight: false,
            },
            config,
            lobby_id: None,
            running: false,
            terminated: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Current periodic interval.
    pub fn interval(&self) -> Duration {
        self.state.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether game-over was observed. Permanent.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Begin polling `lobby_id`. Returns `false` (and does nothing) without a
    /// lobby, when already running for the same lobby, or after game-over.
    pub fn start(&mut self, lobby_id: Option<&str>) -> bool {
        let Some(lobby_id) = lobby_id else {
            return false;
        };
        if self.terminated || (self.running && self.lobby_id.as_deref() == Some(lobby_id)) {
            return false;
        }
        self.epoch += 1;
        self.lobby_id = Some(lobby_id.to_string());
        self.running = true;
        // A fetch orphaned by `stop` still holds the slot.
        self.state = PollState {
            consecutive_errors: 0,
            interval: self.config.base_interval,
            in_flight: self.state.in_flight,
        };
        tracing::debug!(lobby = %lobby_id, "poller started");
        true
    }

    /// Stop polling. Idempotent. A fetch still in flight is orphaned but
    /// keeps the slot until its ticket is completed.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.epoch += 1;
        tracing::debug!("poller stopped");
    }

    /// Reserve the in-flight slot. `None` means skip this tick: not running,
    /// game over, or a fetch is already outstanding.
    pub fn begin_tick(&mut self) -> Option<PollTicket> {
        if !self.running || self.terminated || self.state.in_flight {
            return None;
        }
        let lobby_id = self.lobby_id.clone()?;
        self.state.in_flight = true;
        Some(PollTicket {
            epoch: self.epoch,
            lobby_id,
        })
    }

    /// Consume a ticket with the fetch result.
    pub fn complete(
        &mut self,
        ticket: PollTicket,
        result: Result<StatusResponse, ApiError>,
    ) -> PollOutcome {
        self.state.in_flight = false;
        if ticket.epoch != self.epoch || !self.running {
            tracing::debug!(lobby = %ticket.lobby_id, "discarding stale poll response");
            return PollOutcome::Discarded;
        }

        let failure = match result {
            Ok(StatusResponse {
                success: true,
                status: Some(snapshot),
                ..
            }) => return self.on_success(snapshot),
            Ok(response) => PollFailure::Rejected(response.rejection(POLL_FAILURE_MESSAGE)),
            Err(err) => PollFailure::Api(err),
        };
        self.on_failure(failure)
    }

    /// Run one full tick against `api`. `None` if the tick was skipped.
    pub async fn tick<A: GameApi>(&mut self, api: &A) -> Option<PollOutcome> {
        let ticket = self.begin_tick()?;
        let result = api.lobby_status(ticket.lobby_id()).await;
        Some(self.complete(ticket, result))
    }

    fn on_success(&mut self, snapshot: LobbySnapshot) -> PollOutcome {
        self.state.consecutive_errors = 0;
        let reschedule = self.set_interval(self.config.base_interval);
        if snapshot.game_over {
            tracing::info!("game over observed, polling finished");
            self.terminated = true;
            self.running = false;
        }
        PollOutcome::Applied {
            snapshot,
            reschedule,
        }
    }

    fn on_failure(&mut self, failure: PollFailure) -> PollOutcome {
        self.state.consecutive_errors += 1;
        let errors = self.state.consecutive_errors;
        tracing::warn!(consecutive_errors = errors, ?failure, "lobby status poll failed");

        let reschedule = if errors >= self.config.error_threshold {
            let doubled = (self.state.interval * 2).min(self.config.max_interval);
            self.set_interval(doubled)
        } else {
            None
        };
        PollOutcome::Failed {
            failure,
            consecutive_errors: errors,
            reschedule,
        }
    }

    fn set_interval(&mut self, interval: Duration) -> Option<Duration> {
        if interval == self.state.interval {
            return None;
        }
        tracing::info!(
            from_ms = self.state.interval.as_millis() as u64,
            to_ms = interval.as_millis() as u64,
            "poll interval changed"
        );
        self.state.interval = interval;
        Some(interval)
    }
}
