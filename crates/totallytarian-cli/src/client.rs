//! Client orchestrator: binds the session, runs the shared event loop, reads
//! commands from stdin and prints whatever changed.
//!
//! This module is specific to the CLI binary.

use std::fmt::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use totallytarian_client::config::ClientConfig;
use totallytarian_client::controller::{ClientController, ClientView, UserAction};
use totallytarian_client::http::HttpApi;
use totallytarian_client::lobby::{self, CREATE_FAILED, JOIN_FAILED};
use totallytarian_client::runtime::run_session;
use totallytarian_core::game_state::ClientState;
use totallytarian_core::screen::{MainPanel, RoleView, Screen, VoteKind};

use crate::commands::{self, Command, HELP};

/// Create or join a lobby, then play until `quit` or end of input.
pub async fn start_client(
    config: ClientConfig,
    name: &str,
    lobby_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let api = HttpApi::new(&config)?;

    let session = match lobby_id {
        Some(lobby_id) => lobby::join_lobby(&api, lobby_id, name)
            .await
            .map_err(|e| e.user_message(JOIN_FAILED))?,
        None => lobby::create_lobby(&api, name)
            .await
            .map_err(|e| e.user_message(CREATE_FAILED))?,
    };
    if let Some(membership) = session.membership() {
        println!(
            "Joined lobby {} as {}{}",
            membership.lobby_id,
            name.trim(),
            if membership.is_host { " (host)" } else { "" }
        );
    }
    println!("Type `help` for commands.");

    let mut ctrl = ClientController::new(api, session, config.poll);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(ctrl.view());

    tokio::spawn(read_commands(action_tx, view_rx.clone()));

    let session = run_session(&mut ctrl, &mut action_rx, &view_tx, |ms| {
        tokio::time::sleep(std::time::Duration::from_millis(ms))
    });
    tokio::select! {
        () = session => {}
        () = print_views(view_rx) => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

async fn read_commands(
    actions: mpsc::UnboundedSender<UserAction>,
    view: watch::Receiver<ClientView>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let action = match commands::parse(&line) {
            Command::Action(action) => action,
            Command::Select { player } => match resolve(&view, &player) {
                Some(id) => UserAction::SelectNominee(id),
                None => continue,
            },
            Command::Pick { player } => match resolve(&view, &player) {
                Some(id) => UserAction::ToggleMinister(id),
                None => continue,
            },
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
            Command::Empty => continue,
            Command::Unknown { input } => {
                println!("Unknown command: {input}. Type `help` for commands.");
                continue;
            }
            Command::InvalidArgs { error, .. } => {
                println!("{error}");
                continue;
            }
        };
        if actions.send(action).is_err() {
            break;
        }
    }
    tracing::debug!("input closed");
}

fn resolve(view: &watch::Receiver<ClientView>, player: &str) -> Option<String> {
    let found = commands::resolve_player(&view.borrow().state.snapshot, player);
    if found.is_none() {
        println!("No player named {player}");
    }
    found
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

async fn print_views(mut view: watch::Receiver<ClientView>) {
    let mut last = String::new();
    loop {
        let text = describe(&view.borrow_and_update());
        if text != last {
            println!("{text}");
            last = text;
        }
        if view.changed().await.is_err() {
            break;
        }
    }
}

/// Render a view as plain text.
fn describe(view: &ClientView) -> String {
    let state = &view.state;
    let snapshot = &state.snapshot;
    let mut out = String::new();

    if let Some(announcement) = &view.announcement {
        let _ = writeln!(out, "*** {} ***", announcement.title());
        let _ = writeln!(out, "    {}", announcement.body());
    }

    let _ = writeln!(out, "== {} ==", view.screen);
    match view.screen {
        Screen::Start => out.push_str("Not in a lobby.\n"),
        Screen::End => {
            let headline = snapshot.winner.map_or("Game over", |w| w.headline());
            let _ = writeln!(out, "{headline}");
        }
        Screen::Role => match view.role_view {
            RoleView::WaitingForStart => {
                let _ = writeln!(out, "Waiting for players ({} joined):", snapshot.players.len());
                for (id, name) in snapshot.players.iter() {
                    let host = if snapshot.is_host(id) { " ★" } else { "" };
                    let _ = writeln!(out, "  - {name}{host}");
                }
                if state.can_start_game() {
                    out.push_str("Type `start` to begin.\n");
                }
            }
            RoleView::Hidden => out.push_str("Your role is hidden. Type `reveal`.\n"),
            RoleView::Revealed(role) => {
                let _ = writeln!(out, "You are {}.", role.title());
                let _ = writeln!(out, "{}", role.description());
                out.push_str("Type `confirm` when ready.\n");
            }
        },
        Screen::Vote(VoteKind::Approval) => {
            let _ = writeln!(out, "Vote on ministers {}.", snapshot.minister_names());
            write_tally(&mut out, state);
            if state.local.vote_submitted {
                out.push_str("Vote submitted.\n");
            } else {
                out.push_str("vote <inspiring|acceptable|suspicious>\n");
            }
        }
        Screen::Vote(VoteKind::Execution) => {
            let _ = writeln!(
                out,
                "{} accuses {} of thoughtcrime.",
                snapshot.name_of(snapshot.execution_accuser_id()),
                snapshot.name_of(snapshot.execution_target_id()),
            );
            write_tally(&mut out, state);
            if state.local.vote_submitted {
                out.push_str("Vote submitted.\n");
            } else {
                out.push_str("execute | abstain | spare\n");
            }
        }
        Screen::Minister => {
            let _ = writeln!(out, "Decisions made: {}/2", snapshot.policy_decisions());
            if !state.local.policy_submitted {
                out.push_str("policy <support|sabotage>\n");
            }
            if !state.local.execution_submitted {
                out.push_str("accuse: call for the execution of your fellow minister\n");
            }
        }
        Screen::Main => {
            let _ = writeln!(
                out,
                "Round {} | {} | order meter {:.0}%",
                snapshot.round_number,
                snapshot.stage,
                snapshot.order_meter_percent()
            );
            if let Some(president) = snapshot.current_president_id() {
                let _ = writeln!(out, "President: {}", snapshot.player_name(president));
            }
            let living: Vec<String> = snapshot
                .living_players
                .iter()
                .map(|id| snapshot.player_name(id))
                .collect();
            let _ = writeln!(out, "Living: {}", living.join(", "));
            match view.main_panel {
                MainPanel::Spectator => out.push_str("You have been eliminated.\n"),
                MainPanel::NominatePresident if !state.local.nomination_submitted => {
                    out.push_str("select <player>, then `nominate`\n");
                }
                MainPanel::ConfirmLoyalty if !state.local.loyalty_confirmed => {
                    out.push_str("Type `loyal` to confirm your loyalty.\n");
                }
                MainPanel::SelectMinisters if !state.local.ministers_submitted => {
                    out.push_str("pick <player> twice, then `ministers`\n");
                }
                _ => {}
            }
        }
    }

    if let Some(error) = &state.error {
        let _ = writeln!(out, "! {error}");
    }
    if let Some(warning) = &state.poll_warning {
        let _ = writeln!(out, "(warning: {warning})");
    }
    out.trim_end().to_string()
}

fn write_tally(out: &mut String, state: &ClientState) {
    let (cast, living) = state.vote_tally();
    let _ = writeln!(out, "Votes cast: {cast} / {living}");
}
