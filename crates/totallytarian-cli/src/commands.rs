//! Parsing of typed commands into player actions.

use totallytarian_client::controller::UserAction;
use totallytarian_core::protocol::{
    ApprovalVote, ExecutionChoice, LobbySnapshot, PlayerId, PolicyVote,
};

pub const HELP: &str = "\
commands:
  start                    start the game (host)
  reveal | confirm         reveal your role, then acknowledge it
  select <player>          choose a presidential nominee (Thought Police)
  nominate                 submit the selected nominee
  loyal                    confirm your loyalty to the Party
  pick <player>            toggle a minister pick (president)
  ministers                submit the two picked ministers
  vote <inspiring|acceptable|suspicious>
  execute | abstain | spare
  policy <support|sabotage>
  accuse                   call for the execution of your fellow minister
  close                    close the end-of-game announcement
  help | quit";

/// Parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action(UserAction),

    /// Nominee choice; the player is resolved against the roster.
    Select { player: String },

    /// Minister pick; the player is resolved against the roster.
    Pick { player: String },

    Help,
    Quit,
    Empty,

    Unknown { input: String },

    InvalidArgs { command: String, error: String },
}

pub fn parse(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.split_whitespace();
    let Some(command) = parts.next() else {
        return Command::Empty;
    };
    let command = command.to_ascii_lowercase();
    let rest: Vec<&str> = parts.collect();
    let arg = rest.join(" ");

    let action = match command.as_str() {
        "start" => UserAction::StartGame,
        "reveal" => UserAction::RevealRole,
        "confirm" | "understood" => UserAction::ConfirmRole,
        "nominate" => UserAction::NominatePresident,
        "loyal" => UserAction::ConfirmLoyalty,
        "ministers" => UserAction::SubmitMinisters,
        "execute" => UserAction::ExecutionVote(ExecutionChoice::Execute),
        "abstain" => UserAction::ExecutionVote(ExecutionChoice::Abstain),
        "spare" => UserAction::ExecutionVote(ExecutionChoice::Spare),
        "accuse" => UserAction::CallExecution,
        "close" => UserAction::CloseAnnouncement,

        "select" | "pick" if arg.is_empty() => {
            return invalid(&command, &format!("Usage: {command} <player>"));
        }
        "select" => return Command::Select { player: arg },
        "pick" => return Command::Pick { player: arg },

        "vote" => match arg.to_ascii_lowercase().as_str() {
            "inspiring" | "1" => UserAction::ApprovalVote(ApprovalVote::Inspiring),
            "acceptable" | "0" => UserAction::ApprovalVote(ApprovalVote::Acceptable),
            "suspicious" | "-1" => UserAction::ApprovalVote(ApprovalVote::Suspicious),
            _ => return invalid("vote", "Usage: vote <inspiring|acceptable|suspicious>"),
        },
        "policy" => match arg.to_ascii_lowercase().as_str() {
            "support" => UserAction::PolicyVote(PolicyVote::Support),
            "sabotage" => UserAction::PolicyVote(PolicyVote::Sabotage),
            _ => return invalid("policy", "Usage: policy <support|sabotage>"),
        },

        "help" | "?" => return Command::Help,
        "quit" | "q" | "exit" => return Command::Quit,
        _ => {
            return Command::Unknown {
                input: input.to_string(),
            };
        }
    };
    Command::Action(action)
}

fn invalid(command: &str, error: &str) -> Command {
    Command::InvalidArgs {
        command: command.to_string(),
        error: error.to_string(),
    }
}

/// Find a player by id, or by display name ignoring case.
pub fn resolve_player(snapshot: &LobbySnapshot, token: &str) -> Option<PlayerId> {
    if snapshot.players.contains(token) {
        return Some(token.to_string());
    }
    snapshot
        .players
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(token))
        .map(|(id, _)| id.to_string())
}
