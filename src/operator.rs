//! Operator input: card ids and confirmation answers arrive as text lines.
//! A card reader acting as a keyboard ends each id with Enter.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;

use crate::session::{Decision, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    Identity(String),
    Decision(Decision),
    Quit,
}

/// Interpret a line against the phase it arrives in. Lines that mean
/// nothing in that phase are dropped.
pub fn interpret_line(phase: SessionPhase, line: &str) -> Option<OperatorInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let lowered = line.to_ascii_lowercase();
    if matches!(lowered.as_str(), "quit" | "exit") {
        return Some(OperatorInput::Quit);
    }

    let decision = parse_decision(&lowered);
    match phase {
        // A late repeat of a decision key must not open a session for "f".
        SessionPhase::AwaitingIdentity if decision.is_some() => None,
        SessionPhase::AwaitingIdentity => Some(OperatorInput::Identity(line.to_string())),
        SessionPhase::Confirming => decision.map(OperatorInput::Decision),
        SessionPhase::Tracking | SessionPhase::Persisting => None,
    }
}

fn parse_decision(lowered: &str) -> Option<Decision> {
    match lowered {
        "r" | "repeat" => Some(Decision::Repeat),
        "f" | "finish" | "finished" => Some(Decision::Finish),
        _ => None,
    }
}

/// Forward stdin lines to the station loop. The thread exits at EOF or when
/// the loop drops its receiver.
pub fn spawn_stdin_reader(tx: mpsc::Sender<String>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("respiro-operator".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Operator input failed: {err}");
                        break;
                    }
                }
            }
            info!("Operator input closed");
        })
        .context("failed to spawn operator input thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_ids_only_while_awaiting_identity() {
        assert_eq!(
            interpret_line(SessionPhase::AwaitingIdentity, " 0004521337\n"),
            Some(OperatorInput::Identity("0004521337".into()))
        );
        assert_eq!(interpret_line(SessionPhase::Tracking, "0004521337"), None);
    }

    #[test]
    fn decisions_only_while_confirming() {
        assert_eq!(
            interpret_line(SessionPhase::Confirming, "R"),
            Some(OperatorInput::Decision(Decision::Repeat))
        );
        assert_eq!(
            interpret_line(SessionPhase::Confirming, "finished"),
            Some(OperatorInput::Decision(Decision::Finish))
        );
        assert_eq!(interpret_line(SessionPhase::Confirming, "maybe"), None);
        assert_eq!(interpret_line(SessionPhase::Persisting, "f"), None);
    }

    #[test]
    fn decision_keys_never_become_card_ids() {
        for key in ["f", "F", "finish", "finished", "r", "Repeat"] {
            assert_eq!(interpret_line(SessionPhase::AwaitingIdentity, key), None, "{key}");
        }
        assert_eq!(
            interpret_line(SessionPhase::AwaitingIdentity, "f12"),
            Some(OperatorInput::Identity("f12".into()))
        );
    }

    #[test]
    fn quit_in_any_phase_and_blank_lines_dropped() {
        assert_eq!(interpret_line(SessionPhase::Tracking, "quit"), Some(OperatorInput::Quit));
        assert_eq!(interpret_line(SessionPhase::AwaitingIdentity, "   "), None);
    }
}
