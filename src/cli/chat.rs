//! Line-oriented interactive chat.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cli::coach_list::format_coach_lines;
use crate::cli::scenarios::format_scenario_lines;
use crate::cli::setup::{ChatContext, SessionOptions};
use crate::core::scenario::{all_scenarios, find_scenario};
use crate::core::session::{ConversationSession, SessionEvent, TurnHandle, TurnOutcome};
use crate::utils::transcript::TranscriptLog;

const HELP_TEXT: &str = "\
Type a message and press Enter to send it.
  /role [id]         Switch coach (lists coaches without an id)
  /scenario [title]  Start a practice scenario (lists scenarios without a title)
  /clear             Forget the conversation so far
  /help              Show this help
  /quit              Leave
Ctrl-C cancels a reply in progress; at the prompt it quits.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputAction {
    Empty,
    Send(String),
    Role(Option<String>),
    Scenario(Option<String>),
    Clear,
    Help,
    Quit,
    Unknown(String),
}

pub(crate) fn parse_input(line: &str) -> InputAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputAction::Empty;
    }
    let Some(command_line) = trimmed.strip_prefix('/') else {
        return InputAction::Send(trimmed.to_string());
    };

    let (command, rest) = match command_line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (command_line, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match command.to_lowercase().as_str() {
        "role" | "coach" => InputAction::Role(argument),
        "scenario" => InputAction::Scenario(argument),
        "clear" => InputAction::Clear,
        "help" => InputAction::Help,
        "quit" | "exit" => InputAction::Quit,
        _ => InputAction::Unknown(command.to_string()),
    }
}

/// Print one session event for `turn`; returns true once the turn is over.
pub(crate) fn render_event<W: Write>(
    out: &mut W,
    event: &SessionEvent,
    turn: u64,
) -> io::Result<bool> {
    match event {
        SessionEvent::Fragment { turn: t, delta, .. } if *t == turn => {
            write!(out, "{delta}")?;
            out.flush()?;
            Ok(false)
        }
        SessionEvent::TurnCompleted { turn: t, message } if *t == turn => {
            if message.content.is_empty() {
                write!(out, "(no reply)")?;
            }
            writeln!(out)?;
            writeln!(out)?;
            Ok(true)
        }
        SessionEvent::TurnCancelled { turn: t } if *t == turn => {
            writeln!(out)?;
            writeln!(out, "⏹️  Reply cancelled")?;
            writeln!(out)?;
            Ok(true)
        }
        SessionEvent::TurnFailed { turn: t, message } if *t == turn => {
            writeln!(out)?;
            writeln!(out, "❌ {}", message.content)?;
            writeln!(out)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Print the reply as it streams; Ctrl-C cancels it.
pub(crate) async fn drive_turn(
    session: &ConversationSession,
    events: &mut UnboundedReceiver<SessionEvent>,
    handle: TurnHandle,
    transcript: &TranscriptLog,
) -> Result<TurnOutcome, Box<dyn Error>> {
    let turn = handle.turn();
    let mut stdout = io::stdout();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if render_event(&mut stdout, &event, turn)? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
            }
        }
    }

    let outcome = handle.outcome().await;
    match &outcome {
        TurnOutcome::Completed(reply) => transcript.log_assistant(reply)?,
        TurnOutcome::Cancelled => transcript.log_note("Reply cancelled")?,
        TurnOutcome::Failed(reason) => transcript.log_note(&format!("Error: {reason}"))?,
    }
    Ok(outcome)
}

async fn send_and_wait(
    session: &ConversationSession,
    events: &mut UnboundedReceiver<SessionEvent>,
    transcript: &TranscriptLog,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    let handle = match session.send(text) {
        Ok(handle) => handle,
        Err(err) if err.is_input_error() => {
            eprintln!("⚠️  {err}");
            return Ok(());
        }
        Err(err) => return Err(Box::new(err)),
    };
    transcript.log_user(text)?;
    drive_turn(session, events, handle, transcript).await?;
    Ok(())
}

pub async fn run_chat(
    options: SessionOptions,
    log_file: Option<PathBuf>,
    scenario: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let context = ChatContext::prepare(&options)?;
    let transcript = TranscriptLog::new(log_file)?;

    let opening = match scenario.as_deref() {
        Some(title) => Some(find_scenario(&context.config, title).ok_or_else(|| {
            format!("Scenario '{title}' not found. Run 'fluentcoach scenarios' to list them.")
        })?),
        None => None,
    };

    let (session, mut events) = context.start_session();
    transcript.log_session_start(&context.coach.display_name, &context.settings.model)?;

    println!(
        "🎙️  FluentCoach with {} ({} / {})",
        context.coach.display_name,
        context.provider.provider_display_name,
        context.settings.model
    );
    if transcript.is_active() {
        println!("📝 Transcript: {}", transcript.status_string());
    }
    println!("Type /help for commands.");
    println!();

    if let Some(scenario) = opening {
        println!("{} {}", scenario.icon, scenario.title);
        println!("> {}", scenario.prompt);
        send_and_wait(&session, &mut events, &transcript, &scenario.prompt).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_input(&line) {
            InputAction::Empty => {}
            InputAction::Send(text) => {
                send_and_wait(&session, &mut events, &transcript, &text).await?;
            }
            InputAction::Role(None) => {
                let active = session.active_profile();
                for line in format_coach_lines(&context.coaches, Some(active.id.as_str())) {
                    println!("{line}");
                }
            }
            InputAction::Role(Some(id)) => match context.coaches.find(&id) {
                Some(coach) => {
                    session.change_role(coach.clone());
                    while events.try_recv().is_ok() {}
                    transcript.log_note(&format!("Coach changed to {}", coach.display_name))?;
                    println!("🔄 Now practicing with {}. History cleared.", coach.display_name);
                }
                None => eprintln!("❌ Unknown coach '{id}'. Type /role to list coaches."),
            },
            InputAction::Scenario(None) => {
                for line in format_scenario_lines(&all_scenarios(&context.config)) {
                    println!("{line}");
                }
            }
            InputAction::Scenario(Some(title)) => match find_scenario(&context.config, &title) {
                Some(scenario) => {
                    println!("{} {}", scenario.icon, scenario.title);
                    send_and_wait(&session, &mut events, &transcript, &scenario.prompt).await?;
                }
                None => eprintln!("❌ Unknown scenario '{title}'. Type /scenario to list them."),
            },
            InputAction::Clear => {
                session.clear_history();
                while events.try_recv().is_ok() {}
                transcript.log_note("History cleared")?;
                println!("🧹 Conversation cleared.");
            }
            InputAction::Help => println!("{HELP_TEXT}"),
            InputAction::Quit => break,
            InputAction::Unknown(command) => {
                eprintln!("❌ Unknown command '/{command}'. Type /help for commands.");
            }
        }
    }

    Ok(())
}
