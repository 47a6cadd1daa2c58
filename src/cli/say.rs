//! One-shot "say" command: send a single message and print the reply.

use std::error::Error;
use std::path::PathBuf;

use crate::cli::chat::drive_turn;
use crate::cli::setup::{ChatContext, SessionOptions};
use crate::core::session::TurnOutcome;
use crate::utils::transcript::TranscriptLog;

pub async fn run_say(
    options: SessionOptions,
    log_file: Option<PathBuf>,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: fluentcoach say <message>");
        std::process::exit(1);
    }

    let context = ChatContext::prepare(&options)?;
    let transcript = TranscriptLog::new(log_file)?;
    let (session, mut events) = context.start_session();

    transcript.log_session_start(&context.coach.display_name, &context.settings.model)?;
    let handle = session.send(&prompt)?;
    transcript.log_user(&prompt)?;

    match drive_turn(&session, &mut events, handle, &transcript).await? {
        TurnOutcome::Completed(_) => Ok(()),
        TurnOutcome::Cancelled => std::process::exit(130),
        TurnOutcome::Failed(reason) => Err(reason.into()),
    }
}
