//! Plain-text conversation transcript (`--log <file>`).

use chrono::Local;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    /// A transcript that writes nothing.
    pub fn disabled() -> Self {
        Self { file_path: None }
    }

    /// Open (or create) the transcript file for appending.
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        if let Some(path) = &log_file {
            test_file_access(path)?;
        }
        Ok(Self {
            file_path: log_file,
        })
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn status_string(&self) -> String {
        match &self.file_path {
            None => "disabled".to_string(),
            Some(path) => format!(
                "active ({})",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
        }
    }

    pub fn log_session_start(&self, coach: &str, model: &str) -> Result<(), Box<dyn Error>> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.log_note(&format!("Session started {now} with {coach} ({model})"))
    }

    pub fn log_user(&self, content: &str) -> Result<(), Box<dyn Error>> {
        self.write_block(&format!("You: {content}"))
    }

    pub fn log_assistant(&self, content: &str) -> Result<(), Box<dyn Error>> {
        if content.is_empty() {
            return Ok(());
        }
        self.write_block(content)
    }

    /// Session events (role changes, cancellations, errors) as `## ` lines.
    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn Error>> {
        self.write_block(&format!("## {note}"))
    }

    fn write_block(&self, content: &str) -> Result<(), Box<dyn Error>> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }
}

fn test_file_access(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()?;
    Ok(())
}
