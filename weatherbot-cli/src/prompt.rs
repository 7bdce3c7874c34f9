use anyhow::{Context, Result};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use std::io::{self, BufRead};
use weatherbot_core::Prompter;

/// Reads chat input from the terminal, or line by line from piped stdin.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn read_line(&mut self) -> Result<Option<String>> {
        match Text::new("You:").prompt() {
            Ok(line) => Ok(Some(line)),
            // Esc and Ctrl-C close the conversation like `exit` does.
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
            Err(InquireError::NotTTY) => read_plain_line(&mut io::stdin().lock()),
            Err(err) => Err(err.into()),
        }
    }
}

/// One line without its line ending; `None` at end of input.
fn read_plain_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }

    let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed_len);
    Ok(Some(line))
}

/// Masked prompt for an API key. Returns `None` if the user cancels.
pub fn read_api_key(provider: &str) -> Result<Option<String>> {
    let answer = Password::new(&format!("API key for {provider}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_validator(|key: &str| {
            if key.trim().is_empty() {
                Ok(inquire::validator::Validation::Invalid("API key must not be empty".into()))
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt();

    match answer {
        Ok(key) => Ok(Some(key.trim().to_string())),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
