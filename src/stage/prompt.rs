// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Interactive prompts for the init wizard

use colored::Colorize;
use console::Term;
use std::io::{self, BufRead};

use super::StageKey;
use crate::errors::{StagelinkError, StagelinkResult};

/// Answer that omits an optional key
pub const SKIP_VALUE: &str = "n";

/// Outcome of a single answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Use this value
    Accept(String),
    /// Leave the key out of the stage
    Omit,
    /// Ask again, showing the message
    Invalid(String),
}

/// Interpret `input` typed for `key`
///
/// Empty input takes the default. Optional keys can be omitted with
/// [`SKIP_VALUE`]; the command can not.
pub fn process_response(key: StageKey, input: &str, default: Option<&str>) -> Response {
    let input = input.trim();
    let value = if input.is_empty() {
        default.unwrap_or_default()
    } else {
        input
    };

    if value.is_empty() {
        return Response::Invalid("Response required. Please try again.".into());
    }

    if !key.is_required() && value == SKIP_VALUE {
        return Response::Omit;
    }

    Response::Accept(value.to_string())
}

/// Source of answers for the init wizard
pub trait Prompter {
    /// Show `prompt` and read one line of input
    fn read_line(&mut self, prompt: &str) -> StagelinkResult<String>;

    /// Show an informational message
    fn note(&mut self, message: &str);

    /// Ask for `key` until a valid answer arrives; `None` means omitted
    fn ask(&mut self, key: StageKey, default: Option<&str>) -> StagelinkResult<Option<String>> {
        let prompt = render_prompt(key, default);
        loop {
            let input = self.read_line(&prompt)?;
            match process_response(key, &input, default) {
                Response::Accept(value) => return Ok(Some(value)),
                Response::Omit => return Ok(None),
                Response::Invalid(message) => self.note(&message.red().to_string()),
            }
        }
    }

    /// Ask a yes/no question; anything but yes is no
    fn confirm(&mut self, message: &str) -> StagelinkResult<bool> {
        let input = self.read_line(&format!("{} [y/n]: ", message))?;
        let answer = input.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

fn render_prompt(key: StageKey, default: Option<&str>) -> String {
    let mut prompt = key.prompt().bold().to_string();
    let default = default.filter(|d| !d.is_empty());

    if key.is_required() {
        if let Some(default) = default {
            prompt.push_str(&format!(" [{}]", default.green()));
        }
    } else {
        prompt.push_str(" [");
        if let Some(default) = default {
            prompt.push_str(&format!("{}, ", default.green()));
        }
        prompt.push_str(&format!("{} to omit", SKIP_VALUE).italic().to_string());
        prompt.push(']');
    }

    prompt.push_str(": ");
    prompt
}

/// Prompts on the terminal's stderr, reading from stdin
pub struct TerminalPrompter {
    term: Term,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> StagelinkResult<String> {
        self.term.write_str(prompt)?;
        self.term.flush()?;
        match read_answer(&mut io::stdin().lock()) {
            Err(StagelinkError::Aborted) => {
                let _ = self.term.write_line("");
                Err(StagelinkError::Aborted)
            }
            other => other,
        }
    }

    fn note(&mut self, message: &str) {
        let _ = self.term.write_line(message);
    }
}

/// Read one answer line; end of input aborts the wizard
fn read_answer(reader: &mut impl BufRead) -> StagelinkResult<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Err(StagelinkError::Aborted),
        Ok(_) => Ok(line.trim_end_matches(&['\n', '\r'][..]).to_string()),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(StagelinkError::Aborted),
        Err(e) => Err(e.into()),
    }
}
