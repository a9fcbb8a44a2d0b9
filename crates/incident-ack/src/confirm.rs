//! # Confirmation Gate
//!
//! Nothing is mutated until a [`Confirmer`] says yes. Only `yes` / `y`
//! (any case) count as agreement; anything else, including an empty line
//! or end of input, declines.

use std::io::{self, BufRead, IsTerminal};

use dialoguer::{theme::ColorfulTheme, Input};

use crate::config::Action;
use crate::error::Error;
use crate::models::AlertSummary;
use crate::ui;

/// Decides whether the selected incidents may be mutated.
pub trait Confirmer {
    fn confirm(&mut self, summary: &AlertSummary, action: Action) -> Result<bool, Error>;
}

/// Whether an operator answer counts as agreement.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Question shown to the operator.
#[must_use]
pub fn prompt_text(summary: &AlertSummary, action: Action) -> String {
    format!(
        "Do you want to {} all {} incidents? (yes/no)",
        action.verb(),
        summary.total()
    )
}

/// Pick a confirmer for the current process.
///
/// `--yes` skips the question, a terminal gets an interactive prompt, and
/// piped input is read one line at a time.
#[must_use]
pub fn for_stdin(assume_yes: bool) -> Box<dyn Confirmer> {
    if assume_yes {
        Box::new(PresetConfirmer::new(true))
    } else if io::stdin().is_terminal() {
        Box::new(TerminalConfirmer::default())
    } else {
        Box::new(LineConfirmer::new(io::stdin().lock()))
    }
}

/// Interactive prompt on a terminal.
#[derive(Default)]
pub struct TerminalConfirmer {
    theme: ColorfulTheme,
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&mut self, summary: &AlertSummary, action: Action) -> Result<bool, Error> {
        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt_text(summary, action))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Prompt(e.to_string()))?;
        Ok(is_affirmative(&answer))
    }
}

/// Reads a single answer line from any buffered reader.
pub struct LineConfirmer<R> {
    reader: R,
}

impl<R: BufRead> LineConfirmer<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Confirmer for LineConfirmer<R> {
    fn confirm(&mut self, summary: &AlertSummary, action: Action) -> Result<bool, Error> {
        ui::print_prompt(&prompt_text(summary, action));
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| Error::Prompt(e.to_string()))?;
        if read == 0 {
            ui::print_info("No answer on input; treating as 'no'.");
            return Ok(false);
        }
        Ok(is_affirmative(&line))
    }
}

/// Fixed answer for unattended runs.
pub struct PresetConfirmer {
    answer: bool,
}

impl PresetConfirmer {
    #[must_use]
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

impl Confirmer for PresetConfirmer {
    fn confirm(&mut self, summary: &AlertSummary, action: Action) -> Result<bool, Error> {
        let reply = if self.answer { "yes" } else { "no" };
        ui::print_info(&format!("{} -> {reply} (preset)", prompt_text(summary, action)));
        Ok(self.answer)
    }
}
