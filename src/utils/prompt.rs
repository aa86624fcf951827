//! User prompts behind an injectable interface.
//!
//! The planner and the provisioning sequencer never talk to the terminal
//! directly; they take a [`Prompt`] so tests can drive them with a scripted
//! implementation. The console implementation is built on dialoguer.

use crate::utils::error::{Result, VolstrapError};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

/// The capability set every interactive component relies on.
///
/// All methods retry indefinitely on invalid input; they only return an
/// error for cancellation or an interrupt, never for a bad answer.
pub trait Prompt {
    /// Yes/no question.
    fn ask_yes_no(&mut self, question: &str) -> Result<bool>;

    /// Free-form text input.
    fn ask_text(&mut self, prompt: &str) -> Result<String>;

    /// Choose an index from an enumerated list.
    fn ask_choice(&mut self, prompt: &str, items: &[&str]) -> Result<usize>;

    /// Password with double-entry confirmation. Callers must drop the
    /// returned value as soon as it has been used once.
    fn ask_password(&mut self, prompt: &str) -> Result<String>;
}

/// Terminal-backed prompt implementation.
pub struct ConsolePrompt {
    theme: ColorfulTheme,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// dialoguer reports both Esc and a signal-interrupted read as errors;
    /// tell them apart so the caller can resume after Ctrl+C.
    fn cancelled(&self) -> VolstrapError {
        if crate::utils::signal::is_interrupted() {
            VolstrapError::Interrupted
        } else {
            VolstrapError::UserCancelled
        }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for ConsolePrompt {
    fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .interact()
            .map_err(|_| self.cancelled())
    }

    fn ask_text(&mut self, prompt: &str) -> Result<String> {
        Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(|_| self.cancelled())
    }

    fn ask_choice(&mut self, prompt: &str, items: &[&str]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(|_| self.cancelled())
    }

    fn ask_password(&mut self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .with_confirmation("Confirm passphrase", "Passphrases do not match")
            .interact()
            .map_err(|_| self.cancelled())
    }
}

/// Display a warning and ask for confirmation
pub fn warn_confirm(prompt: &mut dyn Prompt, warning: &str) -> Result<bool> {
    println!("\n{} {}\n", console::style("WARNING:").yellow().bold(), warning);
    prompt.ask_yes_no("Continue?")
}

/// Display an error message
pub fn error(message: &str) {
    eprintln!("{} {}", console::style("error:").red().bold(), message);
}

/// Scripted prompt for driving the planner and sequencer in tests.
///
/// Answers are held in per-kind queues and consumed front to back; running
/// a queue dry panics, which surfaces an incomplete script immediately.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedPrompt {
    pub yes_no: std::collections::VecDeque<bool>,
    pub text: std::collections::VecDeque<String>,
    pub choices: std::collections::VecDeque<usize>,
    pub passwords: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_yes_no(&mut self, answer: bool) -> &mut Self {
        self.yes_no.push_back(answer);
        self
    }

    pub fn push_text(&mut self, answer: &str) -> &mut Self {
        self.text.push_back(answer.to_string());
        self
    }

    pub fn push_choice(&mut self, answer: usize) -> &mut Self {
        self.choices.push_back(answer);
        self
    }

    pub fn push_password(&mut self, answer: &str) -> &mut Self {
        self.passwords.push_back(answer.to_string());
        self
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .yes_no
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at yes/no: {question}")))
    }

    fn ask_text(&mut self, prompt: &str) -> Result<String> {
        Ok(self
            .text
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at text: {prompt}")))
    }

    fn ask_choice(&mut self, prompt: &str, items: &[&str]) -> Result<usize> {
        let idx = self
            .choices
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at choice: {prompt}"));
        assert!(idx < items.len(), "scripted choice {idx} out of range");
        Ok(idx)
    }

    fn ask_password(&mut self, prompt: &str) -> Result<String> {
        Ok(self
            .passwords
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at password: {prompt}")))
    }
}
