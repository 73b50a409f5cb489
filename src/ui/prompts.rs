use anyhow::Result;
use dialoguer::Select;
use is_terminal::IsTerminal;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Asks the operator yes/no questions. Injected so tests can answer.
pub trait Prompter: Send + Sync {
    /// `Ok(None)` means no answer could be obtained (e.g. no terminal)
    fn confirm(&self, prompt: &str, default_yes: bool) -> Result<Option<bool>>;
}

/// Resolve a confirmation gate. `force` skips the question; a missing answer
/// counts as "no".
pub fn confirm_or_force(prompter: &dyn Prompter, force: bool, prompt: &str) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Ok(prompter.confirm(prompt, false)?.unwrap_or(false))
}

/// Interactive confirmation prompt using arrow-key navigable selection
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default_yes: bool) -> Result<Option<bool>> {
        if !std::io::stdin().is_terminal() {
            log::warn!("No terminal available to answer: {}", prompt);
            return Ok(None);
        }

        let items = vec!["Yes", "No"];
        let default_index = if default_yes { 0 } else { 1 };

        let selection = Select::new()
            .with_prompt(prompt)
            .items(&items)
            .default(default_index)
            .interact()?;

        Ok(Some(selection == 0))
    }
}

/// Replays canned answers in order; answers `None` once they run out
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, _default_yes: bool) -> Result<Option<bool>> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
        Ok(self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front()))
    }
}
