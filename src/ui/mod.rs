pub mod prompts;

pub use prompts::{confirm_or_force, Prompter, ScriptedPrompter, TerminalPrompter};
