//! Command handlers behind the CLI

pub mod content;
pub mod hub;

use crate::api::HubConnector;
use crate::config::AppSettings;
use crate::ui::Prompter;

/// What every command needs besides its own arguments
pub struct CommandContext<'a> {
    pub settings: AppSettings,
    pub connector: &'a dyn HubConnector,
    pub prompter: &'a dyn Prompter,
}
