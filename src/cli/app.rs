use super::commands::{ContentCommands, HubCommands};
use crate::api::HubCredentials;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hub-migrate")]
#[command(about = "Copy, move and revert content between content hubs")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Whole-hub operations
    Hub(HubCommands),
    /// Content item operations
    Content(ContentCommands),
}

/// Source hub credentials, shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Client id of the source hub
    #[arg(long, env = "HUB_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Client secret of the source hub
    #[arg(long, env = "HUB_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Source hub id
    #[arg(long, env = "HUB_ID", global = true)]
    pub hub_id: Option<String>,
}

impl CredentialArgs {
    pub fn source(&self) -> Result<HubCredentials> {
        let missing =
            |name: &str| anyhow::anyhow!("Missing --{} (or its environment variable)", name);
        Ok(HubCredentials {
            client_id: self.client_id.clone().ok_or_else(|| missing("client-id"))?,
            client_secret: self.client_secret.clone().ok_or_else(|| missing("client-secret"))?,
            hub_id: self.hub_id.clone().ok_or_else(|| missing("hub-id"))?,
        })
    }
}
