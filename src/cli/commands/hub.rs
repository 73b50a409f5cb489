use super::{DestinationArgs, ImportArgs};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct HubCommands {
    #[command(subcommand)]
    pub command: HubSubcommands,
}

#[derive(Subcommand)]
pub enum HubSubcommands {
    /// Clone settings, schemas, types, indexes, content and events into another hub
    Clone(CloneArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    /// Working directory for exports and the settings backup
    pub dir: PathBuf,

    #[command(flatten)]
    pub destination: DestinationArgs,

    #[command(flatten)]
    pub import: ImportArgs,

    /// Index of the step to start from (0 = settings)
    #[arg(long, default_value_t = 0)]
    pub step: usize,

    /// Revert the clone recorded in this log instead of cloning
    #[arg(long)]
    pub revert_log: Option<PathBuf>,

    /// Include events, whose snapshots can't be cloned
    #[arg(long)]
    pub accept_snapshot_limits: bool,

    /// Where to write the action log
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
