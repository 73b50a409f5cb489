use super::{DestinationArgs, ImportArgs};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ContentCommands {
    #[command(subcommand)]
    pub command: ContentSubcommands,
}

#[derive(Subcommand)]
pub enum ContentSubcommands {
    /// Copy content items into another hub
    Copy(CopyArgs),
    /// Copy content items, then archive them in the source hub
    Move(CopyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    /// Copy config file; written from the other arguments if it doesn't exist
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub destination: DestinationArgs,

    #[command(flatten)]
    pub import: ImportArgs,

    /// Revert the copy or move recorded in this log instead
    #[arg(long)]
    pub revert_log: Option<PathBuf>,

    /// Where to write the action log
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
