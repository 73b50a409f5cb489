pub mod content;
pub mod hub;

pub use content::{ContentCommands, ContentSubcommands, CopyArgs};
pub use hub::{CloneArgs, HubCommands, HubSubcommands};

use crate::config::DestinationOverrides;
use crate::handlers::ImportOptions;
use clap::Args;
use std::path::PathBuf;

/// Destination hub values; each defaults to the source value
#[derive(Args, Debug, Clone, Default)]
pub struct DestinationArgs {
    /// Destination hub id
    #[arg(long)]
    pub dst_hub_id: Option<String>,

    /// Client id for the destination hub
    #[arg(long)]
    pub dst_client_id: Option<String>,

    /// Client secret for the destination hub
    #[arg(long)]
    pub dst_secret: Option<String>,
}

impl From<DestinationArgs> for DestinationOverrides {
    fn from(args: DestinationArgs) -> Self {
        DestinationOverrides {
            hub_id: args.dst_hub_id,
            client_id: args.dst_client_id,
            secret: args.dst_secret,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// Source to destination id mapping, reused across runs
    #[arg(long)]
    pub mapping_file: Option<PathBuf>,

    /// Overwrite existing destination content without asking
    #[arg(short, long)]
    pub force: bool,

    /// Only report what would be imported
    #[arg(short, long)]
    pub validate: bool,

    /// Skip content whose references can't be resolved
    #[arg(long)]
    pub skip_incomplete: bool,
}

impl From<ImportArgs> for ImportOptions {
    fn from(args: ImportArgs) -> Self {
        ImportOptions {
            force: args.force,
            validate: args.validate,
            skip_incomplete: args.skip_incomplete,
            mapping_file: args.mapping_file,
        }
    }
}
