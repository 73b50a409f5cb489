use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use hub_migrate::api::HttpConnector;
use hub_migrate::cli::commands::{ContentSubcommands, HubSubcommands};
use hub_migrate::cli::{Cli, Commands};
use hub_migrate::commands::{self, CommandContext};
use hub_migrate::config::AppSettings;
use hub_migrate::copy::CopyMode;
use hub_migrate::ui::TerminalPrompter;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("hub-migrate.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting hub-migrate");

    let settings = AppSettings::load()?;
    let resilience = settings.resilience();
    let connector = HttpConnector::new(&settings.api_url, &settings.auth_url, resilience.retry);
    let prompter = TerminalPrompter;
    let ctx = CommandContext {
        settings,
        connector: &connector,
        prompter: &prompter,
    };

    let ok = match cli.command {
        Commands::Hub(hub) => match hub.command {
            HubSubcommands::Clone(args) => {
                commands::hub::clone_command(cli.credentials.source()?, args, &ctx).await?
            }
        },
        Commands::Content(content) => match content.command {
            ContentSubcommands::Copy(args) => {
                commands::content::copy_command(CopyMode::Copy, &cli.credentials, args, &ctx).await?
            }
            ContentSubcommands::Move(args) => {
                commands::content::copy_command(CopyMode::Move, &cli.credentials, args, &ctx).await?
            }
        },
    };

    if !ok {
        error!("Command failed");
        eprintln!("{} Failed, see the action log for details", "✗".red());
        std::process::exit(1);
    }
    Ok(())
}
