use super::CommandContext;
use crate::action_log::ActionLog;
use crate::api::EntityKind;
use crate::cli::commands::CopyArgs;
use crate::cli::CredentialArgs;
use crate::copy::{ConfigSource, CopyMode, CopyOrchestrator, CopyRequest, RevertInput};
use anyhow::Result;
use colored::Colorize;

/// Copy or move content items between hubs, or revert an earlier copy/move
pub async fn copy_command(
    mode: CopyMode,
    credentials: &CredentialArgs,
    args: CopyArgs,
    ctx: &CommandContext<'_>,
) -> Result<bool> {
    let action = if args.revert_log.is_some() {
        format!("{}-revert", mode.as_str())
    } else {
        mode.as_str().to_string()
    };
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| ctx.settings.default_log_path("content", &action));
    let log = ActionLog::at_path(format!("hub-migrate content {}", action), &log_path);
    let session = log.session();

    let config = match args.config {
        Some(path) if path.exists() => ConfigSource::File(path),
        Some(path) => ConfigSource::Arguments {
            source: credentials.source()?,
            overrides: args.destination.into(),
            save_to: Some(path),
        },
        // Keep the synthesised config next to the log so the run can be repeated
        None => ConfigSource::Arguments {
            source: credentials.source()?,
            overrides: args.destination.into(),
            save_to: Some(log_path.with_extension("json")),
        },
    };

    let revert = match &args.revert_log {
        Some(path) => match ActionLog::load_from_file(path) {
            Ok(revert_log) => Some(RevertInput {
                log: revert_log,
                group: None,
            }),
            Err(e) => {
                log.error(format!("Could not load revert log {}: {:#}", path.display(), e));
                println!("{} Could not load revert log: {:#}", "✗".red(), e);
                return Ok(false);
            }
        },
        None => None,
    };

    let orchestrator = CopyOrchestrator::new(ctx.connector, ctx.prompter, log.clone())
        .with_timeout(ctx.settings.resilience().timeout);
    let result = orchestrator
        .run(CopyRequest {
            mode,
            config,
            kinds: vec![EntityKind::ContentItem],
            import: args.import.into(),
            revert,
        })
        .await;

    let ok = match result {
        Ok(ok) => ok,
        Err(e) => {
            log.error(format!("{:#}", e));
            false
        }
    };
    session.release(true);

    let marker = if ok { "✓".green() } else { "✗".red() };
    println!("{} content {} finished. Log written to {}", marker, action, log_path.display());
    Ok(ok)
}
