use super::CommandContext;
use crate::action_log::ActionLog;
use crate::api::HubCredentials;
use crate::cli::commands::CloneArgs;
use crate::config::{CopyConfig, DestinationOverrides};
use crate::pipeline::{Pipeline, PipelineState, RunOptions};
use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

/// Clone one hub into another, or revert an earlier clone
///
/// # Returns
/// * `Ok(true)` - Every attempted step succeeded
/// * `Ok(false)` - A step failed; the log says where to resume
/// * `Err(anyhow::Error)` - The run could not be set up
pub async fn clone_command(
    source: HubCredentials,
    args: CloneArgs,
    ctx: &CommandContext<'_>,
) -> Result<bool> {
    let pipeline = Pipeline::hub_clone();
    if args.step >= pipeline.steps().len() {
        anyhow::bail!(
            "--step {} is out of range (0 to {})",
            args.step,
            pipeline.steps().len() - 1
        );
    }

    let action = if args.revert_log.is_some() { "revert" } else { "clone" };
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| ctx.settings.default_log_path("hub", action));
    let title = format!("hub-migrate hub {} {}", action, source.hub_id);
    let log = ActionLog::at_path(title, &log_path);

    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("Failed to create working directory {}", args.dir.display()))?;

    let overrides: DestinationOverrides = args.destination.clone().into();
    let destination = CopyConfig::from_arguments(&source, &overrides).destination();
    info!("Hub {} from {} to {}", action, source.hub_id, destination.hub_id);

    let mut state = PipelineState {
        from: source,
        to: destination,
        working_directory: args.dir.clone(),
        log,
        revert_log: None,
        import: args.import.clone().into(),
        connector: ctx.connector,
        prompter: ctx.prompter,
        timeout: ctx.settings.resilience().timeout,
    };
    let options = RunOptions {
        start_step: args.step,
        accept_limits: args.accept_snapshot_limits,
    };

    let ok = match &args.revert_log {
        Some(revert_log) => pipeline.revert(&mut state, revert_log, &options).await,
        None => pipeline.run(&state, &options).await,
    };

    println!("{} Log written to {}", "ℹ".blue(), log_path.display());
    Ok(ok)
}
