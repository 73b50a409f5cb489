use super::{Step, StepId};
use crate::api::EntityKind;
use crate::handlers::{
    export_entities, import_entities, read_exported, FolderPathCache, ImportOptions,
};
use crate::pipeline::PipelineState;
use crate::revert::revert_group;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

const BACKUP_DIR: &str = "backup";
const EXPORT_DIR: &str = "export";

/// Hub settings and workflow states. Settings have no version history, so
/// the destination's settings are backed up before they are overwritten and
/// the backup is what a revert restores.
pub struct SettingsStep;

#[async_trait]
impl Step for SettingsStep {
    fn id(&self) -> StepId {
        StepId::Settings
    }

    async fn run(&self, state: &PipelineState<'_>) -> Result<bool> {
        let step_dir = state.step_dir(StepId::Settings);
        let backup = step_dir.join(BACKUP_DIR);
        let export = step_dir.join(EXPORT_DIR);

        let source = state.source().await?;
        let destination = state.destination().await?;

        // Keep the first backup: a rerun must not replace it with already
        // copied settings
        if read_exported(&backup, EntityKind::Settings)?.is_empty() {
            export_entities(
                destination.as_ref(),
                &[EntityKind::Settings],
                &backup,
                &state.log,
                &mut FolderPathCache::new(),
            )
            .await
            .context("Failed to back up destination settings")?;
            state
                .log
                .add_comment(format!("Destination settings backed up to {}", backup.display()));
        } else {
            info!("Keeping existing settings backup in {}", backup.display());
        }

        if export.exists() {
            std::fs::remove_dir_all(&export)
                .with_context(|| format!("Failed to clear {}", export.display()))?;
        }
        export_entities(
            source.as_ref(),
            StepId::Settings.kinds(),
            &export,
            &state.log,
            &mut FolderPathCache::new(),
        )
        .await?;

        import_entities(
            destination.as_ref(),
            StepId::Settings.kinds(),
            &export,
            &state.log,
            state.prompter,
            &state.import,
            &state.timeout,
        )
        .await
        .map(|report| report.success)
    }

    async fn revert(&self, state: &PipelineState<'_>) -> Result<bool> {
        let destination = state.destination().await?;
        let backup = state.step_dir(StepId::Settings).join(BACKUP_DIR);

        let mut ok = true;
        if read_exported(&backup, EntityKind::Settings)?.is_empty() {
            state.log.warn(format!(
                "No settings backup in {}, destination settings left as they are",
                backup.display()
            ));
        } else {
            let restore = ImportOptions {
                force: true,
                ..ImportOptions::default()
            };
            ok &= import_entities(
                destination.as_ref(),
                &[EntityKind::Settings],
                &backup,
                &state.log,
                state.prompter,
                &restore,
                &state.timeout,
            )
            .await?
            .success;
        }

        ok &= revert_group(
            destination.as_ref(),
            &[EntityKind::WorkflowState],
            state.revert_log()?,
            Some(self.name()),
            &state.log,
            state.prompter,
            &state.timeout,
        )
        .await?;
        Ok(ok)
    }
}
