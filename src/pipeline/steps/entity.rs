use super::{Step, StepId};
use crate::handlers::{export_entities, import_entities, FolderPathCache};
use crate::pipeline::PipelineState;
use crate::revert::revert_group;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Export from the source and import into the destination for the kinds of
/// one step; revert replays the step's group of the revert log
pub struct EntityStep {
    id: StepId,
}

impl EntityStep {
    pub fn new(id: StepId) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Step for EntityStep {
    fn id(&self) -> StepId {
        self.id
    }

    async fn run(&self, state: &PipelineState<'_>) -> Result<bool> {
        let dir = state.step_dir(self.id);
        // Stale exports from an earlier run would be imported again
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to clear {}", dir.display()))?;
        }

        let source = state.source().await?;
        let destination = state.destination().await?;

        export_entities(
            source.as_ref(),
            self.id.kinds(),
            &dir,
            &state.log,
            &mut FolderPathCache::new(),
        )
        .await?;

        import_entities(
            destination.as_ref(),
            self.id.kinds(),
            &dir,
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
        revert_group(
            destination.as_ref(),
            self.id.kinds(),
            state.revert_log()?,
            Some(self.name()),
            &state.log,
            state.prompter,
            &state.timeout,
        )
        .await
    }
}
