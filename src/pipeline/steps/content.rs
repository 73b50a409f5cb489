use super::{Step, StepId};
use crate::config::CopyConfig;
use crate::copy::{ConfigSource, CopyMode, CopyOrchestrator, CopyRequest, RevertInput};
use crate::pipeline::PipelineState;
use anyhow::Result;
use async_trait::async_trait;

/// Content items, copied through the copy orchestrator
pub struct ContentStep;

impl ContentStep {
    fn request(&self, state: &PipelineState<'_>, revert: Option<RevertInput>) -> CopyRequest {
        CopyRequest {
            mode: CopyMode::Copy,
            config: ConfigSource::Inline(CopyConfig::between(&state.from, &state.to)),
            kinds: StepId::Content.kinds().to_vec(),
            import: state.import.clone(),
            revert,
        }
    }

    fn orchestrator<'a>(&self, state: &PipelineState<'a>) -> CopyOrchestrator<'a> {
        CopyOrchestrator::new(state.connector, state.prompter, state.log.clone())
            .with_timeout(state.timeout.clone())
    }
}

#[async_trait]
impl Step for ContentStep {
    fn id(&self) -> StepId {
        StepId::Content
    }

    async fn run(&self, state: &PipelineState<'_>) -> Result<bool> {
        self.orchestrator(state).run(self.request(state, None)).await
    }

    async fn revert(&self, state: &PipelineState<'_>) -> Result<bool> {
        let revert = RevertInput {
            log: state.revert_log()?.clone(),
            group: Some(self.name().to_string()),
        };
        self.orchestrator(state).run(self.request(state, Some(revert))).await
    }
}
