//! The hub clone steps
//!
//! Order matters: types reference schemas, content references types, and
//! editions reference events. [`StepId::ALL`] is the only place the order is
//! defined.

mod content;
mod entity;
mod settings;

pub use content::ContentStep;
pub use entity::EntityStep;
pub use settings::SettingsStep;

use super::PipelineState;
use crate::api::EntityKind;
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Settings,
    Extension,
    Schema,
    Type,
    Index,
    Content,
    Event,
}

impl StepId {
    pub const ALL: [StepId; 7] = [
        StepId::Settings,
        StepId::Extension,
        StepId::Schema,
        StepId::Type,
        StepId::Index,
        StepId::Content,
        StepId::Event,
    ];

    /// Also the log group the step writes under
    pub fn name(self) -> &'static str {
        match self {
            StepId::Settings => "Clone Settings",
            StepId::Extension => "Clone Extensions",
            StepId::Schema => "Clone Schemas",
            StepId::Type => "Clone Content Types",
            StepId::Index => "Clone Indexes",
            StepId::Content => "Clone Content",
            StepId::Event => "Clone Events",
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            StepId::Settings => "settings",
            StepId::Extension => "extensions",
            StepId::Schema => "schemas",
            StepId::Type => "types",
            StepId::Index => "indexes",
            StepId::Content => "content",
            StepId::Event => "events",
        }
    }

    /// Events can't bring their snapshots along, so the operator has to opt in
    pub fn is_limited(self) -> bool {
        matches!(self, StepId::Event)
    }

    pub fn kinds(self) -> &'static [EntityKind] {
        match self {
            StepId::Settings => &[EntityKind::Settings, EntityKind::WorkflowState],
            StepId::Extension => &[EntityKind::Extension],
            StepId::Schema => &[EntityKind::Schema],
            StepId::Type => &[EntityKind::ContentType],
            StepId::Index => &[EntityKind::SearchIndex],
            StepId::Content => &[EntityKind::ContentItem],
            StepId::Event => &[EntityKind::Event, EntityKind::Edition],
        }
    }

    pub fn step(self) -> Box<dyn Step> {
        match self {
            StepId::Settings => Box::new(SettingsStep),
            StepId::Content => Box::new(ContentStep),
            id => Box::new(EntityStep::new(id)),
        }
    }
}

/// One revertible unit of the pipeline
#[async_trait]
pub trait Step: Send + Sync {
    fn id(&self) -> StepId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    fn is_limited(&self) -> bool {
        self.id().is_limited()
    }

    async fn run(&self, state: &PipelineState<'_>) -> Result<bool>;

    async fn revert(&self, state: &PipelineState<'_>) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order() {
        let names: Vec<_> = StepId::ALL.iter().map(|id| id.step().name()).collect();
        assert_eq!(
            names,
            vec![
                "Clone Settings",
                "Clone Extensions",
                "Clone Schemas",
                "Clone Content Types",
                "Clone Indexes",
                "Clone Content",
                "Clone Events"
            ]
        );
        assert!(StepId::ALL.iter().filter(|id| id.is_limited()).eq([StepId::Event].iter()));
    }
}
