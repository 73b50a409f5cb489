use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Credentials for one hub account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub hub_id: String,
}

/// Kinds of entity the tool knows how to move between hubs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Settings,
    Extension,
    Schema,
    ContentType,
    SearchIndex,
    Webhook,
    ContentItem,
    WorkflowState,
    Event,
    Edition,
    Slot,
    Snapshot,
}

impl EntityKind {
    pub const ALL: [EntityKind; 12] = [
        EntityKind::Settings,
        EntityKind::Extension,
        EntityKind::Schema,
        EntityKind::ContentType,
        EntityKind::SearchIndex,
        EntityKind::Webhook,
        EntityKind::ContentItem,
        EntityKind::WorkflowState,
        EntityKind::Event,
        EntityKind::Edition,
        EntityKind::Slot,
        EntityKind::Snapshot,
    ];

    /// Path segment of the REST collection for this kind
    pub fn path(self) -> &'static str {
        match self {
            EntityKind::Settings => "settings",
            EntityKind::Extension => "extensions",
            EntityKind::Schema => "content-type-schemas",
            EntityKind::ContentType => "content-types",
            EntityKind::SearchIndex => "search-indexes",
            EntityKind::Webhook => "webhooks",
            EntityKind::ContentItem => "content-items",
            EntityKind::WorkflowState => "workflow-states",
            EntityKind::Event => "events",
            EntityKind::Edition => "editions",
            EntityKind::Slot => "slots",
            EntityKind::Snapshot => "snapshots",
        }
    }

    /// Whether the hub keeps a version history for this kind
    pub fn is_versioned(self) -> bool {
        matches!(
            self,
            EntityKind::Schema | EntityKind::ContentType | EntityKind::ContentItem
        )
    }

    /// Whether entities of this kind can be archived. Entities that cannot
    /// are deleted instead when a creation is undone.
    pub fn is_archivable(self) -> bool {
        matches!(
            self,
            EntityKind::Schema
                | EntityKind::ContentType
                | EntityKind::ContentItem
                | EntityKind::Event
                | EntityKind::Edition
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Active,
    Archived,
}

/// An entity as returned by the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntity {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub version: Option<u64>,
    pub status: EntityStatus,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub body: Value,
}

impl RemoteEntity {
    pub fn is_archived(&self) -> bool {
        self.status == EntityStatus::Archived
    }

    pub fn version_or_zero(&self) -> u64 {
        self.version.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}
