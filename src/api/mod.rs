//! Remote content hub API
//!
//! The rest of the crate talks to a hub only through the [`HubApi`] trait.
//! [`HubClient`] implements it over HTTP, [`MemoryHub`] keeps everything in
//! process for tests and dry experiments.

pub mod auth;
pub mod client;
pub mod connector;
pub mod constants;
pub mod error;
pub mod memory;
pub mod models;
pub mod resilience;

pub use auth::AuthManager;
pub use client::HubClient;
pub use connector::{HttpConnector, HubConnector, MemoryConnector};
pub use error::{FetchOutcome, RemoteError};
pub use memory::{Fault, MemoryHub, Op};
pub use models::{EntityKind, EntityStatus, Folder, HubCredentials, RemoteEntity};
pub use resilience::{ResilienceConfig, RetryConfig, RetryPolicy, RetryableError, TimeoutRetry};

use async_trait::async_trait;
use serde_json::Value;

/// Operations the migration core needs from a hub
#[async_trait]
pub trait HubApi: Send + Sync {
    /// Hub this client is bound to
    fn hub_id(&self) -> &str;

    async fn list(&self, kind: EntityKind) -> Result<Vec<RemoteEntity>, RemoteError>;

    async fn get(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError>;

    /// Fetch a historical version of an entity
    async fn get_version(
        &self,
        kind: EntityKind,
        id: &str,
        version: u64,
    ) -> Result<RemoteEntity, RemoteError>;

    async fn create(
        &self,
        kind: EntityKind,
        label: &str,
        folder_id: Option<&str>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError>;

    /// Replace the body of an entity. `version` is the version the caller
    /// believes is current; versioned kinds reject stale updates.
    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        version: Option<u64>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError>;

    async fn archive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError>;

    async fn unarchive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError>;

    async fn get_folder(&self, id: &str) -> Result<Folder, RemoteError>;

    /// Every folder of the hub's content repository
    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError>;

    /// Create a folder under `parent_id`, or at the repository root
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, RemoteError>;

    /// Fetch an entity, classifying "not found" separately from failures
    async fn fetch(&self, kind: EntityKind, id: &str) -> FetchOutcome<RemoteEntity> {
        FetchOutcome::from_result(self.get(kind, id).await)
    }
}
