//! Turns credentials into a live [`HubApi`]

use super::auth::AuthManager;
use super::client::HubClient;
use super::memory::MemoryHub;
use super::models::HubCredentials;
use super::resilience::RetryConfig;
use super::HubApi;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait HubConnector: Send + Sync {
    async fn connect(&self, credentials: &HubCredentials) -> anyhow::Result<Arc<dyn HubApi>>;
}

/// Connects to the real service over HTTP
pub struct HttpConnector {
    api_url: String,
    retry: RetryConfig,
    auth: Mutex<AuthManager>,
}

impl HttpConnector {
    pub fn new(
        api_url: impl Into<String>,
        auth_url: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            retry,
            auth: Mutex::new(AuthManager::new(auth_url)),
        }
    }
}

#[async_trait]
impl HubConnector for HttpConnector {
    async fn connect(&self, credentials: &HubCredentials) -> anyhow::Result<Arc<dyn HubApi>> {
        let token = self
            .auth
            .lock()
            .await
            .token(credentials)
            .await
            .with_context(|| format!("Failed to authenticate for hub {}", credentials.hub_id))?;

        let client: Arc<dyn HubApi> = Arc::new(HubClient::new(
            &self.api_url,
            &credentials.hub_id,
            token,
            self.retry.clone(),
        )?);
        Ok(client)
    }
}

/// Resolves hub ids to in-memory hubs
#[derive(Default, Clone)]
pub struct MemoryConnector {
    hubs: HashMap<String, Arc<MemoryHub>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hub(mut self, hub: Arc<MemoryHub>) -> Self {
        self.hubs.insert(hub.hub_id().to_string(), hub);
        self
    }
}

#[async_trait]
impl HubConnector for MemoryConnector {
    async fn connect(&self, credentials: &HubCredentials) -> anyhow::Result<Arc<dyn HubApi>> {
        let hub: Arc<dyn HubApi> = self
            .hubs
            .get(&credentials.hub_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown hub '{}'", credentials.hub_id))?;
        Ok(hub)
    }
}
