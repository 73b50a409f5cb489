use super::constants::{self, headers};
use super::error::RemoteError;
use super::models::{EntityKind, Folder, RemoteEntity};
use super::resilience::{RetryConfig, RetryPolicy};
use super::HubApi;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct PageInfo {
    number: usize,
    #[serde(rename = "totalPages")]
    total_pages: usize,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: serde::de::DeserializeOwned")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    page: Option<PageInfo>,
}

/// Hub management API client over HTTP
#[derive(Clone)]
pub struct HubClient {
    base_url: String,
    hub_id: String,
    http_client: reqwest::Client,
    access_token: String,
    retry_policy: RetryPolicy,
}

impl HubClient {
    pub fn new(
        base_url: impl Into<String>,
        hub_id: impl Into<String>,
        access_token: impl Into<String>,
        retry_config: RetryConfig,
    ) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(constants::USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hub_id: hub_id.into(),
            http_client,
            access_token: access_token.into(),
            retry_policy: RetryPolicy::new(retry_config),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RemoteError> {
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// GET with backoff retries; reads are safe to repeat
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        self.retry_policy
            .execute(|| async {
                let response = self
                    .http_client
                    .get(url)
                    .bearer_auth(&self.access_token)
                    .header("Accept", headers::CONTENT_TYPE_JSON)
                    .query(query)
                    .send()
                    .await?;
                Self::read_json(response).await
            })
            .await
    }

    /// Every page of a collection
    async fn list_pages<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let mut page = 0;

        loop {
            let value = self
                .get_json(
                    url,
                    &[("page", page.to_string()), ("size", constants::PAGE_SIZE.to_string())],
                )
                .await?;
            let response: ListResponse<T> = Self::decode(value)?;
            items.extend(response.items);

            match response.page {
                Some(info) if info.number + 1 < info.total_pages => page = info.number + 1,
                _ => break,
            }
        }
        Ok(items)
    }

    /// Single-shot write. Never retried here: a timed-out write is resolved
    /// by the caller's completion check.
    async fn send_json(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header("Accept", headers::CONTENT_TYPE_JSON);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::read_json(request.send().await?).await
    }
}

#[async_trait]
impl HubApi for HubClient {
    fn hub_id(&self) -> &str {
        &self.hub_id
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<RemoteEntity>, RemoteError> {
        if kind == EntityKind::Settings {
            return Ok(vec![self.get(kind, &self.hub_id).await?]);
        }

        let url = constants::collection_endpoint(&self.base_url, &self.hub_id, kind);
        let entities: Vec<RemoteEntity> = self.list_pages(&url).await?;
        log::debug!("Listed {} {} from hub {}", entities.len(), kind, self.hub_id);
        Ok(entities)
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        let url = if kind == EntityKind::Settings {
            constants::settings_endpoint(&self.base_url, id)
        } else {
            constants::entity_endpoint(&self.base_url, kind, id)
        };
        Self::decode(self.get_json(&url, &[]).await?)
    }

    async fn get_version(
        &self,
        kind: EntityKind,
        id: &str,
        version: u64,
    ) -> Result<RemoteEntity, RemoteError> {
        let url = constants::version_endpoint(&self.base_url, kind, id, version);
        Self::decode(self.get_json(&url, &[]).await?)
    }

    async fn create(
        &self,
        kind: EntityKind,
        label: &str,
        folder_id: Option<&str>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError> {
        let url = constants::collection_endpoint(&self.base_url, &self.hub_id, kind);
        let payload = json!({ "label": label, "folderId": folder_id, "body": body });
        Self::decode(self.send_json(reqwest::Method::POST, &url, Some(&payload)).await?)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        version: Option<u64>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError> {
        let url = if kind == EntityKind::Settings {
            constants::settings_endpoint(&self.base_url, id)
        } else {
            constants::entity_endpoint(&self.base_url, kind, id)
        };
        let payload = json!({ "version": version, "body": body });
        Self::decode(self.send_json(reqwest::Method::PATCH, &url, Some(&payload)).await?)
    }

    async fn archive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        let url = constants::archive_endpoint(&self.base_url, kind, id);
        Self::decode(self.send_json(reqwest::Method::POST, &url, None).await?)
    }

    async fn unarchive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        let url = constants::unarchive_endpoint(&self.base_url, kind, id);
        Self::decode(self.send_json(reqwest::Method::POST, &url, None).await?)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        let url = constants::entity_endpoint(&self.base_url, kind, id);
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), message));
        }
        Ok(())
    }

    async fn get_folder(&self, id: &str) -> Result<Folder, RemoteError> {
        let url = constants::folder_endpoint(&self.base_url, id);
        Self::decode(self.get_json(&url, &[]).await?)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError> {
        let url = constants::folders_endpoint(&self.base_url, &self.hub_id);
        self.list_pages(&url).await
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, RemoteError> {
        let url = match parent_id {
            Some(parent) => constants::subfolders_endpoint(&self.base_url, parent),
            None => constants::folders_endpoint(&self.base_url, &self.hub_id),
        };
        let payload = json!({ "name": name });
        Self::decode(self.send_json(reqwest::Method::POST, &url, Some(&payload)).await?)
    }
}
