use super::models::HubCredentials;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl TokenInfo {
    fn is_fresh(&self) -> bool {
        // Treat tokens that expire within a minute as stale
        self.expires_at > SystemTime::now() + Duration::from_secs(60)
    }
}

/// Obtains and caches OAuth2 client-credentials tokens, one per client id
pub struct AuthManager {
    auth_url: String,
    http_client: reqwest::Client,
    tokens: HashMap<String, TokenInfo>,
}

impl AuthManager {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            http_client: reqwest::Client::new(),
            tokens: HashMap::new(),
        }
    }

    /// Return a valid token for `credentials`, requesting one if needed
    pub async fn token(&mut self, credentials: &HubCredentials) -> anyhow::Result<String> {
        if let Some(token) = self.tokens.get(&credentials.client_id) {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.authenticate(credentials).await?;
        let access_token = token.access_token.clone();
        self.tokens.insert(credentials.client_id.clone(), token);
        Ok(access_token)
    }

    async fn authenticate(&self, credentials: &HubCredentials) -> anyhow::Result<TokenInfo> {
        log::info!(
            "Authenticating client {} for hub {}",
            credentials.client_id,
            credentials.hub_id
        );

        let response = self
            .http_client
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        log::debug!("Token request status: {}", response.status());

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Authentication failed: {}", error_text)
        }

        let token_data: serde_json::Value = response.json().await?;
        let access_token = token_data
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("No access token in response"))?;

        // Default to 5 minutes if the server doesn't say
        let expires_in = token_data
            .get("expires_in")
            .and_then(|e| e.as_u64())
            .unwrap_or(300);

        log::info!("Authenticated client {}", credentials.client_id);

        Ok(TokenInfo {
            access_token: access_token.to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(expires_in),
        })
    }
}
