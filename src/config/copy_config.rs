//! Source and destination credentials for a copy or move

use crate::api::HubCredentials;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on copy config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid copy config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("copy config is missing '{0}'")]
    Incomplete(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyConfig {
    pub src_hub_id: String,
    pub src_client_id: String,
    pub src_secret: String,
    pub dst_hub_id: String,
    pub dst_client_id: String,
    pub dst_secret: String,
}

/// Destination values given on the command line; each falls back to the
/// matching source value
#[derive(Debug, Clone, Default)]
pub struct DestinationOverrides {
    pub hub_id: Option<String>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
}

impl CopyConfig {
    pub fn from_arguments(source: &HubCredentials, destination: &DestinationOverrides) -> Self {
        Self {
            src_hub_id: source.hub_id.clone(),
            src_client_id: source.client_id.clone(),
            src_secret: source.client_secret.clone(),
            dst_hub_id: destination
                .hub_id
                .clone()
                .unwrap_or_else(|| source.hub_id.clone()),
            dst_client_id: destination
                .client_id
                .clone()
                .unwrap_or_else(|| source.client_id.clone()),
            dst_secret: destination
                .secret
                .clone()
                .unwrap_or_else(|| source.client_secret.clone()),
        }
    }

    pub fn between(source: &HubCredentials, destination: &HubCredentials) -> Self {
        Self {
            src_hub_id: source.hub_id.clone(),
            src_client_id: source.client_id.clone(),
            src_secret: source.client_secret.clone(),
            dst_hub_id: destination.hub_id.clone(),
            dst_client_id: destination.client_id.clone(),
            dst_secret: destination.client_secret.clone(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: CopyConfig = serde_json::from_str(&text)?;
        config.validate()?;
        info!("Loaded copy config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved copy config to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("srcHubId", &self.src_hub_id),
            ("srcClientId", &self.src_client_id),
            ("srcSecret", &self.src_secret),
            ("dstHubId", &self.dst_hub_id),
            ("dstClientId", &self.dst_client_id),
            ("dstSecret", &self.dst_secret),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(ConfigError::Incomplete(name)),
            None => Ok(()),
        }
    }

    pub fn source(&self) -> HubCredentials {
        HubCredentials {
            client_id: self.src_client_id.clone(),
            client_secret: self.src_secret.clone(),
            hub_id: self.src_hub_id.clone(),
        }
    }

    pub fn destination(&self) -> HubCredentials {
        HubCredentials {
            client_id: self.dst_client_id.clone(),
            client_secret: self.dst_secret.clone(),
            hub_id: self.dst_hub_id.clone(),
        }
    }
}
