//! Endpoints and headers for the hub management API

use super::models::EntityKind;

/// Page size used when listing collections
pub const PAGE_SIZE: usize = 100;

pub const USER_AGENT: &str = "hub-migrate/0.1";

pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
}

fn encode(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Collection of `kind` inside a hub
pub fn collection_endpoint(base_url: &str, hub_id: &str, kind: EntityKind) -> String {
    format!("{}/hubs/{}/{}", base_url, encode(hub_id), kind.path())
}

/// Settings live on the hub resource itself
pub fn settings_endpoint(base_url: &str, hub_id: &str) -> String {
    format!("{}/hubs/{}/settings", base_url, encode(hub_id))
}

pub fn entity_endpoint(base_url: &str, kind: EntityKind, id: &str) -> String {
    format!("{}/{}/{}", base_url, kind.path(), encode(id))
}

pub fn version_endpoint(base_url: &str, kind: EntityKind, id: &str, version: u64) -> String {
    format!("{}/versions/{}", entity_endpoint(base_url, kind, id), version)
}

pub fn archive_endpoint(base_url: &str, kind: EntityKind, id: &str) -> String {
    format!("{}/archive", entity_endpoint(base_url, kind, id))
}

pub fn unarchive_endpoint(base_url: &str, kind: EntityKind, id: &str) -> String {
    format!("{}/unarchive", entity_endpoint(base_url, kind, id))
}

pub fn folder_endpoint(base_url: &str, id: &str) -> String {
    format!("{}/folders/{}", base_url, encode(id))
}

pub fn folders_endpoint(base_url: &str, hub_id: &str) -> String {
    format!("{}/hubs/{}/folders", base_url, encode(hub_id))
}

pub fn subfolders_endpoint(base_url: &str, parent_id: &str) -> String {
    format!("{}/folders", folder_endpoint(base_url, parent_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let base = "https://api.example/v2/content";
        assert_eq!(
            collection_endpoint(base, "hub1", EntityKind::ContentItem),
            "https://api.example/v2/content/hubs/hub1/content-items"
        );
        assert_eq!(
            version_endpoint(base, EntityKind::Schema, "https://schema/x", 2),
            format!(
                "{}/content-type-schemas/{}/versions/2",
                base, "https%3A%2F%2Fschema%2Fx"
            )
        );
        assert_eq!(
            unarchive_endpoint(base, EntityKind::Event, "e1"),
            "https://api.example/v2/content/events/e1/unarchive"
        );
    }
}
