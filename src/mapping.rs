//! Source → destination id table, persisted between runs
//!
//! Lets a repeated clone update what an earlier run created instead of
//! creating it again. Entries are only ever added.

use crate::api::EntityKind;
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Field name used for a kind in the mapping file
fn field_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Settings => "settings",
        EntityKind::Extension => "extensions",
        EntityKind::Schema => "schemas",
        EntityKind::ContentType => "contentTypes",
        EntityKind::SearchIndex => "indexes",
        EntityKind::Webhook => "webhooks",
        EntityKind::ContentItem => "contentItems",
        EntityKind::WorkflowState => "workflowStates",
        EntityKind::Event => "events",
        EntityKind::Edition => "editions",
        EntityKind::Slot => "slots",
        EntityKind::Snapshot => "snapshots",
    }
}

fn kind_for_field(name: &str) -> Option<EntityKind> {
    EntityKind::ALL.into_iter().find(|kind| field_name(*kind) == name)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContentMapping {
    tables: HashMap<EntityKind, HashMap<String, String>>,
}

impl ContentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EntityKind, source_id: &str) -> Option<&str> {
        self.tables
            .get(&kind)
            .and_then(|table| table.get(source_id))
            .map(String::as_str)
    }

    /// Record that `source_id` now lives at `dest_id`
    pub fn register(&mut self, kind: EntityKind, source_id: &str, dest_id: &str) {
        self.tables
            .entry(kind)
            .or_default()
            .insert(source_id.to_string(), dest_id.to_string());
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(HashMap::is_empty)
    }

    /// Load from `path`. Returns `Ok(false)` and leaves the mapping untouched
    /// when the file does not exist.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No mapping file at {}, starting empty", path.display());
            return Ok(false);
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
        let raw: BTreeMap<String, Vec<(String, String)>> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse mapping file: {}", path.display()))?;

        for (field, pairs) in raw {
            let Some(kind) = kind_for_field(&field) else {
                debug!("Ignoring unknown mapping field '{}'", field);
                continue;
            };
            for (source, dest) in pairs {
                self.register(kind, &source, &dest);
            }
        }

        info!("Loaded mapping from {}", path.display());
        Ok(true)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut raw: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for kind in EntityKind::ALL {
            let mut pairs: Vec<(&str, &str)> = self
                .tables
                .get(&kind)
                .map(|table| table.iter().map(|(s, d)| (s.as_str(), d.as_str())).collect())
                .unwrap_or_default();
            pairs.sort();
            raw.insert(field_name(kind), pairs);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let text = serde_json::to_string_pretty(&raw)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write mapping file: {}", path.display()))?;
        info!("Saved mapping to {}", path.display());
        Ok(())
    }
}
