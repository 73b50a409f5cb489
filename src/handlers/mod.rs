//! Export/import handlers
//!
//! Plain CRUD translators between a hub and a directory of JSON files. The
//! steps and the copy orchestrator drive them; every effect they have on a
//! destination hub is recorded in the action log.

pub mod export;
pub mod folders;
pub mod import;
pub mod references;

pub use export::{export_entities, kind_dir};
pub use folders::{DestinationFolders, FolderPathCache};
pub use import::{import_entities, ImportOptions};

use crate::api::EntityKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// One exported entity as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub version: Option<u64>,
    /// Folder names from the repository root; empty at the root
    #[serde(default)]
    pub folder_path: Vec<String>,
    pub body: Value,
}

/// What an export wrote, in export order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub exported: Vec<(EntityKind, String)>,
}

impl ExportReport {
    pub fn count(&self, kind: EntityKind) -> usize {
        self.exported.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.exported.iter().any(|(k, i)| *k == kind && i == id)
    }
}

/// What an import wrote, keyed by source entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// False when the import was refused, incomplete or any entity failed
    pub success: bool,
    /// Source entities now fully present at the destination
    pub imported: HashSet<(EntityKind, String)>,
}

impl ImportReport {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.imported.contains(&(kind, id.to_string()))
    }
}

/// Read back every exported entity of `kind` under `dir`, sorted by id.
/// A missing directory means nothing was exported.
pub fn read_exported(dir: &Path, kind: EntityKind) -> Result<Vec<ExportedEntity>> {
    let root = kind_dir(dir, kind);
    let mut entities = Vec::new();
    if root.exists() {
        collect_files(&root, &mut entities)?;
    }
    entities.retain(|e: &ExportedEntity| e.kind == kind);
    entities.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(entities)
}

fn collect_files(dir: &Path, out: &mut Vec<ExportedEntity>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read export file: {}", path.display()))?;
            let entity = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse export file: {}", path.display()))?;
            out.push(entity);
        }
    }
    Ok(())
}
