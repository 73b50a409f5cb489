//! Export entities from a hub into a directory of JSON files

use super::folders::{sanitize, FolderPathCache};
use super::{ExportReport, ExportedEntity};
use crate::action_log::ActionLog;
use crate::api::{EntityKind, HubApi};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory holding the exported files of one kind
pub fn kind_dir(dir: &Path, kind: EntityKind) -> PathBuf {
    dir.join(kind.path())
}

/// Write every active entity of `kinds` under `dir`. Content items are
/// placed under their folder path, which is also recorded in the file so
/// an import can recreate it; `folders` is owned by this run.
pub async fn export_entities(
    api: &dyn HubApi,
    kinds: &[EntityKind],
    dir: &Path,
    log: &ActionLog,
    folders: &mut FolderPathCache,
) -> Result<ExportReport> {
    let mut report = ExportReport::default();

    for &kind in kinds {
        let entities = api
            .list(kind)
            .await
            .with_context(|| format!("Failed to list {} on hub {}", kind, api.hub_id()))?;

        let mut skipped = 0;
        for entity in entities {
            if entity.is_archived() {
                skipped += 1;
                continue;
            }

            let mut target = kind_dir(dir, kind);
            let mut folder_path = Vec::new();
            if let Some(folder_id) = entity.folder_id.as_deref() {
                match folders.resolve(api, folder_id).await {
                    Ok(names) => {
                        target.extend(names.iter().map(|name| sanitize(name)));
                        folder_path = names;
                    }
                    Err(e) => {
                        log.warn(format!(
                            "Could not resolve folder {} for {} {}: {}",
                            folder_id, kind, entity.id, e
                        ));
                    }
                }
            }

            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
            let file = target.join(format!("{}.json", sanitize(&entity.id)));

            let exported = ExportedEntity {
                kind,
                id: entity.id.clone(),
                label: entity.label.clone(),
                version: entity.version,
                folder_path,
                body: entity.body.clone(),
            };
            std::fs::write(&file, serde_json::to_string_pretty(&exported)?)
                .with_context(|| format!("Failed to write export file: {}", file.display()))?;

            report.exported.push((kind, entity.id));
        }

        let count = report.count(kind);
        log.append_line(format!(
            "Exported {} {} from hub {} ({} archived skipped)",
            count,
            kind,
            api.hub_id(),
            skipped
        ));
    }

    Ok(report)
}
