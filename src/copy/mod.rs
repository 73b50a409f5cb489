//! Copy and move between hubs
//!
//! A copy exports the source into a private scratch directory and imports it
//! into the destination. A move is a copy followed by archiving the source
//! entities the import confirmed, and only once the copy has succeeded, so
//! an interrupted move always leaves the content on at least one side.

use crate::action_log::{actions, ActionLog};
use crate::api::{
    EntityKind, FetchOutcome, HubApi, HubConnector, HubCredentials, RemoteEntity, RemoteError,
    TimeoutRetry,
};
use crate::config::{CopyConfig, DestinationOverrides};
use crate::handlers::{
    export_entities, import_entities, ExportReport, FolderPathCache, ImportOptions, ImportReport,
};
use crate::revert::{archived_state, locate, revert_group};
use crate::ui::Prompter;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    Copy,
    Move,
}

impl CopyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CopyMode::Copy => "copy",
            CopyMode::Move => "move",
        }
    }
}

/// Where the credentials of a copy come from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Inline(CopyConfig),
    /// A config file that must load
    File(PathBuf),
    /// Built from command line values; written to `save_to` if nothing exists there yet
    Arguments {
        source: HubCredentials,
        overrides: DestinationOverrides,
        save_to: Option<PathBuf>,
    },
}

impl ConfigSource {
    pub fn resolve(self, log: &ActionLog) -> Result<CopyConfig> {
        match self {
            ConfigSource::Inline(config) => Ok(config),
            ConfigSource::File(path) => CopyConfig::load(&path)
                .with_context(|| format!("Failed to load copy config {}", path.display())),
            ConfigSource::Arguments {
                source,
                overrides,
                save_to,
            } => {
                let config = CopyConfig::from_arguments(&source, &overrides);
                if let Some(path) = save_to.filter(|p| !p.exists()) {
                    match config.save(&path) {
                        Ok(()) => {
                            log.add_comment(format!("Saved copy config to {}", path.display()))
                        }
                        Err(e) => log.warn(format!(
                            "Could not save copy config {}: {}",
                            path.display(),
                            e
                        )),
                    }
                }
                Ok(config)
            }
        }
    }
}

/// A previously written log to undo instead of copying
#[derive(Debug, Clone)]
pub struct RevertInput {
    pub log: ActionLog,
    /// Only replay this group; every group when `None`
    pub group: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub mode: CopyMode,
    pub config: ConfigSource,
    pub kinds: Vec<EntityKind>,
    pub import: ImportOptions,
    pub revert: Option<RevertInput>,
}

/// Scratch directory removed when dropped, whatever the outcome
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("hub-copy-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create scratch directory {}", path.display()))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to remove scratch directory {}: {}", self.path.display(), e);
        }
    }
}

pub struct CopyOrchestrator<'a> {
    connector: &'a dyn HubConnector,
    prompter: &'a dyn Prompter,
    timeout: TimeoutRetry,
    log: ActionLog,
}

impl<'a> CopyOrchestrator<'a> {
    pub fn new(
        connector: &'a dyn HubConnector,
        prompter: &'a dyn Prompter,
        log: ActionLog,
    ) -> Self {
        Self {
            connector,
            prompter,
            timeout: TimeoutRetry::default(),
            log,
        }
    }

    pub fn with_timeout(mut self, timeout: TimeoutRetry) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Copy, move or revert as `request` says. `Ok(false)` is a reported
    /// failure; `Err` means the run couldn't start or was cut short.
    pub async fn run(&self, request: CopyRequest) -> Result<bool> {
        let _session = self.log.session();

        let config = request.config.resolve(&self.log)?;

        if let Some(revert) = &request.revert {
            return self.revert(&config, request.mode, &request.kinds, revert).await;
        }

        let source = self.connector.connect(&config.source()).await?;
        let destination = self.connector.connect(&config.destination()).await?;

        let (exported, imported) = self
            .copy(source.as_ref(), destination.as_ref(), &request.kinds, &request.import)
            .await?;
        if !imported.success {
            self.log.error(format!(
                "Copy from hub {} to hub {} did not complete",
                source.hub_id(),
                destination.hub_id()
            ));
            return Ok(false);
        }

        if request.mode == CopyMode::Move && !request.import.validate {
            return Ok(self.archive_moved(source.as_ref(), &exported, &imported).await);
        }
        Ok(true)
    }

    async fn copy(
        &self,
        source: &dyn HubApi,
        destination: &dyn HubApi,
        kinds: &[EntityKind],
        options: &ImportOptions,
    ) -> Result<(ExportReport, ImportReport)> {
        let scratch = ScratchDir::create()?;
        debug!("Copying through {}", scratch.path().display());

        let mut folders = FolderPathCache::new();
        let exported =
            export_entities(source, kinds, scratch.path(), &self.log, &mut folders).await?;
        let imported = import_entities(
            destination,
            kinds,
            scratch.path(),
            &self.log,
            self.prompter,
            options,
            &self.timeout,
        )
        .await?;
        Ok((exported, imported))
    }

    /// Archive the exported source entities that are now at the destination,
    /// logging `MOVED` for each one that is confirmed archived. Anything the
    /// import skipped stays active at the source.
    async fn archive_moved(
        &self,
        source: &dyn HubApi,
        exported: &ExportReport,
        imported: &ImportReport,
    ) -> bool {
        let mut all_archived = true;
        for (kind, id) in &exported.exported {
            let (kind, id) = (*kind, id.as_str());
            if !imported.contains(kind, id) {
                self.log.warn(format!("{} {} was not copied, leaving it at the source", kind, id));
                continue;
            }
            let result = self
                .timeout
                .attempt(
                    &self.log,
                    move || source.archive(kind, id),
                    move || archived_state(source, kind, id),
                )
                .await;
            match result {
                Ok(_) => self.log.add_action(actions::MOVED, id),
                Err(e) => {
                    self.log.error(format!("Failed to archive source {} {}: {}", kind, id, e));
                    all_archived = false;
                }
            }
        }
        info!(
            "Archived {} of {} exported entities",
            self.log.get_data(actions::MOVED, Some(&self.log.current_group())).len(),
            exported.exported.len()
        );
        all_archived
    }

    async fn revert(
        &self,
        config: &CopyConfig,
        mode: CopyMode,
        kinds: &[EntityKind],
        revert: &RevertInput,
    ) -> Result<bool> {
        let group = revert.group.as_deref();
        let mut ok = true;

        // Restore the source first so the content stays reachable
        if mode == CopyMode::Move {
            let source = self.connector.connect(&config.source()).await?;
            ok &= self.unarchive_moved(source.as_ref(), kinds, &revert.log, group).await;
        }

        let destination = self.connector.connect(&config.destination()).await?;
        ok &= revert_group(
            destination.as_ref(),
            kinds,
            &revert.log,
            group,
            &self.log,
            self.prompter,
            &self.timeout,
        )
        .await?;
        Ok(ok)
    }

    async fn unarchive_moved(
        &self,
        source: &dyn HubApi,
        kinds: &[EntityKind],
        revert_log: &ActionLog,
        group: Option<&str>,
    ) -> bool {
        let mut ok = true;
        for id in revert_log.get_data(actions::MOVED, group) {
            let kind = match locate(source, kinds, &id).await {
                FetchOutcome::Found((kind, entity)) if entity.is_archived() => kind,
                FetchOutcome::Found(_) => {
                    self.log.warn(format!("Moved entity {} is already active, skipping", id));
                    continue;
                }
                FetchOutcome::NotFound => {
                    self.log.warn(format!("Moved entity {} not found, skipping", id));
                    continue;
                }
                FetchOutcome::Failed(e) => {
                    self.log.warn(format!("Could not fetch moved entity {}: {}", id, e));
                    continue;
                }
            };

            let id = id.as_str();
            let result = self
                .timeout
                .attempt(
                    &self.log,
                    move || source.unarchive(kind, id),
                    move || active_state(source, kind, id),
                )
                .await;
            match result {
                Ok(_) => self.log.add_action(actions::UNARCHIVE, id),
                Err(e) => {
                    self.log.error(format!("Failed to unarchive {} {}: {}", kind, id, e));
                    ok = false;
                }
            }
        }
        ok
    }
}

async fn active_state(
    api: &dyn HubApi,
    kind: EntityKind,
    id: &str,
) -> Result<Option<RemoteEntity>, RemoteError> {
    let current = api.get(kind, id).await?;
    Ok((!current.is_archived()).then_some(current))
}
