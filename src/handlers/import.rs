//! Import exported entities into a destination hub
//!
//! Entities already known to the mapping are updated in place, everything
//! else is created. Content links are rewritten to destination ids, so items
//! are imported after the items they link to; link cycles are broken by
//! creating the members first and patching their links afterwards.

use super::folders::DestinationFolders;
use super::references::{dependencies, rewrite};
use super::{read_exported, ExportedEntity, ImportReport};
use crate::action_log::{actions, ActionLog};
use crate::api::{EntityKind, FetchOutcome, HubApi, RemoteEntity, RemoteError, TimeoutRetry};
use crate::mapping::ContentMapping;
use crate::ui::{confirm_or_force, Prompter};
use anyhow::Result;
use log::{debug, info};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Overwrite existing destination entities without asking
    pub force: bool,
    /// Only report what would happen
    pub validate: bool,
    /// Skip entities whose references can't be resolved instead of failing
    pub skip_incomplete: bool,
    pub mapping_file: Option<PathBuf>,
}

type Key = (EntityKind, String);

#[derive(Debug)]
enum Plan {
    Create,
    Update { dest: RemoteEntity },
    /// Created earlier in this run with unresolved links; links still need
    /// pointing at their destination ids
    Patch { dest_id: String },
}

#[derive(Debug)]
struct Pending {
    entity: ExportedEntity,
    plan: Plan,
}

impl Pending {
    fn key(&self) -> Key {
        (self.entity.kind, self.entity.id.clone())
    }

    fn dependencies(&self) -> Vec<Key> {
        dependencies(self.entity.kind, &self.entity.body)
    }
}

/// Import every exported entity of `kinds` found under `dir` into `api`.
/// The report is unsuccessful when the import was refused, incomplete or
/// any entity failed; it lists the source entities that made it across.
/// The mapping file is saved even after a partial failure.
pub async fn import_entities(
    api: &dyn HubApi,
    kinds: &[EntityKind],
    dir: &Path,
    log: &ActionLog,
    prompter: &dyn Prompter,
    options: &ImportOptions,
    timeout: &TimeoutRetry,
) -> Result<ImportReport> {
    let mut mapping = ContentMapping::new();
    if let Some(path) = &options.mapping_file {
        mapping.load(path)?;
    }

    let mut importer = Importer::new(api, log, timeout, &mut mapping);
    let result = importer.import(kinds, dir, prompter, options).await;

    if let (Some(path), false) = (&options.mapping_file, options.validate) {
        if let Err(e) = mapping.save(path) {
            log.warn(format!("Failed to save mapping file {}: {:#}", path.display(), e));
        }
    }

    result
}

async fn plan_entity(
    api: &dyn HubApi,
    mapping: &ContentMapping,
    entity: &ExportedEntity,
) -> Result<Plan> {
    if entity.kind == EntityKind::Settings {
        return match api.fetch(EntityKind::Settings, api.hub_id()).await {
            FetchOutcome::Found(dest) => Ok(Plan::Update { dest }),
            FetchOutcome::NotFound => anyhow::bail!("Settings of hub {} not found", api.hub_id()),
            FetchOutcome::Failed(e) => Err(e.into()),
        };
    }

    let Some(dest_id) = mapping.get(entity.kind, &entity.id) else {
        return Ok(Plan::Create);
    };

    match api.fetch(entity.kind, dest_id).await {
        FetchOutcome::Found(dest) if !dest.is_archived() => Ok(Plan::Update { dest }),
        FetchOutcome::Found(_) => {
            debug!("Mapped {} {} is archived, creating a new one", entity.kind, dest_id);
            Ok(Plan::Create)
        }
        FetchOutcome::NotFound => {
            debug!("Mapped {} {} no longer exists, creating a new one", entity.kind, dest_id);
            Ok(Plan::Create)
        }
        FetchOutcome::Failed(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to fetch {} {} from destination", entity.kind, dest_id))),
    }
}

/// Entities that depend, directly or transitively, on something that is
/// neither mapped nor imported in this run
fn find_incomplete(pending: &[Pending], mapping: &ContentMapping) -> HashSet<Key> {
    let in_import: HashSet<Key> = pending.iter().map(Pending::key).collect();
    let mut incomplete = HashSet::new();

    loop {
        let mut changed = false;
        for p in pending {
            let key = p.key();
            if incomplete.contains(&key) {
                continue;
            }
            let missing = p.dependencies().into_iter().any(|dep| {
                mapping.get(dep.0, &dep.1).is_none()
                    && (!in_import.contains(&dep) || incomplete.contains(&dep))
            });
            if missing {
                incomplete.insert(key);
                changed = true;
            }
        }
        if !changed {
            return incomplete;
        }
    }
}

/// Find an entity this run created: it matches what we sent and its id was
/// not on the destination before
async fn find_created(
    api: &dyn HubApi,
    kind: EntityKind,
    label: &str,
    body: &Value,
    preexisting: &HashSet<String>,
) -> Result<Option<RemoteEntity>, RemoteError> {
    Ok(api.list(kind).await?.into_iter().find(|e| {
        !e.is_archived() && !preexisting.contains(&e.id) && e.label == label && &e.body == body
    }))
}

/// Wait for an update to become visible: the body matches what we sent
async fn find_updated(
    api: &dyn HubApi,
    kind: EntityKind,
    id: &str,
    body: &Value,
) -> Result<Option<RemoteEntity>, RemoteError> {
    let current = api.get(kind, id).await?;
    Ok((&current.body == body).then_some(current))
}

/// One import run against a destination hub
struct Importer<'a> {
    api: &'a dyn HubApi,
    log: &'a ActionLog,
    timeout: &'a TimeoutRetry,
    mapping: &'a mut ContentMapping,
    folders: DestinationFolders,
    /// Destination ids per kind that a timed-out create must not be
    /// confirmed against: everything present before the run plus what the
    /// run itself created
    taken_ids: HashMap<EntityKind, HashSet<String>>,
    imported: HashSet<Key>,
}

impl<'a> Importer<'a> {
    fn new(
        api: &'a dyn HubApi,
        log: &'a ActionLog,
        timeout: &'a TimeoutRetry,
        mapping: &'a mut ContentMapping,
    ) -> Self {
        Self {
            api,
            log,
            timeout,
            mapping,
            folders: DestinationFolders::new(),
            taken_ids: HashMap::new(),
            imported: HashSet::new(),
        }
    }

    fn report(&mut self, success: bool) -> ImportReport {
        ImportReport {
            success,
            imported: std::mem::take(&mut self.imported),
        }
    }

    async fn import(
        &mut self,
        kinds: &[EntityKind],
        dir: &Path,
        prompter: &dyn Prompter,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let (api, log) = (self.api, self.log);

        let mut entities = Vec::new();
        for &kind in kinds {
            entities.extend(read_exported(dir, kind)?);
        }

        if entities.is_empty() {
            log.append_line(format!("Nothing to import for {:?}", kinds));
            return Ok(self.report(true));
        }

        let mut pending = Vec::with_capacity(entities.len());
        for entity in entities {
            let plan = plan_entity(api, self.mapping, &entity).await?;
            pending.push(Pending { entity, plan });
        }

        let incomplete = find_incomplete(&pending, self.mapping);
        if !incomplete.is_empty() {
            if !options.skip_incomplete {
                log.error(format!(
                    "{} entities reference content that is neither mapped nor part of this \
                     import; rerun with --skip-incomplete to import the rest",
                    incomplete.len()
                ));
                for (kind, id) in &incomplete {
                    log.add_comment(format!("Incomplete: {} {}", kind, id));
                }
                return Ok(ImportReport::failed());
            }
            for (kind, id) in &incomplete {
                log.warn(format!("Skipping incomplete {} {}", kind, id));
            }
            pending.retain(|p| !incomplete.contains(&p.key()));
        }

        if options.validate {
            for p in &pending {
                match &p.plan {
                    Plan::Create => log.add_comment(format!(
                        "Would create {} '{}'",
                        p.entity.kind, p.entity.label
                    )),
                    Plan::Update { dest } => log.add_comment(format!(
                        "Would update {} '{}' ({})",
                        p.entity.kind, p.entity.label, dest.id
                    )),
                    Plan::Patch { .. } => {}
                }
            }
            log.append_line(format!("Validated {} entities, nothing written", pending.len()));
            return Ok(self.report(true));
        }

        let updates = pending
            .iter()
            .filter(|p| matches!(p.plan, Plan::Update { .. }))
            .count();
        if updates > 0 {
            let prompt = format!(
                "{} entities already exist on hub {} and will be overwritten. Continue?",
                updates,
                api.hub_id()
            );
            if !confirm_or_force(prompter, options.force, &prompt)? {
                log.error("Import cancelled: existing entities would be overwritten");
                return Ok(ImportReport::failed());
            }
        }

        log.append_line(format!("Importing {} entities into hub {}", pending.len(), api.hub_id()));
        let success = self.execute(pending).await;
        Ok(self.report(success))
    }

    async fn execute(&mut self, mut remaining: Vec<Pending>) -> bool {
        let mut failed: HashSet<Key> = HashSet::new();

        while !remaining.is_empty() {
            let mut ready = Vec::new();
            let mut blocked = Vec::new();

            for p in remaining {
                let deps = p.dependencies();
                if deps.iter().any(|dep| failed.contains(dep)) {
                    self.log.error(format!(
                        "Skipping {} {}: a referenced entity failed to import",
                        p.entity.kind, p.entity.id
                    ));
                    failed.insert(p.key());
                } else if deps.iter().all(|dep| self.mapping.get(dep.0, &dep.1).is_some()) {
                    ready.push(p);
                } else {
                    blocked.push(p);
                }
            }

            if ready.is_empty() && !blocked.is_empty() {
                // Only reference cycles are left: create their members with
                // unresolved links, then patch them on the next pass
                let (creates, others): (Vec<_>, Vec<_>) =
                    blocked.into_iter().partition(|p| matches!(p.plan, Plan::Create));
                if creates.is_empty() {
                    for p in &others {
                        self.log.error(format!(
                            "Could not order {} {} for import",
                            p.entity.kind, p.entity.id
                        ));
                    }
                    return false;
                }

                let mut next = others;
                for p in creates {
                    match self.create_entity(&p.entity).await {
                        Some(dest_id) => next.push(Pending {
                            entity: p.entity,
                            plan: Plan::Patch { dest_id },
                        }),
                        None => {
                            failed.insert(p.key());
                        }
                    }
                }
                remaining = next;
                continue;
            }

            for p in ready {
                let key = p.key();
                let ok = match p.plan {
                    Plan::Create => self.create_entity(&p.entity).await.is_some(),
                    Plan::Update { dest } => self.update_entity(&p.entity, dest).await,
                    Plan::Patch { dest_id } => self.patch_entity(&p.entity, &dest_id).await,
                };
                if ok {
                    self.imported.insert(key);
                } else {
                    failed.insert(key);
                }
            }
            remaining = blocked;
        }

        if failed.is_empty() {
            info!("Import into hub {} completed", self.api.hub_id());
            true
        } else {
            self.log.error(format!("{} entities failed to import", failed.len()));
            false
        }
    }

    async fn load_taken_ids(&mut self, kind: EntityKind) -> Result<(), RemoteError> {
        if !self.taken_ids.contains_key(&kind) {
            let ids = self.api.list(kind).await?.into_iter().map(|e| e.id).collect();
            self.taken_ids.insert(kind, ids);
        }
        Ok(())
    }

    async fn create_entity(&mut self, entity: &ExportedEntity) -> Option<String> {
        let (api, log, timeout) = (self.api, self.log, self.timeout);
        let kind = entity.kind;
        let label = entity.label.as_str();

        let folder_id = match self.folders.ensure(api, &entity.folder_path).await {
            Ok(folder_id) => folder_id,
            Err(e) => {
                log.error(format!(
                    "Failed to prepare folder '{}' for {} {}: {}",
                    entity.folder_path.join("/"),
                    kind,
                    entity.id,
                    e
                ));
                return None;
            }
        };
        if let Err(e) = self.load_taken_ids(kind).await {
            log.error(format!("Failed to list {} on hub {}: {}", kind, api.hub_id(), e));
            return None;
        }

        let body = rewrite(kind, &entity.body, self.mapping);
        let body = &body;
        let folder_id = folder_id.as_deref();
        let no_ids = HashSet::new();
        let taken = self.taken_ids.get(&kind).unwrap_or(&no_ids);

        let result = timeout
            .attempt(
                log,
                move || api.create(kind, label, folder_id, body),
                move || find_created(api, kind, label, body, taken),
            )
            .await;

        match result {
            Ok(created) => {
                log.add_action(actions::CREATE, created.id.as_str());
                self.mapping.register(kind, &entity.id, &created.id);
                self.taken_ids.entry(kind).or_default().insert(created.id.clone());
                Some(created.id)
            }
            Err(e) => {
                log.error(format!("Failed to create {} '{}' ({}): {}", kind, label, entity.id, e));
                None
            }
        }
    }

    async fn update_entity(&mut self, entity: &ExportedEntity, dest: RemoteEntity) -> bool {
        let (api, log, timeout) = (self.api, self.log, self.timeout);
        let kind = entity.kind;
        let body = rewrite(kind, &entity.body, self.mapping);
        let dest_id = dest.id.as_str();
        let old_version = dest.version_or_zero();

        let updated = if dest.body == body {
            debug!("{} {} is unchanged", kind, dest_id);
            dest.clone()
        } else {
            let body = &body;
            let result = timeout
                .attempt(
                    log,
                    move || api.update(kind, dest_id, dest.version, body),
                    move || find_updated(api, kind, dest_id, body),
                )
                .await;
            match result {
                Ok(updated) => updated,
                Err(e) => {
                    log.error(format!("Failed to update {} {}: {}", kind, dest_id, e));
                    return false;
                }
            }
        };

        if kind.is_versioned() {
            log.add_action(
                actions::UPDATE,
                format!("{} {} {}", dest_id, old_version, updated.version_or_zero()),
            );
        } else {
            log.add_comment(format!("Updated {} {}", kind, dest_id));
        }
        if kind != EntityKind::Settings {
            self.mapping.register(kind, &entity.id, dest_id);
        }
        true
    }

    async fn patch_entity(&mut self, entity: &ExportedEntity, dest_id: &str) -> bool {
        let (api, log, timeout) = (self.api, self.log, self.timeout);
        let kind = entity.kind;
        let body = rewrite(kind, &entity.body, self.mapping);
        let body = &body;

        let result = timeout
            .attempt(
                log,
                move || api.update(kind, dest_id, None, body),
                move || find_updated(api, kind, dest_id, body),
            )
            .await;

        match result {
            Ok(_) => {
                log.add_comment(format!("Linked references of {} {}", kind, dest_id));
                true
            }
            Err(e) => {
                log.error(format!("Failed to link references of {} {}: {}", kind, dest_id, e));
                false
            }
        }
    }
}
