//! Undo what a previous run recorded in its action log
//!
//! `CREATE <id>` entries are undone by archiving the entity (or deleting it
//! when its kind can't be archived). `UPDATE <id> <old> <new>` entries are
//! undone by writing version `old` back. If an updated entity changed again
//! after the run, the operator has to confirm before anything is touched.

use crate::action_log::{actions, ActionLog};
use crate::api::{EntityKind, FetchOutcome, HubApi, RemoteEntity, RemoteError, TimeoutRetry};
use crate::ui::Prompter;
use anyhow::Result;
use colored::Colorize;
use log::debug;

/// One parsed `UPDATE` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub id: String,
    pub old_version: u64,
    pub new_version: u64,
}

impl UpdateRecord {
    /// `None` for payloads that aren't `<id> <old> <new>`
    pub fn parse(payload: &str) -> Option<Self> {
        let mut fields = payload.split_whitespace();
        let id = fields.next()?;
        let old_version = fields.next()?.parse().ok()?;
        let new_version = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            old_version,
            new_version,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.old_version == self.new_version
    }
}

/// Counters for what a revert did, mostly for the log summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertSummary {
    pub archived: usize,
    pub deleted: usize,
    pub downgraded: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

struct Downgrade {
    kind: EntityKind,
    record: UpdateRecord,
    current: RemoteEntity,
}

/// Find which of `kinds` an id belongs to
pub(crate) async fn locate(
    api: &dyn HubApi,
    kinds: &[EntityKind],
    id: &str,
) -> FetchOutcome<(EntityKind, RemoteEntity)> {
    for &kind in kinds {
        match api.fetch(kind, id).await {
            FetchOutcome::Found(entity) => return FetchOutcome::Found((kind, entity)),
            FetchOutcome::NotFound => continue,
            FetchOutcome::Failed(e) => return FetchOutcome::Failed(e),
        }
    }
    FetchOutcome::NotFound
}

/// Revert the actions `revert_log` recorded under `group` (every group when
/// `None`) for entities of `kinds`. Returns `Ok(false)` when the operator
/// declined or any entity could not be reverted.
pub async fn revert_group(
    api: &dyn HubApi,
    kinds: &[EntityKind],
    revert_log: &ActionLog,
    group: Option<&str>,
    log: &ActionLog,
    prompter: &dyn Prompter,
    timeout: &TimeoutRetry,
) -> Result<bool> {
    let mut summary = RevertSummary::default();

    // Collect every downgrade first so drift is known before anything changes
    let mut downgrades = Vec::new();
    for payload in revert_log.get_data(actions::UPDATE, group) {
        let Some(record) = UpdateRecord::parse(&payload) else {
            log.warn(format!("Ignoring malformed UPDATE entry '{}'", payload));
            summary.skipped += 1;
            continue;
        };
        if record.is_noop() {
            summary.unchanged += 1;
            continue;
        }
        match locate(api, kinds, &record.id).await {
            FetchOutcome::Found((kind, current)) => {
                downgrades.push(Downgrade { kind, record, current })
            }
            FetchOutcome::NotFound => {
                log.warn(format!("Updated entity {} no longer exists, skipping", record.id));
                summary.skipped += 1;
            }
            FetchOutcome::Failed(e) => {
                log.warn(format!("Could not fetch updated entity {}: {}", record.id, e));
                summary.skipped += 1;
            }
        }
    }

    let drifted: Vec<&Downgrade> = downgrades
        .iter()
        .filter(|d| d.current.version != Some(d.record.new_version))
        .collect();
    if !drifted.is_empty() {
        println!(
            "{} {} entities changed after they were copied:",
            "⚠".yellow(),
            drifted.len()
        );
        for d in &drifted {
            let line = format!(
                "{} {} '{}': copied as version {}, now version {}{}",
                d.kind,
                d.record.id,
                d.current.label,
                d.record.new_version,
                d.current.version_or_zero(),
                if d.current.is_archived() { " (archived)" } else { "" }
            );
            println!("  {}", line);
            log.add_comment(line);
        }

        let prompt = format!(
            "Revert {} changed entities to their pre-copy versions anyway?",
            drifted.len()
        );
        if !prompter.confirm(&prompt, false)?.unwrap_or(false) {
            log.error("Revert cancelled by operator; nothing was changed");
            return Ok(false);
        }
    }

    for d in downgrades {
        downgrade(api, log, timeout, d, &mut summary).await;
    }

    // Undo creates newest first so dependants go before what they reference
    let mut created = revert_log.get_data(actions::CREATE, group);
    created.reverse();
    for id in created {
        undo_create(api, kinds, log, timeout, &id, &mut summary).await;
    }

    log.append_line(format!(
        "Reverted: {} archived, {} deleted, {} downgraded, {} unchanged, {} skipped, {} failed",
        summary.archived,
        summary.deleted,
        summary.downgraded,
        summary.unchanged,
        summary.skipped,
        summary.failed
    ));
    Ok(summary.failed == 0)
}

async fn matching_body(
    api: &dyn HubApi,
    kind: EntityKind,
    id: &str,
    body: &serde_json::Value,
) -> Result<Option<RemoteEntity>, RemoteError> {
    let current = api.get(kind, id).await?;
    Ok((&current.body == body).then_some(current))
}

async fn downgrade(
    api: &dyn HubApi,
    log: &ActionLog,
    timeout: &TimeoutRetry,
    d: Downgrade,
    summary: &mut RevertSummary,
) {
    let Downgrade { kind, record, current } = d;
    if current.is_archived() {
        log.warn(format!("{} {} is archived, not reverting its update", kind, record.id));
        summary.skipped += 1;
        return;
    }

    let previous = match api.get_version(kind, &record.id, record.old_version).await {
        Ok(previous) => previous,
        Err(e) => {
            log.error(format!(
                "Could not fetch version {} of {} {}: {}",
                record.old_version, kind, record.id, e
            ));
            summary.failed += 1;
            return;
        }
    };

    let id = record.id.as_str();
    let body = &previous.body;
    let result = timeout
        .attempt(
            log,
            move || api.update(kind, id, current.version, body),
            move || matching_body(api, kind, id, body),
        )
        .await;

    match result {
        Ok(_) => {
            log.add_comment(format!("Reverted {} {} to version {}", kind, id, record.old_version));
            summary.downgraded += 1;
        }
        Err(e) => {
            log.error(format!("Failed to revert {} {}: {}", kind, id, e));
            summary.failed += 1;
        }
    }
}

pub(crate) async fn archived_state(
    api: &dyn HubApi,
    kind: EntityKind,
    id: &str,
) -> Result<Option<RemoteEntity>, RemoteError> {
    let current = api.get(kind, id).await?;
    Ok(current.is_archived().then_some(current))
}

async fn deleted_state(
    api: &dyn HubApi,
    kind: EntityKind,
    id: &str,
) -> Result<Option<()>, RemoteError> {
    match api.fetch(kind, id).await {
        FetchOutcome::NotFound => Ok(Some(())),
        FetchOutcome::Found(_) => Ok(None),
        FetchOutcome::Failed(e) => Err(e),
    }
}

async fn undo_create(
    api: &dyn HubApi,
    kinds: &[EntityKind],
    log: &ActionLog,
    timeout: &TimeoutRetry,
    id: &str,
    summary: &mut RevertSummary,
) {
    let (kind, entity) = match locate(api, kinds, id).await {
        FetchOutcome::Found(found) => found,
        FetchOutcome::NotFound => {
            log.warn(format!("Created entity {} no longer exists, skipping", id));
            summary.skipped += 1;
            return;
        }
        FetchOutcome::Failed(e) => {
            log.warn(format!("Could not fetch created entity {}: {}", id, e));
            summary.skipped += 1;
            return;
        }
    };

    if kind.is_archivable() {
        if entity.is_archived() {
            debug!("{} {} already archived", kind, id);
            summary.unchanged += 1;
            return;
        }
        let result = timeout
            .attempt(
                log,
                move || api.archive(kind, id),
                move || archived_state(api, kind, id),
            )
            .await;
        match result {
            Ok(_) => {
                log.add_action(actions::ARCHIVE, id);
                summary.archived += 1;
            }
            Err(e) => {
                log.error(format!("Failed to archive {} {}: {}", kind, id, e));
                summary.failed += 1;
            }
        }
    } else {
        let result = timeout
            .attempt(
                log,
                move || api.delete(kind, id),
                move || deleted_state(api, kind, id),
            )
            .await;
        match result {
            Ok(()) => {
                log.add_action(actions::DELETE, id);
                summary.deleted += 1;
            }
            Err(e) => {
                log.error(format!("Failed to delete {} {}: {}", kind, id, e));
                summary.failed += 1;
            }
        }
    }
}
