//! In-process hub used by tests and local experiments
//!
//! Keeps a version history for versioned kinds and supports fault injection,
//! including requests that time out after the hub has already applied them.

use super::error::RemoteError;
use super::models::{EntityKind, EntityStatus, Folder, RemoteEntity};
use super::HubApi;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

const CONFLICT: u16 = 409;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Get,
    GetVersion,
    Create,
    Update,
    Archive,
    Unarchive,
    Delete,
}

/// An injected failure. For `Op::Create` the target is matched against the
/// label, for every other operation against the entity id.
#[derive(Debug, Clone)]
pub struct Fault {
    op: Op,
    kind: Option<EntityKind>,
    target: Option<String>,
    error: RemoteError,
    apply_first: bool,
    remaining: usize,
}

impl Fault {
    /// The operation fails without touching the hub
    pub fn fail(op: Op, error: RemoteError) -> Self {
        Self {
            op,
            kind: None,
            target: None,
            error,
            apply_first: false,
            remaining: 1,
        }
    }

    /// The hub applies the operation, then the caller sees a gateway timeout
    pub fn timeout_after_apply(op: Op) -> Self {
        Self {
            apply_first: true,
            ..Self::fail(op, RemoteError::timeout())
        }
    }

    pub fn for_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn times(mut self, count: usize) -> Self {
        self.remaining = count;
        self
    }

    pub fn always(self) -> Self {
        self.times(usize::MAX)
    }

    fn matches(&self, op: Op, kind: EntityKind, target: &str) -> bool {
        self.remaining > 0
            && self.op == op
            && self.kind.map_or(true, |k| k == kind)
            && self.target.as_deref().map_or(true, |t| t == target)
    }
}

struct StoredEntity {
    current: RemoteEntity,
    history: BTreeMap<u64, RemoteEntity>,
}

#[derive(Default)]
struct HubState {
    entities: BTreeMap<(EntityKind, String), StoredEntity>,
    folders: HashMap<String, Folder>,
    faults: Vec<Fault>,
    calls: Vec<(Op, EntityKind, String)>,
    next_id: u64,
}

impl HubState {
    /// Returns the injected fault for this call, if any, and whether the
    /// operation should still be applied before reporting it
    fn take_fault(
        &mut self,
        op: Op,
        kind: EntityKind,
        target: &str,
    ) -> Option<(RemoteError, bool)> {
        self.calls.push((op, kind, target.to_string()));
        let fault = self.faults.iter_mut().find(|f| f.matches(op, kind, target))?;
        if fault.remaining != usize::MAX {
            fault.remaining -= 1;
        }
        Some((fault.error.clone(), fault.apply_first))
    }

    fn stored(&mut self, kind: EntityKind, id: &str) -> Result<&mut StoredEntity, RemoteError> {
        self.entities
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| RemoteError::not_found(format!("{} {}", kind, id)))
    }
}

/// Hub held entirely in memory
pub struct MemoryHub {
    hub_id: String,
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new(hub_id: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an entity directly, bypassing faults. Versioned kinds start at
    /// version 1. Returns the new id.
    pub fn insert(&self, kind: EntityKind, label: &str, body: Value) -> String {
        let mut state = self.state();
        let id = if kind == EntityKind::Settings {
            self.hub_id.clone()
        } else {
            state.next_id += 1;
            format!("{}-{}", self.hub_id, state.next_id)
        };
        let entity = RemoteEntity {
            id: id.clone(),
            label: label.to_string(),
            version: kind.is_versioned().then_some(1),
            status: EntityStatus::Active,
            folder_id: None,
            body,
        };
        Self::store_new(&mut state, kind, entity);
        id
    }

    /// Seed an entity inside a folder
    pub fn insert_in_folder(
        &self,
        kind: EntityKind,
        label: &str,
        folder_id: &str,
        body: Value,
    ) -> String {
        let id = self.insert(kind, label, body);
        if let Ok(stored) = self.state().stored(kind, &id) {
            stored.current.folder_id = Some(folder_id.to_string());
        }
        id
    }

    pub fn add_folder(&self, folder: Folder) {
        self.state().folders.insert(folder.id.clone(), folder);
    }

    pub fn inject(&self, fault: Fault) {
        self.state().faults.push(fault);
    }

    /// Current state of an entity, bypassing faults
    pub fn entity(&self, kind: EntityKind, id: &str) -> Option<RemoteEntity> {
        self.state()
            .entities
            .get(&(kind, id.to_string()))
            .map(|stored| stored.current.clone())
    }

    pub fn entities(&self, kind: EntityKind) -> Vec<RemoteEntity> {
        self.state()
            .entities
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, stored)| stored.current.clone())
            .collect()
    }

    pub fn count_calls(&self, op: Op) -> usize {
        self.state().calls.iter().filter(|(o, _, _)| *o == op).count()
    }

    fn store_new(state: &mut HubState, kind: EntityKind, entity: RemoteEntity) {
        let mut history = BTreeMap::new();
        if let Some(version) = entity.version {
            history.insert(version, entity.clone());
        }
        state.entities.insert(
            (kind, entity.id.clone()),
            StoredEntity {
                current: entity,
                history,
            },
        );
    }

    fn apply_update(
        state: &mut HubState,
        kind: EntityKind,
        id: &str,
        version: Option<u64>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError> {
        let stored = state.stored(kind, id)?;
        if stored.current.is_archived() {
            return Err(RemoteError::http(CONFLICT, format!("{} {} is archived", kind, id)));
        }
        if kind.is_versioned() && version.is_some() && version != stored.current.version {
            return Err(RemoteError::http(
                CONFLICT,
                format!("stale version {:?} for {} {}", version, kind, id),
            ));
        }
        stored.current.body = body.clone();
        if let Some(current) = stored.current.version {
            let next = current + 1;
            stored.current.version = Some(next);
            stored.history.insert(next, stored.current.clone());
        }
        Ok(stored.current.clone())
    }

    fn apply_status(
        state: &mut HubState,
        kind: EntityKind,
        id: &str,
        status: EntityStatus,
    ) -> Result<RemoteEntity, RemoteError> {
        let stored = state.stored(kind, id)?;
        if stored.current.status == status {
            return Err(RemoteError::http(
                CONFLICT,
                format!("{} {} is already {:?}", kind, id, status),
            ));
        }
        stored.current.status = status;
        Ok(stored.current.clone())
    }

    /// Run an operation against the state, honouring any injected fault
    fn with_fault<T>(
        &self,
        op: Op,
        kind: EntityKind,
        target: &str,
        apply: impl FnOnce(&mut HubState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut state = self.state();
        match state.take_fault(op, kind, target) {
            Some((error, true)) => {
                let _ = apply(&mut *state);
                Err(error)
            }
            Some((error, false)) => Err(error),
            None => apply(&mut *state),
        }
    }
}

#[async_trait]
impl HubApi for MemoryHub {
    fn hub_id(&self) -> &str {
        &self.hub_id
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<RemoteEntity>, RemoteError> {
        self.with_fault(Op::List, kind, "", |state| {
            Ok(state
                .entities
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, stored)| stored.current.clone())
                .collect())
        })
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        self.with_fault(Op::Get, kind, id, |state| {
            state.stored(kind, id).map(|stored| stored.current.clone())
        })
    }

    async fn get_version(
        &self,
        kind: EntityKind,
        id: &str,
        version: u64,
    ) -> Result<RemoteEntity, RemoteError> {
        self.with_fault(Op::GetVersion, kind, id, |state| {
            let stored = state.stored(kind, id)?;
            stored.history.get(&version).cloned().ok_or_else(|| {
                RemoteError::not_found(format!("version {} of {} {}", version, kind, id))
            })
        })
    }

    async fn create(
        &self,
        kind: EntityKind,
        label: &str,
        folder_id: Option<&str>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError> {
        let hub_id = self.hub_id.clone();
        self.with_fault(Op::Create, kind, label, |state| {
            state.next_id += 1;
            let entity = RemoteEntity {
                id: format!("{}-{}", hub_id, state.next_id),
                label: label.to_string(),
                version: kind.is_versioned().then_some(1),
                status: EntityStatus::Active,
                folder_id: folder_id.map(str::to_string),
                body: body.clone(),
            };
            Self::store_new(state, kind, entity.clone());
            Ok(entity)
        })
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        version: Option<u64>,
        body: &Value,
    ) -> Result<RemoteEntity, RemoteError> {
        self.with_fault(Op::Update, kind, id, |state| {
            Self::apply_update(state, kind, id, version, body)
        })
    }

    async fn archive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        self.with_fault(Op::Archive, kind, id, |state| {
            Self::apply_status(state, kind, id, EntityStatus::Archived)
        })
    }

    async fn unarchive(&self, kind: EntityKind, id: &str) -> Result<RemoteEntity, RemoteError> {
        self.with_fault(Op::Unarchive, kind, id, |state| {
            Self::apply_status(state, kind, id, EntityStatus::Active)
        })
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        self.with_fault(Op::Delete, kind, id, |state| {
            state
                .entities
                .remove(&(kind, id.to_string()))
                .map(|_| ())
                .ok_or_else(|| RemoteError::not_found(format!("{} {}", kind, id)))
        })
    }

    async fn get_folder(&self, id: &str) -> Result<Folder, RemoteError> {
        self.state()
            .folders
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found(format!("folder {}", id)))
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError> {
        let mut folders: Vec<Folder> = self.state().folders.values().cloned().collect();
        folders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(folders)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, RemoteError> {
        let mut state = self.state();
        if let Some(parent) = parent_id {
            if !state.folders.contains_key(parent) {
                return Err(RemoteError::not_found(format!("folder {}", parent)));
            }
        }
        state.next_id += 1;
        let folder = Folder {
            id: format!("{}-folder-{}", self.hub_id, state.next_id),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        state.folders.insert(folder.id.clone(), folder.clone());
        Ok(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_tracks_history() {
        let hub = MemoryHub::new("hub");
        let id = hub.insert(EntityKind::ContentItem, "page", json!({"title": "v1"}));

        let updated = hub
            .update(EntityKind::ContentItem, &id, Some(1), &json!({"title": "v2"}))
            .await
            .unwrap();
        assert_eq!(updated.version, Some(2));

        let old = hub.get_version(EntityKind::ContentItem, &id, 1).await.unwrap();
        assert_eq!(old.body, json!({"title": "v1"}));
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let hub = MemoryHub::new("hub");
        let id = hub.insert(EntityKind::Schema, "schema", json!({}));

        let err = hub
            .update(EntityKind::Schema, &id, Some(7), &json!({"a": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(CONFLICT));
    }

    #[tokio::test]
    async fn test_timeout_after_apply_fault() {
        let hub = MemoryHub::new("hub");
        let id = hub.insert(EntityKind::ContentItem, "page", json!({}));
        hub.inject(Fault::timeout_after_apply(Op::Archive).for_target(id.clone()));

        let err = hub.archive(EntityKind::ContentItem, &id).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(hub.entity(EntityKind::ContentItem, &id).unwrap().is_archived());

        // The fault is consumed
        assert!(hub.unarchive(EntityKind::ContentItem, &id).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_classifies_missing_entities() {
        let hub = MemoryHub::new("hub");
        assert!(matches!(
            hub.fetch(EntityKind::ContentItem, "nope").await,
            crate::api::FetchOutcome::NotFound
        ));
    }
}
