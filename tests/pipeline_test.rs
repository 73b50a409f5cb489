//! Hub clone pipeline against in-memory hubs
//!
//! Covers a full clone and its revert, resuming after a failed step, and a
//! revert the operator declines part way through.

use hub_migrate::action_log::{actions, ActionLog};
use hub_migrate::api::{
    EntityKind, Fault, HubApi, HubCredentials, MemoryConnector, MemoryHub, Op, RemoteError,
    TimeoutRetry,
};
use hub_migrate::handlers::ImportOptions;
use hub_migrate::pipeline::{Pipeline, PipelineState, RunOptions};
use hub_migrate::ui::ScriptedPrompter;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn creds(hub_id: &str) -> HubCredentials {
    HubCredentials {
        client_id: "client".into(),
        client_secret: "secret".into(),
        hub_id: hub_id.into(),
    }
}

const LINK_SCHEMA: &str =
    "http://bigcontent.io/cms/schema/v1/core#/definitions/content-link";

fn link(id: &str) -> Value {
    json!({"_meta": {"schema": LINK_SCHEMA}, "id": id})
}

/// Source hub with one of everything
fn seeded_source() -> Arc<MemoryHub> {
    let src = Arc::new(MemoryHub::new("src"));
    src.insert(EntityKind::Settings, "settings", json!({"locale": "en-GB"}));
    src.insert(EntityKind::WorkflowState, "Draft", json!({"color": "red"}));
    src.insert(EntityKind::Extension, "rich-text", json!({"url": "https://ext.example"}));
    src.insert(EntityKind::Schema, "card", json!({"$id": "https://schema.example/card"}));
    let card_type = json!({"contentTypeUri": "https://schema.example/card"});
    src.insert(EntityKind::ContentType, "Card", card_type);
    src.insert(EntityKind::SearchIndex, "cards-index", json!({"type": "PRODUCTION"}));
    let leaf = src.insert(EntityKind::ContentItem, "leaf", json!({"title": "leaf"}));
    src.insert(EntityKind::ContentItem, "parent", json!({"child": link(&leaf)}));
    let event = src.insert(EntityKind::Event, "Launch", json!({"start": "2024-01-01"}));
    src.insert(EntityKind::Edition, "Launch edition", json!({"eventId": event}));
    src
}

fn destination() -> Arc<MemoryHub> {
    let dst = Arc::new(MemoryHub::new("dst"));
    dst.insert(EntityKind::Settings, "settings", json!({"locale": "fr-FR"}));
    dst
}

fn state<'a>(
    connector: &'a MemoryConnector,
    prompter: &'a ScriptedPrompter,
    work: &Path,
    log: ActionLog,
    force: bool,
) -> PipelineState<'a> {
    PipelineState {
        from: creds("src"),
        to: creds("dst"),
        working_directory: work.to_path_buf(),
        log,
        revert_log: None,
        import: ImportOptions {
            force,
            mapping_file: Some(work.join("mapping.json")),
            ..Default::default()
        },
        connector,
        prompter,
        timeout: TimeoutRetry::new(Duration::ZERO, 3),
    }
}

fn active(hub: &MemoryHub, kind: EntityKind) -> usize {
    hub.entities(kind).iter().filter(|e| !e.is_archived()).count()
}

#[tokio::test]
async fn test_clone_then_revert_restores_destination() {
    let src = seeded_source();
    let dst = destination();
    let connector = MemoryConnector::new().with_hub(src.clone()).with_hub(dst.clone());
    let work = tempfile::tempdir().unwrap();
    let log_path = work.path().join("clone.log");

    // One prompt: the destination settings already exist
    let prompter = ScriptedPrompter::new([true]);
    let clone_state = state(
        &connector,
        &prompter,
        work.path(),
        ActionLog::at_path("hub clone", &log_path),
        false,
    );
    assert!(Pipeline::hub_clone().run(&clone_state, &RunOptions::default()).await);
    assert_eq!(prompter.asked().len(), 1);

    assert_eq!(dst.entity(EntityKind::Settings, "dst").unwrap().body["locale"], "en-GB");
    assert_eq!(active(&dst, EntityKind::WorkflowState), 1);
    assert_eq!(active(&dst, EntityKind::Extension), 1);
    assert_eq!(active(&dst, EntityKind::Schema), 1);
    assert_eq!(active(&dst, EntityKind::ContentType), 1);
    assert_eq!(active(&dst, EntityKind::SearchIndex), 1);
    assert_eq!(active(&dst, EntityKind::ContentItem), 2);
    // Limited step skipped without --accept-snapshot-limits
    assert_eq!(active(&dst, EntityKind::Event), 0);
    assert!(work.path().join("settings").join("backup").exists());

    let written = ActionLog::load_from_file(&log_path).unwrap();
    assert_eq!(written.get_data(actions::CREATE, Some("Clone Schemas")).len(), 1);
    assert_eq!(written.get_data(actions::CREATE, Some("Clone Content")).len(), 2);

    let prompter = ScriptedPrompter::default();
    let revert_log = ActionLog::new("hub revert");
    let mut revert_state = state(&connector, &prompter, work.path(), revert_log, false);
    assert!(
        Pipeline::hub_clone()
            .revert(&mut revert_state, &log_path, &RunOptions::default())
            .await
    );
    assert!(prompter.asked().is_empty());

    assert_eq!(dst.entity(EntityKind::Settings, "dst").unwrap().body["locale"], "fr-FR");
    assert_eq!(dst.entities(EntityKind::WorkflowState).len(), 0);
    assert_eq!(dst.entities(EntityKind::Extension).len(), 0);
    assert_eq!(dst.entities(EntityKind::SearchIndex).len(), 0);
    assert_eq!(active(&dst, EntityKind::Schema), 0);
    assert_eq!(active(&dst, EntityKind::ContentType), 0);
    assert_eq!(active(&dst, EntityKind::ContentItem), 0);
}

#[tokio::test]
async fn test_failed_step_halts_and_resumes_from_step_flag() {
    let src = seeded_source();
    let dst = destination();
    let outage = RemoteError::http(500, "schema store down");
    dst.inject(Fault::fail(Op::Create, outage).for_kind(EntityKind::Schema));
    let connector = MemoryConnector::new().with_hub(src.clone()).with_hub(dst.clone());
    let work = tempfile::tempdir().unwrap();
    let prompter = ScriptedPrompter::default();

    let log = ActionLog::new("hub clone");
    let first = state(&connector, &prompter, work.path(), log.clone(), true);
    assert!(!Pipeline::hub_clone().run(&first, &RunOptions::default()).await);

    assert!(log.to_string().contains("--step 2"));
    assert_eq!(active(&dst, EntityKind::Extension), 1);
    assert_eq!(active(&dst, EntityKind::Schema), 0);
    assert_eq!(dst.entities(EntityKind::ContentType).len(), 0);
    assert_eq!(dst.entities(EntityKind::ContentItem).len(), 0);

    let resumed = state(&connector, &prompter, work.path(), ActionLog::new("hub clone"), true);
    let options = RunOptions {
        start_step: 2,
        accept_limits: true,
    };
    assert!(Pipeline::hub_clone().run(&resumed, &options).await);

    assert_eq!(active(&dst, EntityKind::Extension), 1);
    assert_eq!(active(&dst, EntityKind::Schema), 1);
    assert_eq!(active(&dst, EntityKind::ContentItem), 2);
    assert_eq!(active(&dst, EntityKind::Event), 1);
    let edition = &dst.entities(EntityKind::Edition)[0];
    let event = &dst.entities(EntityKind::Event)[0];
    assert_eq!(edition.body["eventId"], event.id.as_str());
}

#[tokio::test]
async fn test_declined_revert_stops_before_later_steps() {
    let src = seeded_source();
    let dst = destination();
    let connector = MemoryConnector::new().with_hub(src.clone()).with_hub(dst.clone());
    let work = tempfile::tempdir().unwrap();
    let prompter = ScriptedPrompter::default();

    let first = state(&connector, &prompter, work.path(), ActionLog::new("clone 1"), true);
    assert!(Pipeline::hub_clone().run(&first, &RunOptions::default()).await);

    // Second clone updates the schema and creates one more item
    let src_schema = src.entities(EntityKind::Schema)[0].id.clone();
    let revised = json!({"$id": "https://schema.example/card", "v": 2});
    src.update(EntityKind::Schema, &src_schema, Some(1), &revised)
        .await
        .unwrap();
    src.insert(EntityKind::ContentItem, "late", json!({"title": "late"}));

    let log_path = work.path().join("clone2.log");
    let second_log = ActionLog::at_path("clone 2", &log_path);
    let second = state(&connector, &prompter, work.path(), second_log, true);
    assert!(Pipeline::hub_clone().run(&second, &RunOptions::default()).await);

    let dst_schema = dst.entities(EntityKind::Schema)[0].clone();
    let written = ActionLog::load_from_file(&log_path).unwrap();
    assert_eq!(
        written.get_data(actions::UPDATE, Some("Clone Schemas")),
        vec![format!("{} 1 2", dst_schema.id)]
    );

    // Someone edits the destination schema after the copy
    dst.update(EntityKind::Schema, &dst_schema.id, Some(2), &json!({"edited": true}))
        .await
        .unwrap();

    let declining = ScriptedPrompter::new([false]);
    let revert_log = ActionLog::new("revert");
    let mut revert_state = state(&connector, &declining, work.path(), revert_log, false);
    assert!(
        !Pipeline::hub_clone()
            .revert(&mut revert_state, &log_path, &RunOptions::default())
            .await
    );

    assert_eq!(declining.asked().len(), 1);
    assert_eq!(dst.entity(EntityKind::Schema, &dst_schema.id).unwrap().version, Some(3));
    // Content is a later step and must not have been reverted
    assert_eq!(active(&dst, EntityKind::ContentItem), 3);
}
