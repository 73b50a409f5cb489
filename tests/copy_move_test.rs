//! Copy and move of content items between in-memory hubs

use hub_migrate::action_log::{actions, ActionLog};
use hub_migrate::api::{
    EntityKind, Fault, MemoryConnector, MemoryHub, Op, RemoteError, TimeoutRetry,
};
use hub_migrate::cli::commands::{CopyArgs, DestinationArgs, ImportArgs};
use hub_migrate::cli::CredentialArgs;
use hub_migrate::commands::{content::copy_command, CommandContext};
use hub_migrate::config::{AppSettings, CopyConfig};
use hub_migrate::copy::{ConfigSource, CopyMode, CopyOrchestrator, CopyRequest, RevertInput};
use hub_migrate::handlers::ImportOptions;
use hub_migrate::ui::ScriptedPrompter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn config() -> CopyConfig {
    CopyConfig {
        src_hub_id: "src".into(),
        src_client_id: "client".into(),
        src_secret: "secret".into(),
        dst_hub_id: "dst".into(),
        dst_client_id: "client".into(),
        dst_secret: "secret".into(),
    }
}

fn hubs() -> (Arc<MemoryHub>, Arc<MemoryHub>, MemoryConnector) {
    let src = Arc::new(MemoryHub::new("src"));
    let dst = Arc::new(MemoryHub::new("dst"));
    let connector = MemoryConnector::new().with_hub(src.clone()).with_hub(dst.clone());
    (src, dst, connector)
}

fn request(mode: CopyMode, import: ImportOptions) -> CopyRequest {
    CopyRequest {
        mode,
        config: ConfigSource::Inline(config()),
        kinds: vec![EntityKind::ContentItem],
        import,
        revert: None,
    }
}

const LINK_SCHEMA: &str =
    "http://bigcontent.io/cms/schema/v1/core#/definitions/content-link";

fn link(id: &str) -> serde_json::Value {
    json!({"_meta": {"schema": LINK_SCHEMA}, "id": id})
}

fn quick() -> TimeoutRetry {
    TimeoutRetry::new(Duration::ZERO, 3)
}

#[tokio::test]
async fn test_move_archives_only_confirmed_sources() {
    let (src, dst, connector) = hubs();
    let a = src.insert(EntityKind::ContentItem, "A", json!({"title": "A"}));
    let b = src.insert(EntityKind::ContentItem, "B", json!({"title": "B"}));
    let archive_failure = RemoteError::http(500, "archive failed");
    src.inject(Fault::fail(Op::Archive, archive_failure).for_target(b.clone()));
    let prompter = ScriptedPrompter::default();

    let orchestrator = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("move"))
        .with_timeout(quick());
    let ok = orchestrator
        .run(request(CopyMode::Move, ImportOptions::default()))
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(dst.entities(EntityKind::ContentItem).len(), 2);
    assert!(src.entity(EntityKind::ContentItem, &a).unwrap().is_archived());
    assert!(!src.entity(EntityKind::ContentItem, &b).unwrap().is_archived());
    assert_eq!(orchestrator.log().get_data(actions::MOVED, None), vec![a]);
}

#[tokio::test]
async fn test_move_leaves_skipped_incomplete_items_at_source() {
    let (src, dst, connector) = hubs();
    let orphan = src.insert(EntityKind::ContentItem, "orphan", json!({"missing": link("gone")}));
    let fine = src.insert(EntityKind::ContentItem, "fine", json!({"title": "fine"}));
    let prompter = ScriptedPrompter::default();
    let options = ImportOptions {
        skip_incomplete: true,
        ..Default::default()
    };

    let orchestrator = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("move"))
        .with_timeout(quick());
    assert!(orchestrator.run(request(CopyMode::Move, options)).await.unwrap());

    let copied = dst.entities(EntityKind::ContentItem);
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].label, "fine");
    assert!(!src.entity(EntityKind::ContentItem, &orphan).unwrap().is_archived());
    assert!(src.entity(EntityKind::ContentItem, &fine).unwrap().is_archived());
    assert_eq!(orchestrator.log().get_data(actions::MOVED, None), vec![fine]);
}

#[tokio::test]
async fn test_move_revert_unarchives_and_archives_copies() {
    let (src, dst, connector) = hubs();
    let a = src.insert(EntityKind::ContentItem, "A", json!({"title": "A"}));
    let prompter = ScriptedPrompter::default();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("move.log");

    let mover = CopyOrchestrator::new(&connector, &prompter, ActionLog::at_path("move", &log_path))
        .with_timeout(quick());
    assert!(mover.run(request(CopyMode::Move, ImportOptions::default())).await.unwrap());
    assert!(src.entity(EntityKind::ContentItem, &a).unwrap().is_archived());

    let mut undo = request(CopyMode::Move, ImportOptions::default());
    undo.revert = Some(RevertInput {
        log: ActionLog::load_from_file(&log_path).unwrap(),
        group: None,
    });
    let reverter = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("revert"))
        .with_timeout(quick());
    assert!(reverter.run(undo.clone()).await.unwrap());

    assert!(!src.entity(EntityKind::ContentItem, &a).unwrap().is_archived());
    assert!(dst.entities(EntityKind::ContentItem).iter().all(|e| e.is_archived()));
    assert_eq!(reverter.log().get_data(actions::UNARCHIVE, None), vec![a.clone()]);

    // Running the same revert again only warns
    let again = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("revert again"))
        .with_timeout(quick());
    assert!(again.run(undo).await.unwrap());
    assert!(again.log().get_data(actions::UNARCHIVE, None).is_empty());
    assert!(again.log().to_string().contains("already active"));
}

#[tokio::test]
async fn test_timed_out_create_is_not_duplicated() {
    let (src, dst, connector) = hubs();
    src.insert(EntityKind::ContentItem, "A", json!({"title": "A"}));
    dst.inject(Fault::timeout_after_apply(Op::Create).for_target("A"));
    let prompter = ScriptedPrompter::default();

    let orchestrator = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("copy"))
        .with_timeout(quick());
    assert!(orchestrator
        .run(request(CopyMode::Copy, ImportOptions::default()))
        .await
        .unwrap());

    assert_eq!(dst.entities(EntityKind::ContentItem).len(), 1);
    assert_eq!(dst.count_calls(Op::Create), 1);
    assert_eq!(orchestrator.log().get_data(actions::CREATE, None).len(), 1);
}

#[tokio::test]
async fn test_rerun_with_mapping_updates_instead_of_duplicating() {
    let (src, dst, connector) = hubs();
    src.insert(EntityKind::ContentItem, "A", json!({"title": "A"}));
    let prompter = ScriptedPrompter::default();
    let dir = tempfile::tempdir().unwrap();
    let options = ImportOptions {
        force: true,
        mapping_file: Some(dir.path().join("mapping.json")),
        ..Default::default()
    };

    let first = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("copy 1"))
        .with_timeout(quick());
    assert!(first.run(request(CopyMode::Copy, options.clone())).await.unwrap());
    let created = first.log().get_data(actions::CREATE, None);

    let second = CopyOrchestrator::new(&connector, &prompter, ActionLog::new("copy 2"))
        .with_timeout(quick());
    assert!(second.run(request(CopyMode::Copy, options)).await.unwrap());

    assert_eq!(dst.entities(EntityKind::ContentItem).len(), 1);
    assert!(second.log().get_data(actions::CREATE, None).is_empty());
    assert_eq!(
        second.log().get_data(actions::UPDATE, None),
        vec![format!("{} 1 1", created[0])]
    );
}

#[tokio::test]
async fn test_copy_command_saves_synthesised_config_and_log() {
    let (src, dst, connector) = hubs();
    src.insert(EntityKind::ContentItem, "A", json!({"title": "A"}));
    let prompter = ScriptedPrompter::default();
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("copy.log");
    let config_file = dir.path().join("copy-config.json");

    let ctx = CommandContext {
        settings: AppSettings {
            timeout_poll_delay_ms: 0,
            ..AppSettings::default()
        },
        connector: &connector,
        prompter: &prompter,
    };
    let credentials = CredentialArgs {
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        hub_id: Some("src".into()),
    };
    let args = CopyArgs {
        config: Some(config_file.clone()),
        destination: DestinationArgs {
            dst_hub_id: Some("dst".into()),
            ..Default::default()
        },
        import: ImportArgs::default(),
        revert_log: None,
        log_file: Some(log_file.clone()),
    };

    assert!(copy_command(CopyMode::Copy, &credentials, args, &ctx).await.unwrap());
    assert_eq!(dst.entities(EntityKind::ContentItem).len(), 1);
    assert_eq!(CopyConfig::load(&config_file).unwrap(), config());

    let written = ActionLog::load_from_file(&log_file).unwrap();
    assert_eq!(written.get_data(actions::CREATE, None).len(), 1);
}

#[tokio::test]
async fn test_copy_command_with_unreadable_revert_log_fails_cleanly() {
    let (_src, dst, connector) = hubs();
    let prompter = ScriptedPrompter::default();
    let dir = tempfile::tempdir().unwrap();
    let ctx = CommandContext {
        settings: AppSettings::default(),
        connector: &connector,
        prompter: &prompter,
    };
    let args = CopyArgs {
        config: None,
        destination: DestinationArgs::default(),
        import: ImportArgs::default(),
        revert_log: Some(PathBuf::from("/nonexistent/move.log")),
        log_file: Some(dir.path().join("revert.log")),
    };
    let credentials = CredentialArgs {
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        hub_id: Some("src".into()),
    };

    assert!(!copy_command(CopyMode::Move, &credentials, args, &ctx).await.unwrap());
    assert_eq!(dst.count_calls(Op::List), 0);
}
