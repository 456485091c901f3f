//! End-to-end scenarios against the public `FloopEngine` tool surface,
//! covering the six scenarios and the round-trip laws described for the
//! external interface.

use std::sync::Arc;

use floop_core::engine::{
    ActiveInput, BackupInput, ConnectInput, DeduplicateInput, EngineContext, FloopEngine, ListInput,
    RestoreInput,
};
use floop_core::error::EngineError;
use floop_core::learning::CorrectionLog;
use floop_core::model::{Behavior, BehaviorKind, CorrectionInput, Edge, EdgeKind};
use floop_core::runtime::AuditLog;
use floop_core::store::{GraphStore, MultiStore, Scope, SqliteGraphStore};
use floop_core::FloopConfig;
use tempfile::TempDir;

fn test_engine(dir: &TempDir) -> FloopEngine {
    let local = Arc::new(SqliteGraphStore::open_in_memory().unwrap());
    let global = Arc::new(SqliteGraphStore::open_in_memory().unwrap());
    let store = MultiStore::new(local, global);
    let local_audit = AuditLog::open(&dir.path().join("local-audit.jsonl")).unwrap();
    let global_audit = AuditLog::open(&dir.path().join("global-audit.jsonl")).unwrap();
    let correction_log = CorrectionLog::open(&dir.path().join("corrections.jsonl")).unwrap();
    let ctx = EngineContext {
        store,
        config: FloopConfig::default(),
        local_root: dir.path().to_path_buf(),
        global_root: dir.path().to_path_buf(),
        local_audit,
        global_audit,
        correction_log,
        embedder: None,
    };
    FloopEngine::new(ctx)
}

#[test]
fn go_specific_retrieval() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let mut a = Behavior::new("use gofmt", BehaviorKind::Directive, "Use gofmt");
    a.when.insert("language".to_string(), "go".to_string());
    let a = engine.store().local.add_node(a).unwrap();

    let result = engine.active(ActiveInput { file: Some("main.go".to_string()), ..Default::default() }).unwrap();

    assert!(result.count >= 1);
    assert_eq!(result.context.file_language.as_deref(), Some("go"));
    let hit = result.active.iter().find(|v| v.id == a.id).expect("behavior A present");
    assert_eq!(hit.distance, 0);
}

#[test]
fn edge_spread_reaches_a_neighbor_without_exceeding_the_seed() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let mut a = Behavior::new("use gofmt", BehaviorKind::Directive, "Use gofmt");
    a.when.insert("language".to_string(), "go".to_string());
    let a = engine.store().local.add_node(a).unwrap();

    let b = Behavior::new("related style note", BehaviorKind::Preference, "Keep imports grouped");
    let b = engine.store().local.add_node(b).unwrap();

    engine
        .store()
        .local
        .add_edge(Edge::new(a.id.clone(), b.id.clone(), EdgeKind::SimilarTo, 0.8))
        .unwrap();

    let result = engine.active(ActiveInput { file: Some("main.go".to_string()), ..Default::default() }).unwrap();

    let view_a = result.active.iter().find(|v| v.id == a.id).expect("A present");
    let view_b = result.active.iter().find(|v| v.id == b.id).expect("B reached by spreading");
    assert_eq!(view_a.distance, 0);
    assert!(view_b.distance >= 1);
    assert!(view_b.activation <= view_a.activation);
}

#[test]
fn conflicting_when_clause_excludes_the_behavior() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let mut debug_only = Behavior::new("debug helper", BehaviorKind::Directive, "Add verbose logging");
    debug_only.when.insert("task".to_string(), "debug".to_string());
    let debug_only = engine.store().local.add_node(debug_only).unwrap();

    let result = engine.active(ActiveInput { task: Some("refactor".to_string()), ..Default::default() }).unwrap();

    assert!(result.active.iter().all(|v| v.id != debug_only.id));
}

#[test]
fn learn_auto_merges_into_an_existing_near_duplicate() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let x = Behavior::new("structured logging", BehaviorKind::Directive, "Use structured logging");
    let x = engine.store().local.add_node(x).unwrap();
    let count_before = engine.list(ListInput::default()).unwrap().count;

    let result = engine
        .learn(
            CorrectionInput {
                wrong: "used println".to_string(),
                right: "Use structured logging".to_string(),
                file: None,
                task: None,
                auto_merge: None,
            },
            Scope::Local,
        )
        .unwrap();

    assert_eq!(result.merged_into_id.as_deref(), Some(x.id.as_str()));
    assert!(result.merge_similarity.unwrap_or(0.0) >= 0.9);

    let count_after = engine.list(ListInput::default()).unwrap().count;
    assert_eq!(count_before, count_after);
}

#[test]
fn backup_then_replace_restore_round_trips_node_count() {
    let src_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();
    let src = test_engine(&src_dir);
    let dst = test_engine(&dst_dir);

    for i in 0..10 {
        src.store()
            .local
            .add_node(Behavior::new(format!("behavior {i}"), BehaviorKind::Directive, format!("do thing {i}")))
            .unwrap();
    }
    let ids: Vec<String> = src.store().local.all_node_ids().unwrap();
    assert_eq!(ids.len(), 10);
    for i in 0..15 {
        let a = &ids[i % ids.len()];
        let b = &ids[(i + 1) % ids.len()];
        if a != b {
            let _ = src.store().local.add_edge(Edge::new(a.clone(), b.clone(), EdgeKind::SimilarTo, 0.5));
        }
    }

    let backup_summary = src.backup(BackupInput::default()).unwrap();
    assert_eq!(backup_summary.node_count, 10);

    let restore_summary = dst
        .restore(RestoreInput {
            input_path: backup_summary.path.to_string_lossy().to_string(),
            mode: Some("replace".to_string()),
            scope: None,
        })
        .unwrap();
    assert_eq!(restore_summary.nodes_restored, 10);

    let listed = dst.list(ListInput::default()).unwrap();
    assert_eq!(listed.count, 10);

    let validation = dst.validate().unwrap();
    assert!(validation.valid);
}

#[test]
fn backup_to_a_disallowed_path_is_rejected_and_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let err = engine
        .backup(BackupInput { output_path: Some("/etc/passwd".to_string()), scope: None })
        .unwrap_err();

    assert!(matches!(err, EngineError::Runtime(floop_core::error::RuntimeError::PathRejected(_))));
}

#[test]
fn connect_rejects_unknown_kind_and_round_trips_a_real_one() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    let a = engine.store().local.add_node(Behavior::new("a", BehaviorKind::Directive, "do a")).unwrap();
    let b = engine.store().local.add_node(Behavior::new("b", BehaviorKind::Directive, "do b")).unwrap();

    let bad = engine.connect(ConnectInput {
        source: a.id.clone(),
        target: b.id.clone(),
        kind: "co-activated".to_string(),
        weight: None,
        bidirectional: false,
        scope: None,
    });
    assert!(bad.is_err());

    let edge = engine
        .connect(ConnectInput {
            source: a.id.clone(),
            target: b.id.clone(),
            kind: "requires".to_string(),
            weight: Some(0.9),
            bidirectional: false,
            scope: None,
        })
        .unwrap();
    assert!(edge.weight > 0.0 && edge.weight <= 1.0);
}

#[test]
fn deduplicate_merges_two_near_identical_behaviors() {
    let dir = TempDir::new().unwrap();
    let engine = test_engine(&dir);

    engine
        .learn(
            CorrectionInput {
                wrong: "x".to_string(),
                right: "always use structured logging for output".to_string(),
                file: None,
                task: None,
                auto_merge: None,
            },
            Scope::Local,
        )
        .unwrap();
    engine
        .learn(
            CorrectionInput {
                wrong: "y".to_string(),
                right: "always use structured logging for output".to_string(),
                file: None,
                task: None,
                auto_merge: None,
            },
            Scope::Local,
        )
        .unwrap();

    let result = engine
        .deduplicate(DeduplicateInput { scope: Some(Scope::Local), threshold: None, dry_run: false })
        .unwrap();
    assert!(result.merged >= 1);

    let listed = engine.list(ListInput::default()).unwrap();
    assert!(listed.behaviors.iter().all(|b| b.kind != BehaviorKind::ForgottenBehavior));
}
