//! Multi-target construction, dependency ordering and watching.

mod helpers;

use std::sync::Arc;

use helpers::{EventLog, ManualWatchFileSystem, lifecycle_logger, manual_watch, memory_output};
use hookpack::{
    Error, MemoryOutputFileSystem, Plugin, RawOptions, WatchOptions, create_multi_compiler,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

fn target(config: Value, log: &EventLog, label: &'static str) -> RawOptions {
    RawOptions::new(config)
        .plugin(memory_output(Arc::new(MemoryOutputFileSystem::new())))
        .plugin(lifecycle_logger(log.clone(), label))
}

fn position(events: &[String], event: &str) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("missing event {event}"))
}

#[test]
fn cyclic_dependencies_fail_construction() {
    let log = EventLog::new();
    let err = create_multi_compiler(vec![
        target(json!({ "name": "a", "dependencies": ["b"] }), &log, "a"),
        target(json!({ "name": "b", "dependencies": ["a"] }), &log, "b"),
    ])
    .unwrap_err();

    assert!(matches!(err, Error::CyclicDependency { ref cycle } if cycle.len() == 3));
    assert!(err.is_construction_error());
}

#[test]
fn unknown_dependency_fails_construction() {
    let log = EventLog::new();
    let err = create_multi_compiler(vec![
        target(json!({ "name": "client", "dependencies": ["server"] }), &log, "client"),
        target(json!({ "name": "worker" }), &log, "worker"),
    ])
    .unwrap_err();

    assert!(matches!(
        err,
        Error::UnknownDependency { ref compiler, ref dependency } if compiler == "client" && dependency == "server"
    ));
}

#[test]
fn dependency_on_a_duplicated_name_fails_construction() {
    let log = EventLog::new();
    let err = create_multi_compiler(vec![
        target(json!({ "name": "a" }), &log, "a0"),
        target(json!({ "name": "a" }), &log, "a1"),
        target(json!({ "name": "b", "dependencies": ["a"] }), &log, "b"),
    ])
    .unwrap_err();

    assert!(err.is_construction_error());
    assert!(matches!(
        err,
        Error::AmbiguousDependency { ref compiler, ref dependency } if compiler == "b" && dependency == "a"
    ));
}

#[test]
fn duplicated_names_nobody_depends_on_are_accepted() {
    let log = EventLog::new();
    let multi = create_multi_compiler(vec![
        target(json!({ "name": "a" }), &log, "a0"),
        target(json!({ "name": "a" }), &log, "a1"),
        target(json!({ "name": "b" }), &log, "b"),
    ])
    .unwrap();

    assert_eq!(multi.len(), 3);
}

#[test]
fn invalid_target_reports_its_index() {
    let log = EventLog::new();
    let err = create_multi_compiler(vec![
        target(json!({ "name": "ok" }), &log, "ok"),
        target(json!({ "mode": "fast" }), &log, "bad"),
    ])
    .unwrap_err();

    match err {
        Error::Config(config) => {
            assert!(config.violations()[0].to_string().contains("[1]"));
        }
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[tokio::test]
async fn prerequisites_finish_before_dependents_start() {
    let log = EventLog::new();
    let multi = create_multi_compiler(vec![
        target(json!({ "name": "app", "dependencies": ["vendor"] }), &log, "app"),
        target(json!({ "name": "vendor" }), &log, "vendor"),
    ])
    .unwrap();

    let stats = multi.run().await.unwrap();

    let events = log.events();
    assert!(position(&events, "vendor:done") < position(&events, "app:beforeRun"));

    let names: Vec<Option<&str>> = stats
        .children()
        .iter()
        .map(|s| s.compilation().name())
        .collect();
    assert_eq!(names, vec![Some("app"), Some("vendor")]);
}

#[tokio::test]
async fn failed_prerequisite_skips_its_dependents() {
    let log = EventLog::new();
    let broken = Plugin::function(|compiler| {
        compiler
            .hooks
            .make
            .tap("broken", |_| Err(Error::plugin("broken", "vendor failed")));
        Ok(())
    });
    let multi = create_multi_compiler(vec![
        target(json!({ "name": "app", "dependencies": ["vendor"] }), &log, "app"),
        target(json!({ "name": "vendor" }), &log, "vendor").plugin(broken),
    ])
    .unwrap();

    let err = multi.run().await.unwrap_err();

    assert!(matches!(err, Error::Plugin { ref message, .. } if message == "vendor failed"));
    assert_eq!(log.count("vendor:failed"), 1);
    assert_eq!(log.count("app:beforeRun"), 0);
}

#[tokio::test]
async fn close_closes_every_target() {
    let log = EventLog::new();
    let multi = create_multi_compiler(vec![
        target(json!({ "name": "a" }), &log, "a"),
        target(json!({ "name": "b" }), &log, "b"),
    ])
    .unwrap();

    multi.run().await.unwrap();
    multi.close().await.unwrap();

    assert_eq!(log.count("a:shutdown"), 1);
    assert_eq!(log.count("b:shutdown"), 1);
    assert!(multi.compilers().iter().all(|c| c.is_closed()));
}

#[tokio::test]
async fn watch_delivers_combined_results() {
    let log = EventLog::new();
    let app_fs = ManualWatchFileSystem::new();
    let vendor_fs = ManualWatchFileSystem::new();
    let multi = create_multi_compiler(vec![
        target(json!({ "name": "app", "dependencies": ["vendor"] }), &log, "app")
            .plugin(manual_watch(app_fs.clone())),
        target(json!({ "name": "vendor" }), &log, "vendor").plugin(manual_watch(vendor_fs.clone())),
    ])
    .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    multi.watch(vec![WatchOptions::default(); 2], move |result| {
        let _ = tx.send(result);
    });

    let first = rx.recv().await.unwrap().unwrap();
    assert_eq!(first.children().len(), 2);
    let events = log.events();
    assert!(position(&events, "vendor:done") < position(&events, "app:watchRun"));

    app_fs.change(multi.compilers()[0].context().join("src/index.js")).await;
    let second = rx.recv().await.unwrap().unwrap();
    assert_eq!(second.children().len(), 2);
    assert_eq!(log.count("app:watchRun"), 2);
    assert_eq!(log.count("vendor:watchRun"), 1);

    multi.close().await.unwrap();
    assert_eq!(log.count("app:watchClose"), 1);
    assert_eq!(log.count("vendor:watchClose"), 1);
    assert_eq!(log.count("app:shutdown"), 1);
    assert_eq!(log.count("vendor:shutdown"), 1);
}
