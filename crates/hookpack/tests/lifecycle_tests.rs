//! Top-level build entry point tests.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use helpers::{EventLog, ManualWatchFileSystem, lifecycle_logger, manual_watch, memory_output};
use hookpack::deprecation::{self, WATCH_WITHOUT_CALLBACK};
use hookpack::{
    BuildStats, CompilerState, Error, MemoryOutputFileSystem, Plugin, RawOptions, build,
    build_sync, build_with_callback,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

fn raw(config: Value, log: &EventLog) -> RawOptions {
    RawOptions::new(config)
        .plugin(memory_output(Arc::new(MemoryOutputFileSystem::new())))
        .plugin(lifecycle_logger(log.clone(), "c"))
}

#[test]
fn build_without_callback_returns_an_idle_compiler() {
    let log = EventLog::new();
    let handle = build_sync(raw(json!({ "entry": "./src/index.js" }), &log)).unwrap();

    let compiler = handle.as_compiler().unwrap();
    assert_eq!(compiler.state(), CompilerState::Idle);
    assert!(log.events().is_empty());
}

#[test]
fn array_configuration_builds_a_multi_compiler() {
    let handle = build_sync(json!([{ "name": "a" }, { "name": "b", "dependencies": ["a"] }])).unwrap();

    let multi = handle.as_multi().unwrap();
    assert_eq!(multi.len(), 2);
    assert_eq!(multi.dependencies_of(1), vec!["a"]);
}

#[test]
fn invalid_configuration_without_callback_is_returned() {
    let err = build(json!({ "mode": "fast", "watch": "yes" }), None).unwrap_err();

    let Error::Config(config) = &err else {
        panic!("expected a configuration error");
    };
    assert_eq!(config.violations().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn invalid_configuration_is_delivered_after_build_returns() {
    let delivered = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let flag = delivered.clone();
    let handle = build_with_callback(json!({ "mode": "fast" }), move |result| {
        flag.store(true, Ordering::SeqCst);
        let _ = tx.send(result);
    });

    assert!(handle.is_none());
    assert!(!delivered.load(Ordering::SeqCst));

    let result = rx.recv().await.unwrap();
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(delivered.load(Ordering::SeqCst));
}

#[test]
fn watch_without_callback_is_ignored_with_a_warning() {
    let log = EventLog::new();
    let handle = build_sync(raw(json!({ "watch": true }), &log)).unwrap();

    assert!(deprecation::was_emitted(WATCH_WITHOUT_CALLBACK));
    assert!(handle.wants_watch());
    assert_eq!(handle.as_compiler().unwrap().state(), CompilerState::Idle);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn callback_receives_stats_and_the_compiler_is_closed() {
    let log = EventLog::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = build_with_callback(raw(json!({ "entry": "./src/index.js" }), &log), move |result| {
        let _ = tx.send(result);
    })
    .unwrap();

    let stats = rx.recv().await.unwrap().unwrap();
    assert!(!stats.has_errors());
    let BuildStats::Single(stats) = stats else {
        panic!("expected single-target stats");
    };
    assert_eq!(stats.compilation().entry_dependencies()[0].request, "./src/index.js");

    let compiler = handle.as_compiler().unwrap();
    assert_eq!(compiler.state(), CompilerState::Closed);
    assert_eq!(log.count("c:done"), 1);
    assert_eq!(log.count("c:shutdown"), 1);
}

#[tokio::test]
async fn close_failure_is_reported_after_a_successful_run() {
    let log = EventLog::new();
    let teardown = Plugin::function(|compiler| {
        compiler
            .hooks
            .shutdown
            .tap("teardown", |_| Err(Error::plugin("teardown", "resources busy")));
        Ok(())
    });
    let (tx, mut rx) = mpsc::unbounded_channel();

    build_with_callback(raw(json!({}), &log).plugin(teardown), move |result| {
        let _ = tx.send(result);
    });

    let result = rx.recv().await.unwrap();
    assert!(matches!(result, Err(Error::Plugin { ref plugin, .. }) if plugin == "teardown"));
    assert_eq!(log.count("c:done"), 1);
}

#[tokio::test]
async fn run_failure_wins_over_close_failure() {
    let log = EventLog::new();
    let failing = Plugin::function(|compiler| {
        compiler
            .hooks
            .make
            .tap("make", |_| Err(Error::plugin("make", "broken")));
        compiler
            .hooks
            .shutdown
            .tap("teardown", |_| Err(Error::plugin("teardown", "busy")));
        Ok(())
    });
    let (tx, mut rx) = mpsc::unbounded_channel();

    build_with_callback(raw(json!({}), &log).plugin(failing), move |result| {
        let _ = tx.send(result);
    });

    let result = rx.recv().await.unwrap();
    assert!(matches!(result, Err(Error::Plugin { ref plugin, .. }) if plugin == "make"));
    assert_eq!(log.count("c:shutdown"), 1);
}

#[tokio::test]
async fn watch_with_callback_starts_a_session() {
    let log = EventLog::new();
    let watcher = ManualWatchFileSystem::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = build_with_callback(
        raw(json!({ "watch": true }), &log).plugin(manual_watch(watcher.clone())),
        move |result| {
            let _ = tx.send(result);
        },
    )
    .unwrap();

    rx.recv().await.unwrap().unwrap();
    let compiler = handle.as_compiler().unwrap().clone();
    assert_eq!(compiler.state(), CompilerState::Watching);

    watcher.change(compiler.context().join("src/index.js")).await;
    rx.recv().await.unwrap().unwrap();

    handle.close().await.unwrap();
    assert_eq!(log.count("c:watchRun"), 2);
    assert_eq!(log.count("c:beforeRun"), 0);
    assert_eq!(log.count("c:watchClose"), 1);
    assert_eq!(compiler.state(), CompilerState::Closed);
}
