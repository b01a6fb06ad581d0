// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File watching against a real directory tree

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use assetflow::pipeline::PatternSet;
use assetflow::watch::WatchRegistrar;
use assetflow::{AssetflowError, AssetflowResult, TaskOutcome, TaskRunner};

#[derive(Default)]
struct Recorder {
    runs: Mutex<Vec<String>>,
    fail_first: bool,
}

impl Recorder {
    fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRunner for Recorder {
    async fn run_task(&self, name: &str) -> AssetflowResult<TaskOutcome> {
        let first = {
            let mut runs = self.runs.lock().unwrap();
            runs.push(name.to_string());
            runs.len() == 1
        };
        if self.fail_first && first {
            return Err(AssetflowError::Io {
                message: "compile error".into(),
            });
        }
        Ok(TaskOutcome {
            task: name.to_string(),
            inputs: 0,
            outputs: vec![],
            duration: Duration::ZERO,
        })
    }
}

async fn wait_for_runs(recorder: &Recorder, count: usize, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while recorder.runs().len() < count && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn new_scss_file_triggers_only_scss_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src/scss")).unwrap();
    std::fs::create_dir_all(root.join("src/js")).unwrap();

    let debounce = Duration::from_millis(100);
    let mut registrar = WatchRegistrar::new(&root, debounce);
    registrar
        .register(&PatternSet::from("src/scss/**/*.scss"), "scss")
        .unwrap();
    registrar
        .register(&PatternSet::from("src/js/*.js"), "js")
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let handle = registrar.start(recorder.clone()).unwrap();

    // Give the OS watcher a moment to arm
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(root.join("src/scss/new.scss"), "a { b: c; }").unwrap();

    wait_for_runs(&recorder, 1, Duration::from_secs(5)).await;
    // Anything still pending would arrive within a few debounce windows
    tokio::time::sleep(debounce * 5).await;

    assert_eq!(recorder.runs(), vec!["scss"]);
    handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn unrelated_files_trigger_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src/js")).unwrap();

    let mut registrar = WatchRegistrar::new(&root, Duration::from_millis(50));
    registrar
        .register(&PatternSet::from("src/js/*.js"), "js")
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let handle = registrar.start(recorder.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(root.join("src/js/notes.txt"), "todo").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(recorder.runs().is_empty());
    handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_task_stays_bound() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src/scss")).unwrap();

    let debounce = Duration::from_millis(50);
    let mut registrar = WatchRegistrar::new(&root, debounce);
    registrar
        .register(&PatternSet::from("src/scss/*.scss"), "scss")
        .unwrap();

    let recorder = Arc::new(Recorder {
        fail_first: true,
        ..Recorder::default()
    });
    let handle = registrar.start(recorder.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(root.join("src/scss/main.scss"), "a {").unwrap();
    wait_for_runs(&recorder, 1, Duration::from_secs(5)).await;
    assert_eq!(recorder.runs().len(), 1);

    // Let the first batch settle before the fix lands
    tokio::time::sleep(debounce * 5).await;
    std::fs::write(root.join("src/scss/main.scss"), "a { b: c; }").unwrap();
    wait_for_runs(&recorder, 2, Duration::from_secs(5)).await;

    let runs = recorder.runs();
    assert!(runs.len() >= 2, "second change was not dispatched: {runs:?}");
    assert!(runs.iter().all(|task| task == "scss"));
    handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_watcher_dispatches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src/js")).unwrap();

    let mut registrar = WatchRegistrar::new(&root, Duration::from_millis(50));
    registrar
        .register(&PatternSet::from("src/js/*.js"), "js")
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let handle = registrar.start(recorder.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.stop();

    std::fs::write(root.join("src/js/app.js"), "run();").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(recorder.runs().is_empty());
}
