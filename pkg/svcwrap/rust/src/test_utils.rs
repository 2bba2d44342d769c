// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::Config;
use crate::logger::Logger;
use crate::service::ServiceHost;
use crate::state::SupervisorState;
use crate::supervisor::{ChildStatus, ProcessSupervisor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep, timeout};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn make_config(exec: &str, args: Vec<&str>) -> Config {
    Config {
        name: "test-service".to_string(),
        start_exec: exec.to_string(),
        start_args: args.into_iter().map(String::from).collect(),
        ..Default::default()
    }
}

/// Host double that records what the supervisor asked of it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    interactive: bool,
    stop_requests: AtomicUsize,
    exits: Mutex<Vec<i32>>,
}

impl RecordingHost {
    pub fn interactive() -> Arc<Self> {
        Arc::new(Self {
            interactive: true,
            ..Default::default()
        })
    }

    pub fn managed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    pub fn exit_codes(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }

    pub async fn wait_for_stop_requests(&self, count: usize) {
        timeout(WAIT_TIMEOUT, async {
            while self.stop_requests() < count {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("timed out waiting for stop request");
    }
}

impl ServiceHost for RecordingHost {
    fn interactive(&self) -> bool {
        self.interactive
    }

    fn request_stop(&self) {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl CapturingLogger {
    fn push(&self, level: Level, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, msg)| msg.contains(needle))
            .count()
    }

    pub fn with_level(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.with_level(Level::Warning)
    }
}

impl Logger for CapturingLogger {
    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn warning(&self, msg: &str) {
        self.push(Level::Warning, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }
}

pub async fn wait_for_state(sup: &ProcessSupervisor, target: SupervisorState) {
    let mut rx = sup.subscribe_state();
    timeout(WAIT_TIMEOUT, rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for state {target}"))
        .expect("state channel closed");
}

pub async fn wait_for_child(sup: &ProcessSupervisor, pred: impl FnMut(&ChildStatus) -> bool) {
    let mut rx = sup.subscribe_child();
    timeout(WAIT_TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for child status")
        .expect("child channel closed");
}
