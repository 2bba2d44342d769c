// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn wrapper_command(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dd-svcwrap"));
    cmd.env("DD_SVCWRAP_CONFIG", config)
        .env("DD_SVCWRAP_LOG_LEVEL", "debug")
        // Run in the foreground regardless of how the tests were launched.
        .env_remove("INVOCATION_ID");
    cmd
}

/// Run the wrapper with `args` to completion and capture its output.
pub fn run_wrapper(config: &Path, args: &[&str], extra_env: &[(&str, &Path)]) -> Output {
    let mut cmd = wrapper_command(config);
    cmd.args(args);
    for (key, value) in extra_env {
        cmd.env(key, value);
    }
    cmd.output().expect("failed to run dd-svcwrap")
}

pub fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Handle to a running dd-svcwrap process.
pub struct WrapperHandle {
    child: Child,
    log_lines: Arc<Mutex<Vec<String>>>,
    _readers: Vec<std::thread::JoinHandle<()>>,
}

impl WrapperHandle {
    pub fn start(config: &Path) -> Self {
        let mut child = wrapper_command(config)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start dd-svcwrap");

        let log_lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let stdout = child.stdout.take().expect("failed to capture stdout");
        let stderr = child.stderr.take().expect("failed to capture stderr");
        let readers = vec![
            spawn_reader(stdout, "wrapper", Arc::clone(&log_lines)),
            spawn_reader(stderr, "wrapper:err", Arc::clone(&log_lines)),
        ];

        Self {
            child,
            log_lines,
            _readers: readers,
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Wait until a log line containing `pattern` appears, or timeout.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_log(pattern) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    pub fn has_log(&self, pattern: &str) -> bool {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().any(|l| l.contains(pattern))
    }

    pub fn send_signal(&self, sig: Signal) {
        signal::kill(Pid::from_raw(self.child.id() as i32), sig)
            .expect("failed to signal dd-svcwrap");
    }

    /// Wait for the wrapper to exit, killing it if it outlives `timeout`.
    pub fn wait_with_timeout(&mut self, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait().expect("failed to check wrapper status") {
                Some(status) => return status,
                None => {
                    if Instant::now() >= deadline {
                        self.child.kill().ok();
                        return self.child.wait().expect("failed to wait on killed wrapper");
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }

    /// Extract the child pid from the "spawned (pid=NNN" log line.
    pub fn spawned_pid(&self) -> Option<u32> {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().find_map(|l| {
            let marker = "spawned (pid=";
            let start = l.find(marker)? + marker.len();
            let end = l[start..].find(|c: char| !c.is_ascii_digit())? + start;
            l[start..end].parse().ok()
        })
    }
}

impl Drop for WrapperHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_reader(
    stream: impl Read + Send + 'static,
    tag: &'static str,
    lines: Arc<Mutex<Vec<String>>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(l) => {
                    eprintln!("[{tag}] {l}");
                    lines.lock().unwrap().push(l);
                }
                Err(_) => break,
            }
        }
    })
}

/// Write `json` as the wrapper config in `dir` and return its path.
pub fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("dd-svcwrap.json");
    std::fs::write(&path, json)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

pub fn pid_is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub fn wait_for_pid_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !pid_is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Poll until `path` exists with non-empty content.
pub fn wait_for_file(path: &Path, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path)
            && !contents.trim().is_empty()
        {
            return Some(contents);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
