// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Result, SupervisorError};
use log::{debug, warn};
use std::ffi::OsStr;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// A command line to launch: used for both the supervised child and the
/// stop command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCommand {
    /// Working directory; empty means the wrapper's own.
    pub dir: String,
    pub exec: String,
    pub args: Vec<String>,
    /// `KEY=VALUE` entries layered over the wrapper's environment.
    pub env: Vec<String>,
}

impl ExternalCommand {
    /// Resolve `exec` through `PATH`. Not cached: every call searches again.
    pub fn resolve(&self) -> Result<PathBuf> {
        look_path(&self.exec)
    }

    /// Parsed environment overrides. Later entries win on duplicate keys.
    pub fn env_overrides(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    Some((key.to_string(), value.to_string()))
                }
                _ => {
                    warn!("ignoring environment entry {entry:?} (expected KEY=VALUE)");
                    None
                }
            })
            .collect()
    }

    fn build(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.args);
        if !self.dir.is_empty() {
            cmd.current_dir(&self.dir);
        }
        cmd.envs(self.env_overrides());
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Spawn `program` with this command's arguments, directory and
    /// environment. The `Command` is dropped before returning, so the
    /// wrapper keeps no copy of the redirected file handles.
    pub fn spawn(&self, program: &Path, stdout: Stdio, stderr: Stdio) -> Result<Child> {
        let mut cmd = self.build(program);
        cmd.stdout(stdout);
        cmd.stderr(stderr);
        debug!(
            "spawning {} (args={:?}, dir={:?})",
            program.display(),
            self.args,
            self.dir
        );
        cmd.spawn().map_err(|source| SupervisorError::Spawn {
            exec: program.display().to_string(),
            source,
        })
    }

    /// Run `program` to completion with its output discarded.
    pub async fn run(&self, program: &Path) -> Result<ExitStatus> {
        let mut child = self.spawn(program, Stdio::null(), Stdio::null())?;
        let exec = program.display().to_string();
        let status = child
            .wait()
            .await
            .map_err(|e| SupervisorError::ChildRun {
                exec: exec.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(SupervisorError::ChildRun {
                exec,
                reason: status.to_string(),
            });
        }
        Ok(status)
    }
}

/// Search for an executable the way a shell does: names containing a slash
/// are checked as-is, bare names are looked up in each `PATH` entry.
pub fn look_path(file: &str) -> Result<PathBuf> {
    look_path_in(file, &std::env::var_os("PATH").unwrap_or_default())
}

fn look_path_in(file: &str, path_var: &OsStr) -> Result<PathBuf> {
    let not_found = |source: io::Error| SupervisorError::ExecutableNotFound {
        path: file.to_string(),
        source,
    };

    if file.is_empty() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::NotFound,
            "no executable configured",
        )));
    }

    if file.contains('/') {
        let path = PathBuf::from(file);
        check_executable(&path).map_err(not_found)?;
        return Ok(path);
    }

    for dir in std::env::split_paths(path_var) {
        // An empty PATH element means the current directory.
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        let candidate = dir.join(file);
        if check_executable(&candidate).is_ok() {
            return Ok(candidate);
        }
    }

    Err(not_found(io::Error::new(
        io::ErrorKind::NotFound,
        "executable file not found in $PATH",
    )))
}

fn check_executable(path: &Path) -> io::Result<()> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "is a directory",
        ));
    }
    if meta.permissions().mode() & 0o111 == 0 {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
    }
    Ok(())
}
