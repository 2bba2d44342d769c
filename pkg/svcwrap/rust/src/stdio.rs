// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Result, SupervisorError};
use log::debug;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::process::Stdio;

/// Output files for the supervised child. `None` means the stream is not
/// redirected and the child inherits the wrapper's.
#[derive(Debug, Default)]
pub struct StdioSinks {
    stdout: Option<File>,
    stderr: Option<File>,
}

impl StdioSinks {
    /// Open the configured log files. Empty paths are skipped. stderr is
    /// opened first; a failure on either drops whatever was already opened.
    pub fn open(stdout_path: &str, stderr_path: &str, mode: u32) -> Result<Self> {
        let mut sinks = StdioSinks::default();
        if !stderr_path.is_empty() {
            sinks.stderr = Some(open_log(stderr_path, mode)?);
        }
        if !stdout_path.is_empty() {
            sinks.stdout = Some(open_log(stdout_path, mode)?);
        }
        Ok(sinks)
    }

    /// Convert into `(stdout, stderr)` handles for spawning.
    pub fn into_stdio(self) -> (Stdio, Stdio) {
        (to_stdio(self.stdout), to_stdio(self.stderr))
    }
}

fn to_stdio(file: Option<File>) -> Stdio {
    match file {
        Some(file) => Stdio::from(file),
        None => Stdio::inherit(),
    }
}

/// Open `path` for appending, creating it with `mode` if it does not exist.
pub fn open_log(path: &str, mode: u32) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(mode)
        .open(path)
        .map_err(|source| SupervisorError::Io {
            path: path.to_string(),
            source,
        })?;
    debug!("opened {path} for appending");
    Ok(file)
}
