// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::command::ExternalCommand;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "DD_SVCWRAP_CONFIG";
const CONFIG_EXTENSION: &str = "json";
pub const DEFAULT_LOG_FILE_MODE: u32 = 0o600;

/// Descriptor of the wrapped command. Every field is optional in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub name: String,
    pub display_name: String,
    pub description: String,

    pub start_dir: String,
    pub start_exec: String,
    pub start_args: Vec<String>,
    pub start_env: Vec<String>,

    pub stdout: String,
    pub stderr: String,
    /// Octal creation mode for the stdout/stderr files, e.g. "600".
    pub log_file_mode: Option<String>,

    pub stop_dir: String,
    pub stop_exec: String,
    pub stop_args: Vec<String>,
    pub stop_env: Vec<String>,
}

impl Config {
    pub fn start_command(&self) -> ExternalCommand {
        ExternalCommand {
            dir: self.start_dir.clone(),
            exec: self.start_exec.clone(),
            args: self.start_args.clone(),
            env: self.start_env.clone(),
        }
    }

    pub fn stop_command(&self) -> ExternalCommand {
        ExternalCommand {
            dir: self.stop_dir.clone(),
            exec: self.stop_exec.clone(),
            args: self.stop_args.clone(),
            env: self.stop_env.clone(),
        }
    }

    /// Name used in log lines; falls back to `Name` when no display name is set.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn log_file_mode(&self) -> Result<u32> {
        let Some(ref raw) = self.log_file_mode else {
            return Ok(DEFAULT_LOG_FILE_MODE);
        };
        let digits = raw.trim().trim_start_matches("0o");
        let mode = u32::from_str_radix(digits, 8)
            .with_context(|| format!("LogFileMode {raw:?} is not an octal mode"))?;
        if mode > 0o777 {
            bail!("LogFileMode {raw:?} is out of range (max 777)");
        }
        Ok(mode)
    }

    pub fn validate(&self) -> Result<()> {
        self.log_file_mode()?;
        Ok(())
    }
}

/// `DD_SVCWRAP_CONFIG` if set, otherwise `<exe dir>/<exe stem>.json`.
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    Ok(config_path_for(&exe))
}

fn config_path_for(exe: &Path) -> PathBuf {
    let stem = exe.file_stem().unwrap_or(exe.as_os_str());
    exe.with_file_name(format!("{}.{CONFIG_EXTENSION}", stem.to_string_lossy()))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}
