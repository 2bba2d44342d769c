// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::Config;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle callbacks the service host drives.
#[async_trait]
pub trait Program: Send + Sync {
    /// Must not block until the program finishes.
    async fn start(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
}

/// What the supervisor needs from the service host.
pub trait ServiceHost: Send + Sync {
    /// True when launched by hand rather than by the service manager.
    fn interactive(&self) -> bool;

    /// Ask the host to stop the whole program. The host calls back into
    /// `Program::stop`.
    fn request_stop(&self);

    /// Terminate the process with `code`.
    fn exit(&self, code: i32);
}

/// Identity used to register with the service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub name: String,
    pub display_name: String,
    pub description: String,
}

impl From<&Config> for ServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            display_name: config.display_name.clone(),
            description: config.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
    Install,
    Uninstall,
    Status,
}

impl ControlAction {
    pub const ALL: [ControlAction; 6] = [
        ControlAction::Start,
        ControlAction::Stop,
        ControlAction::Restart,
        ControlAction::Install,
        ControlAction::Uninstall,
        ControlAction::Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Stop => "stop",
            ControlAction::Restart => "restart",
            ControlAction::Install => "install",
            ControlAction::Uninstall => "uninstall",
            ControlAction::Status => "status",
        }
    }

    /// Comma-separated list of every action, for operator messages.
    pub fn valid_actions() -> String {
        Self::ALL
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown service action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for ControlAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    NotInstalled,
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running => write!(f, "running"),
            ServiceStatus::Stopped => write!(f, "stopped"),
            ServiceStatus::NotInstalled => write!(f, "not installed"),
            ServiceStatus::Unknown => write!(f, "unknown"),
        }
    }
}
