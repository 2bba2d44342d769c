// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Config loaded, Start not called yet.
    Idle,
    /// Start succeeded; the run task owns the child.
    Running,
    /// Stop sequence in progress.
    Stopping,
    /// Stop sequence completed.
    Stopped,
}

impl SupervisorState {
    /// Stop is accepted from `Idle` so a shutdown request that races ahead of
    /// Start still leaves the supervisor in a terminal state.
    pub(crate) fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Idle, Stopping) | (Running, Stopping) | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Stopping => write!(f, "stopping"),
            SupervisorState::Stopped => write!(f, "stopped"),
        }
    }
}
