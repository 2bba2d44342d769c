// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::state::SupervisorState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to find executable {path:?}: {source}")]
    ExecutableNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {exec}: {source}")]
    Spawn {
        exec: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{exec} did not run successfully: {reason}")]
    ChildRun { exec: String, reason: String },

    #[error("supervisor cannot start from state {state}")]
    InvalidState { state: SupervisorState },
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
