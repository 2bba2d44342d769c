// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Run an arbitrary command as an OS service.
//!
//! The supervisor starts one child process, redirects its output streams,
//! waits for it to exit and runs an orderly stop sequence (optional stop
//! command, then a forced kill). The service host decides whether the
//! wrapper is running in the foreground or under the service manager.

pub mod adapter;
pub mod command;
pub mod config;
pub mod error;
pub mod logger;
pub mod service;
pub mod signal;
pub mod state;
pub mod stdio;
pub mod supervisor;
pub mod systemd;

#[cfg(test)]
mod test_utils;

pub use error::SupervisorError;
pub use supervisor::ProcessSupervisor;
