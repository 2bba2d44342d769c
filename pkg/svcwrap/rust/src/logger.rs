// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

/// Operator-facing diagnostics. The service host hands one out and the
/// supervisor writes its lifecycle messages to it.
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn warning(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Forwards to the `log` facade, prefixing every line with the service name.
#[derive(Debug, Clone)]
pub struct LogFacade {
    name: String,
}

impl LogFacade {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Logger for LogFacade {
    fn info(&self, msg: &str) {
        log::info!("[{}] {msg}", self.name);
    }

    fn warning(&self, msg: &str) {
        log::warn!("[{}] {msg}", self.name);
    }

    fn error(&self, msg: &str) {
        log::error!("[{}] {msg}", self.name);
    }
}
