// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::service::Program;
use crate::supervisor::ProcessSupervisor;
use async_trait::async_trait;
use log::error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exposes a [`ProcessSupervisor`] to the service host as a [`Program`].
pub struct ServiceHostAdapter {
    supervisor: Arc<ProcessSupervisor>,
}

impl ServiceHostAdapter {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl Program for ServiceHostAdapter {
    async fn start(&self) -> anyhow::Result<()> {
        self.supervisor.start()?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.supervisor.stop().await;
        Ok(())
    }
}

/// Drain errors the host reports asynchronously and log them. The task ends
/// once every sender is dropped.
pub fn spawn_error_reporter(mut errors: mpsc::Receiver<anyhow::Error>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(err) = errors.recv().await {
            error!("{err:#}");
        }
    })
}
