// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use clap::Parser;
use dd_svcwrap::ProcessSupervisor;
use dd_svcwrap::adapter::{ServiceHostAdapter, spawn_error_reporter};
use dd_svcwrap::config::{config_path, load_config};
use dd_svcwrap::service::{ControlAction, ServiceConfig};
use dd_svcwrap::systemd::SystemdHost;
use log::{LevelFilter, error, info};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

const LOG_LEVEL_ENV: &str = "DD_SVCWRAP_LOG_LEVEL";
const ERROR_CHANNEL_CAPACITY: usize = 5;

/// Run a command as a system service.
#[derive(Parser, Debug)]
#[command(name = "dd-svcwrap", version)]
struct Cli {
    /// Control the service instead of running it: start, stop, restart,
    /// install, uninstall or status.
    #[arg(long = "service", value_name = "ACTION")]
    service: Option<String>,
}

/// `DD_SVCWRAP_LOG_LEVEL` wins over `RUST_LOG`; unparseable values fall
/// through to the next source.
fn log_level() -> LevelFilter {
    [LOG_LEVEL_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(log_level())
        .init()
    {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let path = config_path()?;
    let config = Arc::new(load_config(&path)?);
    info!(
        "dd-svcwrap {} loaded {}",
        env!("CARGO_PKG_VERSION"),
        path.display()
    );

    let host = Arc::new(
        SystemdHost::new(ServiceConfig::from(config.as_ref()))
            .context("failed to register service")?,
    );

    let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
    let logger = host.logger(errors_tx);
    let reporter = spawn_error_reporter(errors_rx);

    if let Some(raw) = cli.service {
        let action = match raw.parse::<ControlAction>() {
            Ok(action) => action,
            Err(e) => {
                error!("{e}");
                error!("Valid actions: {}", ControlAction::valid_actions());
                return Ok(ExitCode::FAILURE);
            }
        };
        host.control(action)
            .await
            .with_context(|| format!("service {action} failed"))?;
        return Ok(ExitCode::SUCCESS);
    }

    let supervisor = Arc::new(ProcessSupervisor::new(
        config,
        host.clone(),
        logger.clone(),
    ));
    let program = Arc::new(ServiceHostAdapter::new(supervisor));
    if let Err(e) = host.run(program).await {
        logger.error(&format!("{e:#}"));
    }

    host.close_errors();
    if let Err(e) = reporter.await {
        error!("error reporter failed: {e}");
    }
    Ok(ExitCode::SUCCESS)
}
