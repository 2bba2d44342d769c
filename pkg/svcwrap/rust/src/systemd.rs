// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Service host backed by systemd.
//!
//! Running as a service means being started by systemd from a unit whose
//! `ExecStart` is this executable. Control actions shell out to `systemctl`.

use crate::logger::{LogFacade, Logger};
use crate::service::{ControlAction, Program, ServiceConfig, ServiceHost, ServiceStatus};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::fs::{OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
const DEFAULT_SYSTEMCTL: &str = "systemctl";
const UNIT_DIR_ENV: &str = "DD_SVCWRAP_UNIT_DIR";
const SYSTEMCTL_ENV: &str = "DD_SVCWRAP_SYSTEMCTL";
const UNIT_FILE_MODE: u32 = 0o644;

pub struct SystemdHost {
    service: ServiceConfig,
    interactive: bool,
    unit_dir: PathBuf,
    systemctl: PathBuf,
    stop_requested: CancellationToken,
    errors: Mutex<Option<mpsc::Sender<anyhow::Error>>>,
}

impl SystemdHost {
    /// Register `service`, taking the unit directory and `systemctl` binary
    /// from the environment when overridden.
    pub fn new(service: ServiceConfig) -> Result<Self> {
        let unit_dir = std::env::var_os(UNIT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UNIT_DIR));
        let systemctl = std::env::var_os(SYSTEMCTL_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEMCTL));
        Self::with_paths(service, unit_dir, systemctl)
    }

    pub fn with_paths(
        service: ServiceConfig,
        unit_dir: impl Into<PathBuf>,
        systemctl: impl Into<PathBuf>,
    ) -> Result<Self> {
        if service.name.is_empty() {
            bail!("service name must not be empty");
        }
        if service.name.contains('/') {
            bail!("service name {:?} must not contain '/'", service.name);
        }
        Ok(Self {
            service,
            interactive: detect_interactive(),
            unit_dir: unit_dir.into(),
            systemctl: systemctl.into(),
            stop_requested: CancellationToken::new(),
            errors: Mutex::new(None),
        })
    }

    /// Override the interactive detection.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    fn unit_name(&self) -> String {
        format!("{}.service", self.service.name)
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }

    /// Logger for operator diagnostics. Errors the host cannot return to a
    /// caller are pushed to `errors` until [`close_errors`](Self::close_errors).
    pub fn logger(&self, errors: mpsc::Sender<anyhow::Error>) -> Arc<dyn Logger> {
        if let Ok(mut slot) = self.errors.lock() {
            *slot = Some(errors);
        }
        Arc::new(LogFacade::new(self.service.name.clone()))
    }

    /// Drop the error sender so the receiving side sees the channel close.
    pub fn close_errors(&self) {
        if let Ok(mut slot) = self.errors.lock() {
            slot.take();
        }
    }

    fn report(&self, err: anyhow::Error) {
        let slot = match self.errors.lock() {
            Ok(slot) => slot,
            Err(_) => {
                warn!("{err:#}");
                return;
            }
        };
        match slot.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.try_send(err) {
                    warn!("dropping service error: {e}");
                }
            }
            None => warn!("{err:#}"),
        }
    }

    /// Start `program`, block until a termination signal or a stop request,
    /// then stop it.
    pub async fn run(&self, program: Arc<dyn Program>) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

        program.start().await?;
        info!(
            "{} started ({})",
            self.service.name,
            if self.interactive {
                "interactive"
            } else {
                "service"
            }
        );

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
            _ = self.stop_requested.cancelled() => info!("stop requested"),
        }

        if let Err(e) = program.stop().await {
            self.report(e.context("failed to stop program"));
        }
        Ok(())
    }

    pub async fn control(&self, action: ControlAction) -> Result<()> {
        debug!("{} {action}", self.service.name);
        match action {
            ControlAction::Install => self.install().await,
            ControlAction::Uninstall => self.uninstall().await,
            ControlAction::Start | ControlAction::Stop | ControlAction::Restart => {
                self.systemctl_checked(&[action.as_str(), &self.unit_name()])
                    .await
                    .map(|_| ())
            }
            ControlAction::Status => {
                let status = self.status().await?;
                info!("{} is {status}", self.service.name);
                Ok(())
            }
        }
    }

    async fn install(&self) -> Result<()> {
        let exe = std::env::current_exe().context("failed to locate the running executable")?;
        let path = self.unit_path();
        let unit = render_unit(&self.service, &exe);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(UNIT_FILE_MODE)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    anyhow::anyhow!("{} is already installed", self.service.name)
                }
                _ => anyhow::Error::new(e).context(format!("failed to create {}", path.display())),
            })?;
        file.write_all(unit.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        // Creation mode is masked by the umask; units must be world-readable.
        file.set_permissions(Permissions::from_mode(UNIT_FILE_MODE))
            .with_context(|| format!("failed to chmod {}", path.display()))?;
        drop(file);

        self.systemctl_checked(&["daemon-reload"]).await?;
        self.systemctl_checked(&["enable", &self.unit_name()]).await?;
        info!("installed {} at {}", self.service.name, path.display());
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        let path = self.unit_path();
        if !path.exists() {
            bail!("{} is not installed", self.service.name);
        }
        self.systemctl_checked(&["disable", &self.unit_name()]).await?;
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        self.systemctl_checked(&["daemon-reload"]).await?;
        info!("uninstalled {}", self.service.name);
        Ok(())
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        if !self.unit_path().exists() {
            return Ok(ServiceStatus::NotInstalled);
        }
        // is-active exits non-zero for anything but "active".
        let output = self.systemctl(&["is-active", &self.unit_name()]).await?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(match state.trim() {
            "active" | "reloading" => ServiceStatus::Running,
            "inactive" | "failed" => ServiceStatus::Stopped,
            other => {
                debug!("unrecognised unit state {other:?}");
                ServiceStatus::Unknown
            }
        })
    }

    async fn systemctl(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.systemctl)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to run {} {}", self.systemctl.display(), args.join(" ")))
    }

    async fn systemctl_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.systemctl(args).await?;
        if !output.status.success() {
            bail!(
                "{} {} failed ({}): {}",
                self.systemctl.display(),
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

impl ServiceHost for SystemdHost {
    fn interactive(&self) -> bool {
        self.interactive
    }

    fn request_stop(&self) {
        self.stop_requested.cancel();
    }

    fn exit(&self, code: i32) {
        log::logger().flush();
        std::process::exit(code);
    }
}

/// systemd sets INVOCATION_ID for every unit it starts; a parent of pid 1
/// covers managers that don't.
fn detect_interactive() -> bool {
    std::env::var_os("INVOCATION_ID").is_none() && nix::unistd::getppid().as_raw() != 1
}

pub fn render_unit(service: &ServiceConfig, exe: &Path) -> String {
    let description = [&service.description, &service.display_name, &service.name]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or_default();
    let exe = exe.display();
    format!(
        "[Unit]\n\
         Description={description}\n\
         ConditionFileIsExecutable={exe}\n\
         After=network.target\n\
         \n\
         [Service]\n\
         StartLimitInterval=5\n\
         StartLimitBurst=10\n\
         ExecStart={exe}\n\
         Restart=always\n\
         RestartSec=120\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}
