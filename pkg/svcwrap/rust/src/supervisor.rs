// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::command::ExternalCommand;
use crate::config::{Config, DEFAULT_LOG_FILE_MODE};
use crate::error::{Result, SupervisorError};
use crate::logger::Logger;
use crate::service::ServiceHost;
use crate::signal::ExitSignal;
use crate::state::SupervisorState;
use crate::stdio::StdioSinks;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    NotSpawned,
    Running { pid: u32 },
    /// `code` is `None` when the child was terminated by a signal.
    Exited { code: Option<i32> },
    /// The run task ended without a child: output could not be attached or
    /// the spawn failed.
    SpawnFailed,
}

impl ChildStatus {
    /// No child is running and none will be spawned.
    pub fn is_terminal(self) -> bool {
        matches!(self, ChildStatus::Exited { .. } | ChildStatus::SpawnFailed)
    }
}

/// Supervises a single child process for a single session.
///
/// `start` resolves the executable and hands the child to a background run
/// task; `stop` runs the stop sequence (exit signal, stop command, forced
/// kill) at most once. Only the run task touches the child handle: `stop`
/// asks it to kill through a token and waits for the exit to be recorded.
pub struct ProcessSupervisor {
    config: Arc<Config>,
    host: Arc<dyn ServiceHost>,
    logger: Arc<dyn Logger>,
    state: watch::Sender<SupervisorState>,
    child: watch::Sender<ChildStatus>,
    exit: ExitSignal,
    kill: CancellationToken,
}

impl ProcessSupervisor {
    pub fn new(config: Arc<Config>, host: Arc<dyn ServiceHost>, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            host,
            logger,
            state: watch::Sender::new(SupervisorState::Idle),
            child: watch::Sender::new(ChildStatus::NotSpawned),
            exit: ExitSignal::new(),
            kill: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn child_status(&self) -> ChildStatus {
        *self.child.borrow()
    }

    pub fn subscribe_child(&self) -> watch::Receiver<ChildStatus> {
        self.child.subscribe()
    }

    pub fn exit_signal(&self) -> &ExitSignal {
        &self.exit
    }

    /// Resolve the start executable and schedule the run task. Returns as
    /// soon as the task is scheduled; the child may not be spawned yet.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let current = self.state();
        if current != SupervisorState::Idle {
            return Err(SupervisorError::InvalidState { state: current });
        }

        let command = self.config.start_command();
        let program = command.resolve()?;

        if self.transition(SupervisorState::Running).is_none() {
            return Err(SupervisorError::InvalidState {
                state: self.state(),
            });
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(command, program).await });
        Ok(())
    }

    async fn run(self: Arc<Self>, command: ExternalCommand, program: PathBuf) {
        self.logger
            .info(&format!("Starting {}", self.config.label()));

        match self.supervise(&command, &program).await {
            Ok(()) => {}
            Err(e @ SupervisorError::Io { .. }) => {
                self.logger
                    .warning(&format!("not starting, cannot attach output: {e}"));
            }
            Err(e) => self.logger.warning(&format!("Error running: {e}")),
        }
        self.child.send_if_modified(|status| {
            if *status == ChildStatus::NotSpawned {
                *status = ChildStatus::SpawnFailed;
                true
            } else {
                false
            }
        });

        if self.host.interactive() {
            self.stop().await;
        } else {
            self.host.request_stop();
        }
    }

    /// Attach output, spawn, and wait for the child to exit or be killed.
    /// The log files are closed when this returns, whatever the outcome.
    async fn supervise(&self, command: &ExternalCommand, program: &Path) -> Result<()> {
        let mode = self
            .config
            .log_file_mode()
            .unwrap_or(DEFAULT_LOG_FILE_MODE);
        let sinks = StdioSinks::open(&self.config.stdout, &self.config.stderr, mode)?;
        let (stdout, stderr) = sinks.into_stdio();

        let mut child = command.spawn(program, stdout, stderr)?;
        let pid = child.id().unwrap_or(0);
        self.child.send_replace(ChildStatus::Running { pid });
        self.logger.info(&format!(
            "spawned (pid={pid}, cmd={})",
            program.display()
        ));

        let waited = tokio::select! {
            status = child.wait() => status,
            _ = self.kill.cancelled() => {
                debug!("terminating pid {pid}");
                if let Err(e) = child.start_kill() {
                    self.logger.warning(&format!("failed to kill pid {pid}: {e}"));
                }
                child.wait().await
            }
        };

        let code = waited.as_ref().ok().and_then(|status| status.code());
        self.child.send_replace(ChildStatus::Exited { code });

        let exec = program.display().to_string();
        let status = waited.map_err(|e| SupervisorError::ChildRun {
            exec: exec.clone(),
            reason: e.to_string(),
        })?;
        self.logger.info(&format!("exited with {status}"));
        if !status.success() {
            return Err(SupervisorError::ChildRun {
                exec,
                reason: status.to_string(),
            });
        }
        Ok(())
    }

    /// Run the stop sequence. Only the first call has side effects; later
    /// calls wait for that sequence to finish.
    pub async fn stop(&self) {
        if !self.exit.fire() {
            debug!("stop already in progress");
            let mut rx = self.state.subscribe();
            let _ = rx.wait_for(|s| *s == SupervisorState::Stopped).await;
            return;
        }
        // Only a supervisor that left Idle has a run task that may own a child.
        let scheduled =
            self.transition(SupervisorState::Stopping) == Some(SupervisorState::Running);

        let stop = self.config.stop_command();
        match stop.resolve() {
            Ok(program) => {
                if let Err(e) = stop.run(&program).await {
                    self.logger.warning(&format!("stop command failed: {e}"));
                }
            }
            Err(e) => self.logger.warning(&e.to_string()),
        }

        self.logger
            .info(&format!("Stopping {}", self.config.label()));
        if scheduled {
            self.terminate_child().await;
        }
        self.transition(SupervisorState::Stopped);

        if self.host.interactive() {
            self.host.exit(0);
        }
    }

    /// Kill the child and wait until the run task records a terminal status.
    /// A child that is not spawned yet is killed as soon as it exists.
    async fn terminate_child(&self) {
        match self.child_status() {
            status if status.is_terminal() => return,
            ChildStatus::Running { pid } => self.logger.info(&format!("killing pid {pid}")),
            _ => debug!("child not spawned yet, killing it once it is"),
        }
        self.kill.cancel();
        let mut rx = self.child.subscribe();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }

    /// Apply `next` if allowed, returning the state it replaced.
    fn transition(&self, next: SupervisorState) -> Option<SupervisorState> {
        let mut previous = self.state();
        let applied = self.state.send_if_modified(|state| {
            previous = *state;
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });
        if !applied {
            debug!("ignoring state transition {previous} -> {next}");
            return None;
        }
        Some(previous)
    }
}
