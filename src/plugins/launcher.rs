//! Running external plugin binaries.
//!
//! [`ProcessLauncher`] hides how an external plugin is started: by replacing
//! the current process image ([`ExecLauncher`], Unix only), by spawning a
//! child and waiting for it ([`SpawnLauncher`]), or not at all
//! ([`RecordingLauncher`], for tests).

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{KnError, Result};

/// How long a child gets to exit after being interrupted before it is killed.
pub const INTERRUPT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A plugin binary to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Binary path; also passed as `argv[0]`.
    pub program: PathBuf,
    /// Arguments after `argv[0]`.
    pub args: Vec<String>,
    /// Variables added to the inherited environment.
    pub env: Vec<(String, String)>,
}

/// What happened to the launched plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The plugin ran as a child and exited with this code.
    Exited(i32),
    /// The current process image was replaced. Only observable in tests.
    Replaced,
}

/// Starts external plugins.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, request: &LaunchRequest, cancel: CancellationToken)
        -> Result<LaunchOutcome>;

    /// Whether a successful launch never returns to the caller. Callers flush
    /// state (the context cache) before launching when this is true.
    fn replaces_process(&self) -> bool {
        false
    }
}

#[async_trait]
impl<L: ProcessLauncher + ?Sized> ProcessLauncher for Arc<L> {
    async fn launch(
        &self,
        request: &LaunchRequest,
        cancel: CancellationToken,
    ) -> Result<LaunchOutcome> {
        self.as_ref().launch(request, cancel).await
    }

    fn replaces_process(&self) -> bool {
        self.as_ref().replaces_process()
    }
}

// ---------------------------------------------------------------------------
// exec
// ---------------------------------------------------------------------------

/// Replaces the current process with the plugin.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct ExecLauncher;

#[cfg(unix)]
#[async_trait]
impl ProcessLauncher for ExecLauncher {
    async fn launch(
        &self,
        request: &LaunchRequest,
        _cancel: CancellationToken,
    ) -> Result<LaunchOutcome> {
        use std::os::unix::process::CommandExt;

        info!(program = %request.program.display(), "Replacing process with plugin");
        // exec only returns on failure
        let err = std::process::Command::new(&request.program)
            .args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .exec();
        Err(KnError::PluginFailure(format!(
            "cannot execute plugin {}: {}",
            request.program.display(),
            err
        )))
    }

    fn replaces_process(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// spawn
// ---------------------------------------------------------------------------

/// Runs the plugin as a child with inherited stdio and waits for it.
///
/// On cancellation the child is interrupted, given [`INTERRUPT_GRACE_PERIOD`]
/// to exit, then killed.
#[derive(Debug, Clone)]
pub struct SpawnLauncher {
    grace_period: Duration,
}

impl SpawnLauncher {
    pub fn new() -> Self {
        Self {
            grace_period: INTERRUPT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }
}

impl Default for SpawnLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLauncher for SpawnLauncher {
    async fn launch(
        &self,
        request: &LaunchRequest,
        cancel: CancellationToken,
    ) -> Result<LaunchOutcome> {
        let mut child = tokio::process::Command::new(&request.program)
            .args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                KnError::PluginFailure(format!(
                    "cannot start plugin {}: {}",
                    request.program.display(),
                    e
                ))
            })?;
        debug!(program = %request.program.display(), pid = ?child.id(), "Plugin started");

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                interrupt(&mut child);
                match tokio::time::timeout(self.grace_period, child.wait()).await {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!(
                            program = %request.program.display(),
                            "Plugin did not exit after interrupt, killing"
                        );
                        child.kill().await?;
                        child.wait().await?
                    }
                }
            }
        };

        let code = exit_code(status);
        debug!(program = %request.program.display(), code, "Plugin exited");
        Ok(LaunchOutcome::Exited(code))
    }
}

/// Ask the child to stop: SIGINT on Unix, a hard kill elsewhere.
fn interrupt(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: signalling our own child by pid.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGINT);
            }
            return;
        }
    }
    let _ = child.start_kill();
}

/// Exit code of a finished child; `128 + signal` when killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

// ---------------------------------------------------------------------------
// recording
// ---------------------------------------------------------------------------

/// Records launch requests and answers with a fixed exit code.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    exit_code: i32,
    replace: bool,
    launched: Mutex<Vec<LaunchRequest>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every launch with this exit code.
    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    /// Pretend to replace the process instead of spawning.
    pub fn replacing() -> Self {
        Self {
            replace: true,
            ..Default::default()
        }
    }

    pub fn launched(&self) -> Vec<LaunchRequest> {
        self.launched
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn launch(
        &self,
        request: &LaunchRequest,
        _cancel: CancellationToken,
    ) -> Result<LaunchOutcome> {
        if let Ok(mut l) = self.launched.lock() {
            l.push(request.clone());
        }
        if self.replace {
            Ok(LaunchOutcome::Replaced)
        } else {
            Ok(LaunchOutcome::Exited(self.exit_code))
        }
    }

    fn replaces_process(&self) -> bool {
        self.replace
    }
}

/// The launcher for this platform: exec on Unix, spawn elsewhere.
pub fn platform_launcher() -> Box<dyn ProcessLauncher> {
    #[cfg(unix)]
    {
        Box::new(ExecLauncher)
    }
    #[cfg(not(unix))]
    {
        Box::new(SpawnLauncher::new())
    }
}
