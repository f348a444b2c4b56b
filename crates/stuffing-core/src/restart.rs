//! Process-restart primitive
//!
//! Switching app families only takes full effect after the host process is
//! terminated and relaunched. The manager consumes that capability through
//! [`ProcessRestarter`] and treats it as fire-and-forget: no return value is
//! observed, since the process is not expected to survive the call.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Terminates the current process and relaunches it.
pub trait ProcessRestarter: Send + Sync {
    fn restart(&self);
}

/// [`ProcessRestarter`] that spawns a fresh copy of the current executable
/// and then exits the calling process.
///
/// By default the relaunch reuses the original command-line arguments;
/// [`ExecRestarter::with_args`] relaunches with a fixed argument list
/// instead, which lets a host boot straight into its routing flow.
#[derive(Debug, Default)]
pub struct ExecRestarter {
    args: Option<Vec<String>>,
}

impl ExecRestarter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relaunch with `args` instead of the original command line.
    pub fn with_args(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
        }
    }
}

impl ProcessRestarter for ExecRestarter {
    fn restart(&self) {
        let exe = match std::env::current_exe() {
            Ok(exe) => exe,
            Err(e) => {
                tracing::error!("cannot restart: current executable unknown: {e}");
                return;
            }
        };

        let args: Vec<String> = match &self.args {
            Some(args) => args.clone(),
            None => std::env::args().skip(1).collect(),
        };

        tracing::info!(exe = %exe.display(), "restarting host process");
        match std::process::Command::new(&exe).args(&args).spawn() {
            Ok(_) => std::process::exit(0),
            Err(e) => tracing::error!("failed to relaunch {}: {e}", exe.display()),
        }
    }
}

/// Test double that records restart requests instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingRestarter {
    restarts: AtomicUsize,
}

impl RecordingRestarter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of restarts requested so far.
    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl ProcessRestarter for RecordingRestarter {
    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}
