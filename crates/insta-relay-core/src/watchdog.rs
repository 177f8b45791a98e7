//! Periodic process restart.
//!
//! The watchdog fires on a fixed interval regardless of traffic and restarts the
//! whole process. It is a last-resort safety net: in-flight requests are
//! abandoned, and their staging scopes are removed by the startup sweep of the
//! next process.

use crate::config::RestartStrategy;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit status used by [`RestartStrategy::Exit`] (`EX_TEMPFAIL`).
///
/// Non-zero so supervisors configured to restart only on failure
/// (`Restart=on-failure`, `--restart on-failure`) relaunch the process.
pub const RESTART_EXIT_CODE: i32 = 75;

/// Action performed when the watchdog fires.
pub trait RestartAction: Send + Sync {
    /// Restarts the process. Only returns if the restart did not happen.
    ///
    /// # Errors
    ///
    /// Returns an error if the relaunch could not be started.
    fn restart(&self) -> Result<()>;
}

/// Relaunches the current executable with the original arguments.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRestart {
    strategy: RestartStrategy,
}

impl ProcessRestart {
    /// Create a restart action using `strategy`.
    #[must_use]
    pub const fn new(strategy: RestartStrategy) -> Self {
        Self { strategy }
    }
}

impl RestartAction for ProcessRestart {
    fn restart(&self) -> Result<()> {
        match self.strategy {
            RestartStrategy::Exit => {
                warn!(code = RESTART_EXIT_CODE, "Watchdog exiting for supervisor restart");
                std::process::exit(RESTART_EXIT_CODE);
            }
            RestartStrategy::Exec => reexec(),
        }
    }
}

#[cfg(unix)]
fn reexec() -> Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().context("cannot resolve current executable")?;
    let args: Vec<_> = std::env::args_os().skip(1).collect();
    warn!(exe = %exe.display(), "Watchdog relaunching process");
    // exec only returns on failure
    let err = std::process::Command::new(&exe).args(args).exec();
    Err(err).with_context(|| format!("exec of {} failed", exe.display()))
}

#[cfg(not(unix))]
fn reexec() -> Result<()> {
    let exe = std::env::current_exe().context("cannot resolve current executable")?;
    let args: Vec<_> = std::env::args_os().skip(1).collect();
    warn!(exe = %exe.display(), "Watchdog relaunching process");
    std::process::Command::new(&exe)
        .args(args)
        .spawn()
        .with_context(|| format!("spawn of {} failed", exe.display()))?;
    std::process::exit(0);
}

/// Repeating restart timer.
#[derive(Debug, Clone, Copy)]
pub struct Watchdog {
    interval: Duration,
}

impl Watchdog {
    /// Create a watchdog firing every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Interval between firings.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the timer task. It fires until `shutdown` is cancelled.
    #[must_use]
    pub fn spawn(
        self,
        action: Arc<dyn RestartAction>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        info!(interval_secs = self.interval().as_secs(), "Watchdog armed");
        tokio::spawn(async move {
            let mut fired: u64 = 0;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        info!(fired, "Watchdog stopped");
                        break;
                    }
                    () = tokio::time::sleep(self.interval) => {
                        fired += 1;
                        warn!(fired, "Watchdog interval elapsed, restarting process");
                        if let Err(e) = action.restart() {
                            error!(error = %e, "Watchdog restart failed; will retry next interval");
                        }
                    }
                }
            }
        })
    }
}
