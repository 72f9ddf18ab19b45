//! Stop a running tool: SIGTERM first, forced kill after a grace period.

use std::time::Duration;
use tokio::process::Child;

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; `pid` is our own un-reaped child.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

/// Ends `child` and reaps it. Never fails; problems are logged.
pub(crate) async fn stop(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if send_sigterm(pid) {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(pid, %status, "tool exited after SIGTERM");
                    return;
                }
                Ok(Err(e)) => tracing::debug!(pid, "wait after SIGTERM failed: {}", e),
                Err(_) => tracing::debug!(pid, "tool ignored SIGTERM; killing"),
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        tracing::debug!("kill tool process: {}", e);
    }
}
