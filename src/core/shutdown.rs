//! OS termination signals for [`Service::run_until_signal`](crate::Service::run_until_signal).

/// Waits for SIGINT or SIGTERM (any platform's Ctrl-C equivalent).
///
/// Each call installs independent listeners. Returns `Err` only if signal
/// registration itself fails.
#[cfg(unix)]
pub(crate) async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = sigterm.recv() => Ok(()),
    }
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
