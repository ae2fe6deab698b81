use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status used when a second signal abandons the drain.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Token cancelled on the first SIGINT (or SIGTERM on unix).
///
/// A second signal while draining exits the process immediately.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            wait_for_signal().await;
            if tx.send(()).is_err() {
                break;
            }
        }
    });

    let trigger = token.clone();
    tokio::spawn(async move {
        if escalate(rx, trigger).await {
            warn!("second signal received; abandoning in-flight jobs");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });
    token
}

/// Cancels `token` on the first signal. Returns true once a second one
/// arrives, false if the signal source goes away first.
async fn escalate(mut signals: mpsc::UnboundedReceiver<()>, token: CancellationToken) -> bool {
    if signals.recv().await.is_none() {
        return false;
    }
    info!("shutdown requested; draining in-flight jobs (signal again to force quit)");
    token.cancel();
    signals.recv().await.is_some()
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
