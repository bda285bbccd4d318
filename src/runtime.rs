//! Runtime - shutdown signalling for the long-running CLI commands (`watch`, `serve`).

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Cloneable shutdown flag. Every clone observes the same trigger.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `trigger` has been called (immediately if it already was).
    pub async fn wait(&self) {
        let mut rx = self.sender.subscribe();
        loop {
            let triggered = *rx.borrow_and_update();
            if triggered || rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleeps for `interval` unless shutdown comes first. Returns `false` on shutdown.
    pub async fn sleep(&self, interval: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(interval) => !self.is_triggered(),
            _ = self.wait() => false,
        }
    }
}

/// Triggers the returned handle on SIGINT/SIGTERM (Ctrl+C elsewhere).
pub fn install_signal_handlers() -> Shutdown {
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("received SIGTERM"),
                        _ = sigint.recv() => info!("received SIGINT"),
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "signal handlers unavailable, falling back to ctrl-c");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "ctrl-c handler failed");
                return;
            }
            info!("received ctrl-c");
        }

        handle.trigger();
    });

    shutdown
}
