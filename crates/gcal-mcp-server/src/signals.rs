//! Shutdown on SIGTERM/SIGINT.
//!
//! Host applications normally stop the server by closing stdin; signals
//! cover the rest. Every waiter observes the same flag, which only ever
//! goes from `false` to `true`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Owns the shutdown flag and the task that sets it on a signal.
#[derive(Default)]
pub struct SignalHandler {
    flag: ShutdownHandle,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the task that raises the flag on the first termination signal.
    pub fn spawn_listener(&self) {
        let flag = self.flag.clone();
        tokio::spawn(async move {
            let signal = termination().await;
            info!(signal, "Shutdown requested");
            flag.trigger();
        });
    }

    /// A future-like signal for the serve loop.
    pub fn shutdown(&self) -> ShutdownSignal {
        self.flag.wait()
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.is_shutdown()
    }

    /// Raises the flag without a signal.
    pub fn trigger_shutdown(&self) {
        self.flag.trigger();
    }

    /// A cloneable handle to the same flag.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.flag.clone()
    }
}

/// Completes once shutdown is requested.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // All senders dropped counts as shutdown.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Shared access to the shutdown flag.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

#[cfg(unix)]
async fn termination() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        },
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Cannot install signal handlers, listening for Ctrl+C only");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn termination() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
