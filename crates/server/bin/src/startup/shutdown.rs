//! Graceful Shutdown Module
//!
//! Coordinated shutdown for the processor's background tasks:
//! - Signal handlers (SIGTERM, SIGINT)
//! - A stop channel every component watches
//! - Bounded draining of in-flight work

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Shutdown configuration
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight work after the stop signal
    pub timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl ShutdownConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reason for shutdown
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// SIGTERM signal received
    SigTerm,
    /// SIGINT signal received (Ctrl+C)
    SigInt,
    Programmatic(String),
    Unknown,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::SigTerm => write!(f, "SIGTERM"),
            ShutdownReason::SigInt => write!(f, "SIGINT (Ctrl+C)"),
            ShutdownReason::Programmatic(reason) => write!(f, "Programmatic: {}", reason),
            ShutdownReason::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Shutdown state
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownState {
    Running,
    ShuttingDown(ShutdownReason),
}

/// Graceful shutdown coordinator
///
/// Components hold a `watch::Receiver<()>` from [`GracefulShutdown::subscribe`]
/// and stop taking new work once it changes.
#[derive(Clone)]
pub struct GracefulShutdown {
    stop_tx: Arc<watch::Sender<()>>,
    state_tx: Arc<watch::Sender<ShutdownState>>,
    config: Arc<ShutdownConfig>,
}

impl GracefulShutdown {
    pub fn new(config: ShutdownConfig) -> Self {
        let (stop_tx, _) = watch::channel(());
        let (state_tx, _) = watch::channel(ShutdownState::Running);

        Self {
            stop_tx: Arc::new(stop_tx),
            state_tx: Arc::new(state_tx),
            config: Arc::new(config),
        }
    }

    /// Stop channel for a component
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.stop_tx.subscribe()
    }

    /// Trigger shutdown; later calls keep the first reason
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.is_shutting_down() {
            return;
        }
        info!(reason = %reason, "Triggering shutdown");
        self.state_tx
            .send_replace(ShutdownState::ShuttingDown(reason));
        self.stop_tx.send_replace(());
    }

    /// Waits until shutdown has been triggered
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let mut state_rx = self.state_tx.subscribe();
        loop {
            let state = state_rx.borrow_and_update().clone();
            if let ShutdownState::ShuttingDown(reason) = state {
                return reason;
            }
            if state_rx.changed().await.is_err() {
                return ShutdownReason::Unknown;
            }
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state_tx.borrow().clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        matches!(*self.state_tx.borrow(), ShutdownState::ShuttingDown(_))
    }

    /// Waits for every task, bounded by the configured timeout.
    ///
    /// Returns `false` when the timeout elapsed first; the remaining tasks
    /// are aborted.
    pub async fn drain(&self, tasks: Vec<(&'static str, JoinHandle<()>)>) -> bool {
        info!(components = tasks.len(), "Waiting for components to stop");

        let aborts: Vec<_> = tasks
            .iter()
            .map(|(name, handle)| (*name, handle.abort_handle()))
            .collect();

        let joined = timeout(self.config.timeout, async {
            for (name, handle) in tasks {
                match handle.await {
                    Ok(()) => info!(component = name, "Component stopped"),
                    Err(e) => error!(component = name, error = %e, "Component task failed"),
                }
            }
        })
        .await;

        match joined {
            Ok(()) => {
                info!("All components shut down gracefully");
                true
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Shutdown timed out; aborting remaining work");
                for (name, abort) in aborts {
                    if !abort.is_finished() {
                        warn!(component = name, "Aborting component");
                        abort.abort();
                    }
                }
                false
            }
        }
    }
}

/// Start signal handler that triggers graceful shutdown
pub fn start_signal_handler(coordinator: &GracefulShutdown) {
    let coordinator = coordinator.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            match signal::ctrl_c().await {
                Ok(()) => ShutdownReason::SigInt,
                Err(e) => {
                    error!(error = %e, "Failed to register ctrl-c handler");
                    std::future::pending::<ShutdownReason>().await
                }
            }
        };

        let term = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    ShutdownReason::SigTerm
                }
                Err(e) => {
                    error!(error = %e, "Failed to register SIGTERM handler");
                    std::future::pending::<ShutdownReason>().await
                }
            }
        };

        tokio::select! {
            reason = ctrl_c => coordinator.shutdown(reason),
            reason = term => coordinator.shutdown(reason),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_graceful_shutdown_trigger() {
        let shutdown = GracefulShutdown::new(ShutdownConfig::default());

        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.wait_for_signal().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.shutdown(ShutdownReason::Programmatic("Test".to_string()));

        let reason = handle.await.unwrap();
        assert!(matches!(reason, ShutdownReason::Programmatic(_)));
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let shutdown = GracefulShutdown::new(ShutdownConfig::default());
        shutdown.shutdown(ShutdownReason::SigTerm);

        let reason = timeout(Duration::from_secs(1), shutdown.wait_for_signal())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::SigTerm);
    }

    #[tokio::test]
    async fn test_shutdown_state() {
        let shutdown = GracefulShutdown::new(ShutdownConfig::default());

        assert!(!shutdown.is_shutting_down());
        assert_eq!(shutdown.state(), ShutdownState::Running);

        shutdown.shutdown(ShutdownReason::SigInt);
        shutdown.shutdown(ShutdownReason::SigTerm);

        assert!(shutdown.is_shutting_down());
        assert_eq!(
            shutdown.state(),
            ShutdownState::ShuttingDown(ShutdownReason::SigInt)
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_stop() {
        let shutdown = GracefulShutdown::new(ShutdownConfig::default());
        let mut stop_rx = shutdown.subscribe();

        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                shutdown.shutdown(ShutdownReason::SigTerm);
            }
        });

        timeout(Duration::from_secs(1), stop_rx.changed())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let shutdown = GracefulShutdown::new(ShutdownConfig::default());
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        assert!(shutdown.drain(vec![("worker", task)]).await);
    }

    #[tokio::test]
    async fn test_drain_times_out_on_stuck_task() {
        let shutdown = GracefulShutdown::new(
            ShutdownConfig::default().with_timeout(Duration::from_millis(50)),
        );
        let stuck = tokio::spawn(std::future::pending::<()>());

        assert!(!shutdown.drain(vec![("stuck", stuck)]).await);
    }
}
