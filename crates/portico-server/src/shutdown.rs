//! Graceful shutdown.
//!
//! [`ShutdownSignal`] tells the accept loop and every open connection to
//! stop; [`ConnectionTracker`] lets the server wait for the connections that
//! were still being served when it fired.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable stop flag. Every clone observes the same trigger.
///
/// ```rust
/// use portico_server::ShutdownSignal;
///
/// let signal = ShutdownSignal::new();
/// let observer = signal.clone();
/// signal.trigger();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Triggers the signal. Later calls have no effect.
    pub fn trigger(&self) {
        let was_triggered = self.state.send_replace(true);
        if !was_triggered {
            tracing::debug!("shutdown triggered");
        }
    }

    /// Whether [`trigger`](Self::trigger) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once the signal is triggered, immediately if it already was.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut state = self.state.subscribe();
        async move {
            // The sender lives in `self`, so an error only means every
            // clone is gone and nobody can trigger any more.
            let _ = state.wait_for(|triggered| *triggered).await;
        }
    }

    /// Creates a signal triggered by SIGTERM or SIGINT (Ctrl+C elsewhere).
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            os_signal().await;
            trigger.trigger();
        });
        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for the process to be asked to stop.
///
/// A handler that cannot be installed is logged and never fires.
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(err), _) | (_, Err(err)) => {
                    tracing::error!(error = %err, "failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!(signal = name, "stop requested");
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            return std::future::pending().await;
        }
        tracing::info!(signal = "ctrl-c", "stop requested");
    }
}

/// Counts the connections being served.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self {
            active: Arc::new(active),
        }
    }

    /// Registers a connection until the returned token is dropped.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.send_modify(|count| *count += 1);
        ConnectionToken {
            active: Arc::clone(&self.active),
        }
    }

    /// Number of live tokens.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        *self.active.borrow()
    }

    /// Completes when no token is live.
    pub async fn wait_for_shutdown(&self) {
        let mut active = self.active.subscribe();
        let _ = active.wait_for(|count| *count == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the lifetime of one connection.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_shared_and_idempotent() {
        let signal = ShutdownSignal::default();
        let observer = signal.clone();
        assert!(!observer.is_shutdown());

        signal.trigger();
        signal.trigger();
        assert!(observer.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_waits_for_trigger() {
        let signal = ShutdownSignal::new();
        let waiting = tokio::spawn(signal.recv());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiting.is_finished());

        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("recv should complete")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_recv_after_trigger_is_immediate() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[test]
    fn test_tokens_are_counted() {
        let tracker = ConnectionTracker::default();
        let first = tracker.acquire();
        let second = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(first);
        assert_eq!(tracker.active_connections(), 1);
        drop(second);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_wait_without_connections_is_immediate() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.wait_for_shutdown())
            .await
            .expect("no connections to wait for");
    }

    #[tokio::test]
    async fn test_wait_until_last_token_dropped() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = tracker.clone();
        let waiting = tokio::spawn(async move { waiter.wait_for_shutdown().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiting.is_finished());

        drop(token);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
    }
}
