//! Periodic liveness sweep.
//!
//! The monitor is policy-free: it runs a [`LivenessCheck`] on a fixed interval
//! and yields the per-role result only when it changes. What counts as "live"
//! is decided by the check.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use devlaunch_core::{PortRegistryPort, Role};
use futures_util::Stream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Advisory up/down signal per role.
pub type LivenessSnapshot = BTreeMap<Role, bool>;

/// One round of the sweep.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    async fn check(&self) -> LivenessSnapshot;
}

/// A role is live when any of its candidate ports is in use.
///
/// Ports are probed in order and probing stops at the first hit.
pub async fn probe_any(registry: &dyn PortRegistryPort, ports: &[u16]) -> bool {
    for &port in ports {
        if registry.is_port_in_use(port).await {
            return true;
        }
    }
    false
}

/// Runs a [`LivenessCheck`] on a fixed interval until cancelled.
pub struct LivenessMonitor {
    interval: Duration,
    cancel_token: CancellationToken,
}

impl LivenessMonitor {
    pub const fn new(check_interval: Duration, cancel_token: CancellationToken) -> Self {
        Self {
            interval: check_interval,
            cancel_token,
        }
    }

    /// Stream of snapshots, yielding only when a role's liveness changes.
    ///
    /// The first completed check always yields. Completes when the cancellation
    /// token fires.
    pub fn monitor<C>(self, check: Arc<C>) -> impl Stream<Item = LivenessSnapshot> + Send
    where
        C: LivenessCheck + ?Sized + 'static,
    {
        let cancel_token = self.cancel_token;
        let check_interval = self.interval;

        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last: Option<LivenessSnapshot> = None;
            debug!(interval_ms = check_interval.as_millis(), "Starting liveness sweep");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let current = check.check().await;
                        if last.as_ref() != Some(&current) {
                            debug!(?current, ?last, "Liveness changed");
                            yield current.clone();
                            last = Some(current);
                        }
                    }
                    () = cancel_token.cancelled() => {
                        debug!("Liveness sweep cancelled");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence, repeating the last entry.
    struct Scripted {
        script: Vec<LivenessSnapshot>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LivenessCheck for Scripted {
        async fn check(&self) -> LivenessSnapshot {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.script[n.min(self.script.len() - 1)].clone()
        }
    }

    fn snapshot(frontend: bool) -> LivenessSnapshot {
        BTreeMap::from([(Role::Frontend, frontend), (Role::Backend, false)])
    }

    #[tokio::test]
    async fn test_yields_only_on_change() {
        let check = Arc::new(Scripted {
            script: vec![snapshot(false), snapshot(false), snapshot(true), snapshot(true)],
            calls: AtomicUsize::new(0),
        });
        let token = CancellationToken::new();
        let stream = LivenessMonitor::new(Duration::from_millis(5), token.clone())
            .monitor(Arc::clone(&check));
        tokio::pin!(stream);

        assert_eq!(stream.next().await, Some(snapshot(false)));
        assert_eq!(stream.next().await, Some(snapshot(true)));
        assert!(check.calls.load(Ordering::SeqCst) >= 3);

        token.cancel();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick_completes() {
        let check = Arc::new(Scripted {
            script: vec![snapshot(true)],
            calls: AtomicUsize::new(0),
        });
        let token = CancellationToken::new();
        token.cancel();
        let stream =
            LivenessMonitor::new(Duration::from_secs(60), token).monitor(Arc::clone(&check));
        tokio::pin!(stream);

        // Either the immediate first tick or the cancellation wins; the stream ends.
        let items: Vec<_> = stream.collect().await;
        assert!(items.len() <= 1);
    }

    struct FixedRegistry(Mutex<Vec<u16>>);

    #[async_trait]
    impl PortRegistryPort for FixedRegistry {
        async fn is_port_in_use(&self, port: u16) -> bool {
            self.0.lock().unwrap().contains(&port)
        }

        async fn clean_stray_listeners(
            &self,
            _ports: &[u16],
            _name_filter: &[String],
        ) -> devlaunch_core::CleanupReport {
            devlaunch_core::CleanupReport::default()
        }
    }

    #[tokio::test]
    async fn test_probe_any() {
        let registry = FixedRegistry(Mutex::new(vec![5175]));
        assert!(probe_any(&registry, &[5173, 5174, 5175]).await);
        assert!(!probe_any(&registry, &[5000]).await);
        assert!(!probe_any(&registry, &[]).await);
    }
}
