//! Shutdown handling and loop pacing helpers.

use std::time::Duration;

use alloy::primitives::Address;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Fires the shutdown handles.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Cooperative shutdown handle checked by long-running tasks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger and handle.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    /// Ask every handle to stop.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// A new handle for this trigger.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    /// Whether shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `duration` unless shutdown comes first.
    ///
    /// Returns `true` if interrupted by shutdown.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let interrupted = tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.wait() => true,
        };
        interrupted || self.is_triggered()
    }
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Per-account delay spreading several bots on one host.
///
/// `step * (h mod buckets)` where `h` is a fixed fold over the address bytes,
/// so the same account always gets the same delay.
pub fn account_jitter(account: Address, step: Duration, buckets: u64) -> Duration {
    if buckets == 0 {
        return Duration::ZERO;
    }
    let hash = account
        .as_slice()
        .iter()
        .fold(0u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(*byte)));
    step * ((hash % buckets) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_is_stable_and_bounded() {
        let step = Duration::from_millis(100);
        let account = Address::repeat_byte(0x42);

        let first = account_jitter(account, step, 3);
        assert_eq!(first, account_jitter(account, step, 3));
        assert!(first <= Duration::from_millis(200));
        assert_eq!(first.as_millis() % 100, 0);
    }

    #[test]
    fn jitter_spreads_accounts() {
        let step = Duration::from_millis(100);
        let delays: std::collections::HashSet<_> = (0u8..32)
            .map(|b| account_jitter(Address::repeat_byte(b), step, 3))
            .collect();
        assert!(delays.len() > 1);
    }

    #[test]
    fn zero_buckets_means_no_jitter() {
        assert_eq!(
            account_jitter(Address::ZERO, Duration::from_millis(100), 0),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn trigger_interrupts_sleep() {
        let (trigger, mut shutdown) = shutdown_channel();
        assert!(!shutdown.is_triggered());

        trigger.trigger();
        let interrupted = shutdown.sleep(Duration::from_secs(60)).await;

        assert!(interrupted);
        assert!(trigger.subscribe().is_triggered());
    }

    #[test]
    fn wait_resolves_only_after_trigger() {
        let (trigger, mut shutdown) = shutdown_channel();
        let mut wait = tokio_test::task::spawn(shutdown.wait());

        tokio_test::assert_pending!(wait.poll());
        trigger.trigger();
        tokio_test::assert_ready!(wait.poll());
    }

    #[test]
    fn dropped_trigger_never_fires() {
        let (trigger, mut shutdown) = shutdown_channel();
        drop(trigger);

        let mut wait = tokio_test::task::spawn(shutdown.wait());
        tokio_test::assert_pending!(wait.poll());
        drop(wait);
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn sleep_completes_without_trigger() {
        let (_trigger, mut shutdown) = shutdown_channel();
        assert!(!shutdown.sleep(Duration::from_millis(5)).await);
    }
}
