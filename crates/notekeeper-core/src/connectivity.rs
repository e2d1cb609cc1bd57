//! Network reachability as seen by the sync reconciler.

use async_trait::async_trait;
use tokio::sync::watch;

/// Source of online/offline state
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Whether the device currently reports a network path
    fn is_online(&self) -> bool;

    /// Suspend until the device reports a network path again
    async fn wait_until_online(&self);
}

/// Connectivity flag driven by the host (OS events or CLI flags).
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self { state }
    }

    /// Record a connectivity change; waiters are woken when it goes online.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "Connectivity changed");
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    async fn wait_until_online(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|online| *online).await;
    }
}
