//! Shared cross-platform state types.

/// Result of one reconciliation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Pending mutations were applied and local state now mirrors the server.
    Synced,
    /// The device was offline; a retry is scheduled for when it reconnects.
    Offline,
    /// The pass was aborted. Local state keeps its pending markers.
    Failed,
}

impl SyncOutcome {
    pub const fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}
