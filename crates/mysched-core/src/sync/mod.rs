//! Sync cycle between the local record store and a remote user data store.

use serde::Serialize;

use crate::models::UserData;
use crate::remote::RemoteUserData;
use crate::services::RecordStore;
use crate::Result;

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Local records that were waiting to be synced
    pub pending: usize,
    /// Local records replaced or added from the remote side
    pub pulled: usize,
    /// Whether the remote document was replaced
    pub pushed: bool,
    /// Pending flags cleared after the cycle
    pub cleared: usize,
}

impl SyncReport {
    /// True when neither side had anything new for the other.
    pub const fn is_noop(&self) -> bool {
        self.pulled == 0 && !self.pushed
    }
}

/// Run one sync cycle.
///
/// Remote records are applied to the store first, so a remote record that
/// loses to a local one lands in the conflict log. The store lock is never held
/// across remote I/O. A cycle that fails midway leaves every local write
/// pending, so the next cycle retries it.
pub async fn sync_user_data<R: RemoteUserData>(
    store: &RecordStore,
    remote: &R,
) -> Result<SyncReport> {
    let remote_data = remote.fetch().await?;
    let pulled = store.apply_remote(&remote_data).await?;

    let (local, pending) = store.snapshot_and_pending().await?;
    let merged = UserData::reconcile(&local, &remote_data, store.tie_break());
    let pushed = merged != remote_data;
    if pushed {
        remote.push(&merged).await?;
    }
    let cleared = store.clear_pending(&pending).await?;

    let report = SyncReport {
        pending: pending.len(),
        pulled,
        pushed,
        cleared,
    };
    tracing::info!(
        account = store.account(),
        pending = report.pending,
        pulled = report.pulled,
        pushed = report.pushed,
        "Sync cycle complete"
    );
    Ok(report)
}
