//! Thread-safe record store for one account.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, SqliteUserDataRepository, UserDataRepository};
use crate::merge::TieBreak;
use crate::models::{
    BookmarkedSession, ReservationStatus, ReservedSession, SessionRecord, SyncConflict, UserData,
    UserRecord,
};
use crate::util::now_millis;
use crate::{Error, Result};

/// Authoritative local set of bookmark and reservation records for the active
/// account.
///
/// Every write is a single read-compare-write transaction taken under the
/// store lock, so readers never observe a state from one write paired with a
/// timestamp from another.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Mutex<Database>>,
    account: Arc<str>,
    tie_break: TieBreak,
}

impl RecordStore {
    /// Open a store backed by the database file at `db_path`.
    pub fn open_path(
        db_path: impl Into<PathBuf>,
        account: impl Into<String>,
        tie_break: TieBreak,
    ) -> Result<Self> {
        let account = normalize_account(account.into())?;
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!(
            "Opened record store at {} for account '{}'",
            db_path.display(),
            account
        );
        Ok(Self::from_database(db, account, tie_break))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory(account: impl Into<String>) -> Result<Self> {
        let account = normalize_account(account.into())?;
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db, account, TieBreak::default()))
    }

    fn from_database(db: Database, account: String, tie_break: TieBreak) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            account: account.into(),
            tie_break,
        }
    }

    /// Use a different tie-break policy for subsequent writes.
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    async fn read<T>(
        &self,
        op: impl FnOnce(&SqliteUserDataRepository<'_>) -> Result<T>,
    ) -> Result<T> {
        let db = self.db.lock().await;
        let repo = SqliteUserDataRepository::new(db.connection(), &self.account);
        op(&repo)
    }

    async fn write<T>(
        &self,
        op: impl FnOnce(&SqliteUserDataRepository<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut db = self.db.lock().await;
        let tx = db.write_transaction()?;
        let value = {
            let repo = SqliteUserDataRepository::new(&tx, &self.account);
            op(&repo)?
        };
        tx.commit()?;
        Ok(value)
    }

    /// Insert or replace a record by last-write-wins.
    ///
    /// Returns whether the store changed. A losing write is dropped without
    /// error.
    pub async fn upsert(&self, record: impl Into<UserRecord>) -> Result<bool> {
        match record.into() {
            UserRecord::Bookmark(record) => self.upsert_bookmark(&record).await,
            UserRecord::Reservation(record) => self.upsert_reservation(&record).await,
        }
    }

    pub async fn upsert_bookmark(&self, record: &BookmarkedSession) -> Result<bool> {
        let policy = self.tie_break;
        self.write(|repo| repo.upsert_bookmark(record, policy, false))
            .await
    }

    pub async fn upsert_reservation(&self, record: &ReservedSession) -> Result<bool> {
        let policy = self.tie_break;
        self.write(|repo| repo.upsert_reservation(record, policy, false))
            .await
    }

    /// Fetch a bookmark, tombstones included.
    pub async fn get_bookmark(&self, session_id: &str) -> Result<Option<BookmarkedSession>> {
        self.read(|repo| repo.get_bookmark(session_id)).await
    }

    /// Fetch a reservation, tombstones included.
    pub async fn get_reservation(&self, session_id: &str) -> Result<Option<ReservedSession>> {
        self.read(|repo| repo.get_reservation(session_id)).await
    }

    /// Bookmarks currently in the schedule, ordered by session id.
    pub async fn list_active_bookmarks(&self) -> Result<Vec<BookmarkedSession>> {
        self.read(|repo| repo.list_bookmarks(true)).await
    }

    /// Reservations that are not deleted, ordered by session id.
    pub async fn list_active_reservations(&self) -> Result<Vec<ReservedSession>> {
        self.read(|repo| repo.list_reservations(true)).await
    }

    /// Active bookmarks and reservations together, ordered by session id.
    pub async fn list_active(&self) -> Result<Vec<UserRecord>> {
        let (bookmarks, reservations) = self
            .read(|repo| Ok((repo.list_bookmarks(true)?, repo.list_reservations(true)?)))
            .await?;
        Ok(combine_records(bookmarks, reservations))
    }

    /// Every record including tombstones, ordered by session id.
    pub async fn list_all(&self) -> Result<Vec<UserRecord>> {
        let (bookmarks, reservations) = self
            .read(|repo| Ok((repo.list_bookmarks(false)?, repo.list_reservations(false)?)))
            .await?;
        Ok(combine_records(bookmarks, reservations))
    }

    pub async fn list_bookmarks(&self) -> Result<Vec<BookmarkedSession>> {
        self.read(|repo| repo.list_bookmarks(false)).await
    }

    pub async fn list_reservations(&self) -> Result<Vec<ReservedSession>> {
        self.read(|repo| repo.list_reservations(false)).await
    }

    pub async fn list_feedback_submitted(&self) -> Result<Vec<String>> {
        self.read(|repo| repo.list_feedback_submitted()).await
    }

    pub async fn has_feedback_submitted(&self, session_id: &str) -> Result<bool> {
        self.read(|repo| repo.has_feedback_submitted(session_id))
            .await
    }

    /// Bookmark or un-bookmark a session as a local user action.
    ///
    /// The record is stamped with the current time, never earlier than one
    /// millisecond after the stored record, and marked pending sync. Asking
    /// for the state the session is already in changes nothing.
    pub async fn set_bookmark(
        &self,
        session_id: &str,
        in_schedule: bool,
    ) -> Result<BookmarkedSession> {
        let now = now_millis();
        let policy = self.tie_break;
        self.write(|repo| {
            let existing = repo.get_bookmark(session_id)?;
            if let Some(existing) = existing.as_ref().filter(|r| r.in_schedule == in_schedule) {
                return Ok(existing.clone());
            }
            let timestamp = local_timestamp(now, existing.as_ref());
            let record = BookmarkedSession::new(session_id, in_schedule, timestamp);
            repo.upsert_bookmark(&record, policy, true)?;
            Ok(record)
        })
        .await
    }

    /// Reserve, waitlist or cancel a session as a local user action.
    pub async fn set_reservation(
        &self,
        session_id: &str,
        status: ReservationStatus,
    ) -> Result<ReservedSession> {
        let now = now_millis();
        let policy = self.tie_break;
        self.write(|repo| {
            let existing = repo.get_reservation(session_id)?;
            if let Some(existing) = existing.as_ref().filter(|r| r.status == status) {
                return Ok(existing.clone());
            }
            let timestamp = local_timestamp(now, existing.as_ref());
            let record = ReservedSession::new(session_id, status, timestamp);
            repo.upsert_reservation(&record, policy, true)?;
            Ok(record)
        })
        .await
    }

    /// Record that feedback was submitted for a session.
    pub async fn mark_feedback_submitted(&self, session_id: &str) -> Result<bool> {
        let now = now_millis();
        self.write(|repo| repo.mark_feedback_submitted(session_id, now, true))
            .await
    }

    /// Every record of the account.
    pub async fn snapshot(&self) -> Result<UserData> {
        self.read(|repo| repo.snapshot()).await
    }

    /// Records written by local actions and not yet synced.
    pub async fn pending(&self) -> Result<UserData> {
        self.read(|repo| repo.pending()).await
    }

    /// The full snapshot and its pending subset, read under one lock so a
    /// concurrent local write shows up in both or in neither.
    pub async fn snapshot_and_pending(&self) -> Result<(UserData, UserData)> {
        self.read(|repo| Ok((repo.snapshot()?, repo.pending()?)))
            .await
    }

    /// Apply records that came from the remote store. Winners are stored as
    /// already synced. Returns the number of records that changed.
    pub async fn apply_remote(&self, data: &UserData) -> Result<usize> {
        self.apply(data, false).await
    }

    /// Apply records from an export file. Winners are marked pending so the
    /// next sync propagates them.
    pub async fn import(&self, data: &UserData) -> Result<usize> {
        self.apply(data, true).await
    }

    async fn apply(&self, data: &UserData, dirty: bool) -> Result<usize> {
        let now = now_millis();
        let policy = self.tie_break;
        self.write(|repo| {
            let mut changed = 0;
            for record in data.bookmarks() {
                changed += usize::from(skip_invalid(
                    repo.upsert_bookmark(&record, policy, dirty),
                    &record,
                )?);
            }
            for record in data.reservations() {
                changed += usize::from(skip_invalid(
                    repo.upsert_reservation(&record, policy, dirty),
                    &record,
                )?);
            }
            for session_id in &data.feedback_submitted_sessions {
                match repo.mark_feedback_submitted(session_id, now, dirty) {
                    Ok(inserted) => changed += usize::from(inserted),
                    Err(Error::InvalidInput(message)) => {
                        tracing::warn!("Skipping invalid feedback entry: {message}");
                    }
                    Err(error) => return Err(error),
                }
            }
            Ok(changed)
        })
        .await
    }

    /// Clear pending flags for records that reached the remote store.
    pub async fn clear_pending(&self, pushed: &UserData) -> Result<usize> {
        self.write(|repo| repo.clear_pending(pushed)).await
    }

    /// Most recent dropped writes first.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.read(|repo| repo.list_conflicts(limit)).await
    }
}

fn normalize_account(account: String) -> Result<String> {
    crate::util::normalize_text_option(Some(account))
        .ok_or_else(|| Error::InvalidInput("account name must not be empty".into()))
}

fn combine_records(
    bookmarks: Vec<BookmarkedSession>,
    reservations: Vec<ReservedSession>,
) -> Vec<UserRecord> {
    let mut records = bookmarks
        .into_iter()
        .map(UserRecord::from)
        .chain(reservations.into_iter().map(UserRecord::from))
        .collect::<Vec<_>>();
    records.sort_by(|a, b| {
        a.session_id()
            .cmp(b.session_id())
            .then_with(|| a.kind().as_str().cmp(b.kind().as_str()))
    });
    records
}

fn local_timestamp<T: SessionRecord>(now: i64, existing: Option<&T>) -> i64 {
    existing.map_or(now, |record| {
        now.max(record.timestamp_utc().saturating_add(1))
    })
}

fn skip_invalid<T: SessionRecord>(outcome: Result<bool>, record: &T) -> Result<bool> {
    match outcome {
        Err(Error::InvalidInput(message)) => {
            tracing::warn!(
                "Skipping invalid {} record '{}': {message}",
                T::KIND,
                record.session_id()
            );
            Ok(false)
        }
        other => other,
    }
}
