//! User data repository implementation

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::merge::{resolve, Resolution, TieBreak};
use crate::models::{
    BookmarkedSession, RecordKind, ReservationStatus, ReservedSession, SessionRecord,
    SyncConflict, UserData,
};
use crate::util::now_millis;

/// Trait for per-account session record storage.
///
/// Implementations do not open transactions themselves; callers wrap each
/// read-compare-write in one so it is atomic per session.
pub trait UserDataRepository {
    /// Get a bookmark record, including tombstones
    fn get_bookmark(&self, session_id: &str) -> Result<Option<BookmarkedSession>>;

    /// Get a reservation record, including tombstones
    fn get_reservation(&self, session_id: &str) -> Result<Option<ReservedSession>>;

    /// Insert or replace a bookmark if it wins against the stored one.
    ///
    /// Returns whether the row changed. `dirty` marks the row as pending sync
    /// when it is written.
    fn upsert_bookmark(
        &self,
        record: &BookmarkedSession,
        policy: TieBreak,
        dirty: bool,
    ) -> Result<bool>;

    /// Insert or replace a reservation if it wins against the stored one.
    fn upsert_reservation(
        &self,
        record: &ReservedSession,
        policy: TieBreak,
        dirty: bool,
    ) -> Result<bool>;

    /// List bookmarks ordered by session id
    fn list_bookmarks(&self, active_only: bool) -> Result<Vec<BookmarkedSession>>;

    /// List reservations ordered by session id
    fn list_reservations(&self, active_only: bool) -> Result<Vec<ReservedSession>>;

    /// Record that feedback was submitted for a session. Returns false if
    /// it was already recorded.
    fn mark_feedback_submitted(&self, session_id: &str, at: i64, dirty: bool) -> Result<bool>;

    /// Session ids with submitted feedback, ordered
    fn list_feedback_submitted(&self) -> Result<Vec<String>>;

    /// Whether feedback was submitted for one session
    fn has_feedback_submitted(&self, session_id: &str) -> Result<bool>;

    /// Every record of the account as a user data document
    fn snapshot(&self) -> Result<UserData>;

    /// Only the records written locally since the last successful sync
    fn pending(&self) -> Result<UserData>;

    /// Clear pending flags for the pushed records whose stored timestamp is
    /// still the pushed one. Returns the number of rows cleared.
    fn clear_pending(&self, pushed: &UserData) -> Result<usize>;

    /// Most recent dropped writes first
    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// `SQLite` implementation of `UserDataRepository`
pub struct SqliteUserDataRepository<'a> {
    conn: &'a Connection,
    account: &'a str,
}

impl<'a> SqliteUserDataRepository<'a> {
    /// Create a repository scoped to one account
    pub const fn new(conn: &'a Connection, account: &'a str) -> Self {
        Self { conn, account }
    }

    /// Decide whether `incoming` should be written, logging dropped writes.
    fn should_write<T: SessionRecord>(
        &self,
        existing: Option<&T>,
        incoming: &T,
        policy: TieBreak,
    ) -> Result<bool> {
        let Some(existing) = existing else {
            return Ok(true);
        };

        match resolve(existing, incoming, policy) {
            Resolution::Incoming => Ok(true),
            Resolution::Existing => {
                if existing != incoming {
                    let kind = T::KIND;
                    tracing::debug!(
                        kind = %kind,
                        session_id = incoming.session_id(),
                        stored = existing.timestamp_utc(),
                        incoming = incoming.timestamp_utc(),
                        "Dropping stale write"
                    );
                    self.record_conflict(existing, incoming, policy)?;
                }
                Ok(false)
            }
        }
    }

    fn record_conflict<T: SessionRecord>(
        &self,
        existing: &T,
        incoming: &T,
        policy: TieBreak,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_conflicts (account, kind, session_id, stored_timestamp, incoming_timestamp, resolved_at, strategy)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                self.account,
                T::KIND,
                incoming.session_id(),
                existing.timestamp_utc(),
                incoming.timestamp_utc(),
                now_millis(),
                policy.as_str()
            ],
        )?;
        Ok(())
    }

    fn parse_bookmark(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookmarkedSession> {
        Ok(BookmarkedSession {
            session_id: row.get(0)?,
            in_schedule: row.get::<_, i32>(1)? != 0,
            timestamp_utc: row.get(2)?,
        })
    }

    fn parse_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReservedSession> {
        Ok(ReservedSession {
            session_id: row.get(0)?,
            status: row.get(1)?,
            timestamp_utc: row.get(2)?,
        })
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        Ok(SyncConflict {
            id: row.get(0)?,
            kind: row.get(1)?,
            session_id: row.get(2)?,
            stored_timestamp: row.get(3)?,
            incoming_timestamp: row.get(4)?,
            resolved_at: row.get(5)?,
            strategy: row.get(6)?,
        })
    }

    fn query_bookmarks(&self, sql: &str) -> Result<Vec<BookmarkedSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params![self.account], Self::parse_bookmark)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn query_reservations(&self, sql: &str) -> Result<Vec<ReservedSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params![self.account], Self::parse_reservation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn query_feedback(&self, sql: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![self.account], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn collect_user_data(
        bookmarks: Vec<BookmarkedSession>,
        reservations: Vec<ReservedSession>,
        feedback: Vec<String>,
    ) -> UserData {
        let mut data = UserData::default();
        for record in bookmarks {
            data.insert_bookmark(record);
        }
        for record in reservations {
            data.insert_reservation(record);
        }
        data.feedback_submitted_sessions.extend(feedback);
        data
    }
}

impl UserDataRepository for SqliteUserDataRepository<'_> {
    fn get_bookmark(&self, session_id: &str) -> Result<Option<BookmarkedSession>> {
        let record = self
            .conn
            .query_row(
                "SELECT session_id, in_schedule, timestamp_utc FROM bookmarked_sessions
                 WHERE account = ? AND session_id = ?",
                params![self.account, session_id],
                Self::parse_bookmark,
            )
            .optional()?;
        Ok(record)
    }

    fn get_reservation(&self, session_id: &str) -> Result<Option<ReservedSession>> {
        let record = self
            .conn
            .query_row(
                "SELECT session_id, status, timestamp_utc FROM reserved_sessions
                 WHERE account = ? AND session_id = ?",
                params![self.account, session_id],
                Self::parse_reservation,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_bookmark(
        &self,
        record: &BookmarkedSession,
        policy: TieBreak,
        dirty: bool,
    ) -> Result<bool> {
        record.validate()?;
        let existing = self.get_bookmark(&record.session_id)?;
        if !self.should_write(existing.as_ref(), record, policy)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO bookmarked_sessions (account, session_id, in_schedule, timestamp_utc, dirty)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (account, session_id) DO UPDATE SET
                 in_schedule = excluded.in_schedule,
                 timestamp_utc = excluded.timestamp_utc,
                 dirty = excluded.dirty",
            params![
                self.account,
                record.session_id,
                i32::from(record.in_schedule),
                record.timestamp_utc,
                i32::from(dirty)
            ],
        )?;
        Ok(true)
    }

    fn upsert_reservation(
        &self,
        record: &ReservedSession,
        policy: TieBreak,
        dirty: bool,
    ) -> Result<bool> {
        record.validate()?;
        let existing = self.get_reservation(&record.session_id)?;
        if !self.should_write(existing.as_ref(), record, policy)? {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO reserved_sessions (account, session_id, status, timestamp_utc, dirty)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (account, session_id) DO UPDATE SET
                 status = excluded.status,
                 timestamp_utc = excluded.timestamp_utc,
                 dirty = excluded.dirty",
            params![
                self.account,
                record.session_id,
                record.status,
                record.timestamp_utc,
                i32::from(dirty)
            ],
        )?;
        Ok(true)
    }

    fn list_bookmarks(&self, active_only: bool) -> Result<Vec<BookmarkedSession>> {
        if active_only {
            self.query_bookmarks(
                "SELECT session_id, in_schedule, timestamp_utc FROM bookmarked_sessions
                 WHERE account = ? AND in_schedule = 1
                 ORDER BY session_id ASC",
            )
        } else {
            self.query_bookmarks(
                "SELECT session_id, in_schedule, timestamp_utc FROM bookmarked_sessions
                 WHERE account = ?
                 ORDER BY session_id ASC",
            )
        }
    }

    fn list_reservations(&self, active_only: bool) -> Result<Vec<ReservedSession>> {
        if active_only {
            self.query_reservations(
                "SELECT session_id, status, timestamp_utc FROM reserved_sessions
                 WHERE account = ? AND status != 'deleted'
                 ORDER BY session_id ASC",
            )
        } else {
            self.query_reservations(
                "SELECT session_id, status, timestamp_utc FROM reserved_sessions
                 WHERE account = ?
                 ORDER BY session_id ASC",
            )
        }
    }

    fn mark_feedback_submitted(&self, session_id: &str, at: i64, dirty: bool) -> Result<bool> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidInput("session id must not be empty".into()));
        }

        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO feedback_submitted_sessions (account, session_id, submitted_at, dirty)
             VALUES (?, ?, ?, ?)",
            params![self.account, session_id, at, i32::from(dirty)],
        )?;
        Ok(rows > 0)
    }

    fn list_feedback_submitted(&self) -> Result<Vec<String>> {
        self.query_feedback(
            "SELECT session_id FROM feedback_submitted_sessions
             WHERE account = ?
             ORDER BY session_id ASC",
        )
    }

    fn has_feedback_submitted(&self, session_id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM feedback_submitted_sessions WHERE account = ? AND session_id = ?",
                params![self.account, session_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn snapshot(&self) -> Result<UserData> {
        Ok(Self::collect_user_data(
            self.list_bookmarks(false)?,
            self.list_reservations(false)?,
            self.list_feedback_submitted()?,
        ))
    }

    fn pending(&self) -> Result<UserData> {
        let bookmarks = self.query_bookmarks(
            "SELECT session_id, in_schedule, timestamp_utc FROM bookmarked_sessions
             WHERE account = ? AND dirty = 1",
        )?;
        let reservations = self.query_reservations(
            "SELECT session_id, status, timestamp_utc FROM reserved_sessions
             WHERE account = ? AND dirty = 1",
        )?;
        let feedback = self.query_feedback(
            "SELECT session_id FROM feedback_submitted_sessions
             WHERE account = ? AND dirty = 1",
        )?;
        Ok(Self::collect_user_data(bookmarks, reservations, feedback))
    }

    fn clear_pending(&self, pushed: &UserData) -> Result<usize> {
        let mut cleared = 0;

        for record in pushed.bookmarks() {
            cleared += self.conn.execute(
                "UPDATE bookmarked_sessions SET dirty = 0
                 WHERE account = ? AND session_id = ? AND timestamp_utc = ? AND dirty = 1",
                params![self.account, record.session_id, record.timestamp_utc],
            )?;
        }
        for record in pushed.reservations() {
            cleared += self.conn.execute(
                "UPDATE reserved_sessions SET dirty = 0
                 WHERE account = ? AND session_id = ? AND timestamp_utc = ? AND dirty = 1",
                params![self.account, record.session_id, record.timestamp_utc],
            )?;
        }
        for session_id in &pushed.feedback_submitted_sessions {
            cleared += self.conn.execute(
                "UPDATE feedback_submitted_sessions SET dirty = 0
                 WHERE account = ? AND session_id = ? AND dirty = 1",
                params![self.account, session_id],
            )?;
        }

        Ok(cleared)
    }

    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, session_id, stored_timestamp, incoming_timestamp, resolved_at, strategy
             FROM sync_conflicts
             WHERE account = ?
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;
        let conflicts = stmt
            .query_map(params![self.account, limit], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conflicts)
    }
}

impl ToSql for ReservationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReservationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for RecordKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecordKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    const ACCOUNT: &str = "attendee@example.com";

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get_bookmark() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);

        let record = BookmarkedSession::new("s1", true, 1000);
        assert!(repo
            .upsert_bookmark(&record, TieBreak::default(), false)
            .unwrap());
        assert_eq!(repo.get_bookmark("s1").unwrap(), Some(record));
        assert_eq!(repo.get_bookmark("missing").unwrap(), None);
    }

    #[test]
    fn test_stale_write_is_dropped_and_logged() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);

        repo.upsert_bookmark(&BookmarkedSession::new("s1", true, 1000), TieBreak::default(), false)
            .unwrap();
        let changed = repo
            .upsert_bookmark(&BookmarkedSession::new("s1", false, 500), TieBreak::default(), false)
            .unwrap();
        assert!(!changed);
        assert_eq!(
            repo.get_bookmark("s1").unwrap(),
            Some(BookmarkedSession::new("s1", true, 1000))
        );

        let conflicts = repo.list_conflicts(10).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, RecordKind::Bookmark);
        assert_eq!(conflicts[0].stored_timestamp, 1000);
        assert_eq!(conflicts[0].incoming_timestamp, 500);
        assert_eq!(conflicts[0].strategy, "prefer_active");
    }

    #[test]
    fn test_identical_replay_is_not_a_conflict() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);
        let record = ReservedSession::new("s2", ReservationStatus::Reserved, 200);

        assert!(repo.upsert_reservation(&record, TieBreak::default(), false).unwrap());
        assert!(!repo.upsert_reservation(&record, TieBreak::default(), false).unwrap());
        assert!(repo.list_conflicts(10).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_records_are_never_stored() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);

        assert!(repo
            .upsert_bookmark(&BookmarkedSession::new("", true, 1), TieBreak::default(), false)
            .is_err());
        assert!(repo
            .upsert_reservation(
                &ReservedSession::new("s", ReservationStatus::Reserved, -1),
                TieBreak::default(),
                false
            )
            .is_err());
        assert!(repo.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_list_active_excludes_tombstones_in_id_order() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);
        let policy = TieBreak::default();

        repo.upsert_reservation(&ReservedSession::new("c", ReservationStatus::Waitlisted, 1), policy, false)
            .unwrap();
        repo.upsert_reservation(&ReservedSession::new("a", ReservationStatus::Reserved, 1), policy, false)
            .unwrap();
        repo.upsert_reservation(&ReservedSession::new("b", ReservationStatus::Deleted, 1), policy, false)
            .unwrap();

        let active = repo
            .list_reservations(true)
            .unwrap()
            .into_iter()
            .map(|record| record.session_id)
            .collect::<Vec<_>>();
        assert_eq!(active, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(repo.list_reservations(false).unwrap().len(), 3);
    }

    #[test]
    fn test_accounts_are_isolated() {
        let db = setup();
        let alice = SqliteUserDataRepository::new(db.connection(), "alice");
        let bob = SqliteUserDataRepository::new(db.connection(), "bob");

        alice
            .upsert_bookmark(&BookmarkedSession::new("s1", true, 1), TieBreak::default(), false)
            .unwrap();
        assert!(bob.get_bookmark("s1").unwrap().is_none());
        assert!(bob.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_pending_and_clear_pending() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);
        let policy = TieBreak::default();

        repo.upsert_bookmark(&BookmarkedSession::new("local", true, 10), policy, true)
            .unwrap();
        repo.upsert_bookmark(&BookmarkedSession::new("remote", true, 10), policy, false)
            .unwrap();
        repo.mark_feedback_submitted("s9", 10, true).unwrap();

        let pending = repo.pending().unwrap();
        assert_eq!(pending.starred_sessions.len(), 1);
        assert!(pending.starred_sessions.contains_key("local"));
        assert!(pending.feedback_submitted_sessions.contains("s9"));

        assert_eq!(repo.clear_pending(&pending).unwrap(), 2);
        assert!(repo.pending().unwrap().is_empty());
    }

    #[test]
    fn test_clear_pending_keeps_newer_local_write_dirty() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);
        let policy = TieBreak::default();

        repo.upsert_bookmark(&BookmarkedSession::new("s1", true, 10), policy, true)
            .unwrap();
        let pushed = repo.pending().unwrap();

        // A newer local toggle lands while the push is in flight.
        repo.upsert_bookmark(&BookmarkedSession::new("s1", false, 11), policy, true)
            .unwrap();

        assert_eq!(repo.clear_pending(&pushed).unwrap(), 0);
        assert_eq!(
            repo.pending().unwrap().bookmark("s1"),
            Some(BookmarkedSession::new("s1", false, 11))
        );
    }

    #[test]
    fn test_feedback_is_recorded_once() {
        let db = setup();
        let repo = SqliteUserDataRepository::new(db.connection(), ACCOUNT);

        assert!(repo.mark_feedback_submitted("s1", 5, false).unwrap());
        assert!(!repo.mark_feedback_submitted("s1", 6, false).unwrap());
        assert_eq!(repo.list_feedback_submitted().unwrap(), vec!["s1".to_string()]);
        assert!(repo.mark_feedback_submitted(" ", 6, false).is_err());

        assert!(repo.has_feedback_submitted("s1").unwrap());
        assert!(!repo.has_feedback_submitted("s2").unwrap());
        let other = SqliteUserDataRepository::new(db.connection(), "someone-else");
        assert!(!other.has_feedback_submitted("s1").unwrap());
    }
}
