//! Data models for mysched

mod bookmark;
mod record;
mod reservation;
mod sync_conflict;
mod user_data;

pub use bookmark::BookmarkedSession;
pub use record::{RecordKind, SessionRecord, UserRecord};
pub use reservation::{ReservationStatus, ReservedSession};
pub use sync_conflict::SyncConflict;
pub use user_data::{ReservationEntry, StarredEntry, UserData};
