//! mysched-core - Core library for mysched
//!
//! This crate contains the session record models, the last-write-wins merge
//! rules, the `SQLite` record store and the sync cycle shared by every
//! mysched interface.

pub mod db;
pub mod error;
pub mod export;
pub mod merge;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use merge::TieBreak;
pub use models::{
    BookmarkedSession, RecordKind, ReservationStatus, ReservedSession, SessionRecord,
    SyncConflict, UserData, UserRecord,
};
