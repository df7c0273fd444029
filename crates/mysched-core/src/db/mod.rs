//! Database layer for mysched

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{SqliteUserDataRepository, UserDataRepository};
