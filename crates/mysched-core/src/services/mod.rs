//! Services shared across clients.

mod record_store;

pub use record_store::RecordStore;
