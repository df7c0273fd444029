pub mod common;
pub mod completions;
pub mod config;
pub mod export;
pub mod list;
pub mod session;
pub mod sync;
