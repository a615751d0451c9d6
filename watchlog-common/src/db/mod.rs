//! SQLite access for the local durable store

pub mod init;
pub mod kv;

pub use init::{init_database, init_memory_database};
