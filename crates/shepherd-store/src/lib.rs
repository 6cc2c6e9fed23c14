//! # Shepherd Store
//!
//! Persistence Gateway implementations. Both stores implement every gateway
//! trait from `shepherd-core`, so a single instance can back all engines:
//!
//! - [`MemoryStore`] — `RwLock`-guarded maps; tests and development.
//! - [`SqliteStore`] — one table per collection, documents as JSON payload
//!   columns; survives restarts, no server to run.
//!
//! Query shaping (filters, sorts, pagination) happens on decoded documents.
//! The collections are small administrative data; simplicity wins over
//! indexed queries here.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
