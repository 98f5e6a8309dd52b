//! Itemcast Database Layer
//!
//! Item persistence behind the [`ItemRepository`] trait, with a SQLite
//! backend and an in-memory backend selected by [`DbType`].

pub mod memory;
pub mod migrations;
pub mod params;
pub mod pool;
pub mod queries;
pub mod repository;

pub use memory::MemoryRepository;
pub use params::{ListParams, PageRequest, SortDir, SortField};
pub use pool::{init_pool, DbError, DbPool, DbResult};
pub use queries::items::{ItemChanges, ItemPage, ItemRow};
pub use repository::{open_repository, DbConfig, DbType, ItemRepository, SqliteRepository};

/// Current time in the format stored for `created_at` / `updated_at`.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
