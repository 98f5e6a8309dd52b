//! Repository abstraction and backend selection.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::memory::MemoryRepository;
use crate::params::PageRequest;
use crate::pool::{init_pool, DbError, DbPool, DbResult};
use crate::queries::items::{self as queries, ItemChanges, ItemPage, ItemRow};

/// Storage for items. Implementations stamp `created_at` / `updated_at`.
pub trait ItemRepository: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> DbType;

    fn create(&self, id: &str, name: &str, content: &str) -> DbResult<ItemRow>;

    fn get(&self, id: &str) -> DbResult<ItemRow>;

    fn list(&self, request: &PageRequest) -> DbResult<ItemPage>;

    fn update(&self, id: &str, changes: &ItemChanges) -> DbResult<ItemRow>;

    fn delete(&self, id: &str) -> DbResult<()>;

    /// Check the backend is reachable.
    fn ping(&self) -> DbResult<()>;
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Sqlite,
    Memory,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for DbType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(DbError::Unsupported(other.to_string())),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub db_type: DbType,
    /// Database file, used by the SQLite backend.
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::Sqlite,
            path: PathBuf::from("itemcast.db"),
        }
    }
}

/// Open the backend described by `config`.
pub fn open_repository(config: &DbConfig) -> DbResult<Arc<dyn ItemRepository>> {
    let repo: Arc<dyn ItemRepository> = match config.db_type {
        DbType::Sqlite => Arc::new(SqliteRepository::open(&config.path)?),
        DbType::Memory => Arc::new(MemoryRepository::new()),
    };
    info!(backend = %config.db_type, "Item repository initialized");
    Ok(repo)
}

/// SQLite-backed repository.
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    /// Wrap a pool whose schema is already migrated.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open the file at `path` and run migrations.
    pub fn open(path: &std::path::Path) -> DbResult<Self> {
        Ok(Self::new(init_pool(path)?))
    }
}

impl ItemRepository for SqliteRepository {
    fn backend(&self) -> DbType {
        DbType::Sqlite
    }

    fn create(&self, id: &str, name: &str, content: &str) -> DbResult<ItemRow> {
        queries::create_item(&self.pool, id, name, content)
    }

    fn get(&self, id: &str) -> DbResult<ItemRow> {
        queries::get_item(&self.pool, id)
    }

    fn list(&self, request: &PageRequest) -> DbResult<ItemPage> {
        queries::list_items(&self.pool, request)
    }

    fn update(&self, id: &str, changes: &ItemChanges) -> DbResult<ItemRow> {
        queries::update_item(&self.pool, id, changes)
    }

    fn delete(&self, id: &str) -> DbResult<()> {
        queries::delete_item(&self.pool, id)
    }

    fn ping(&self) -> DbResult<()> {
        queries::ping(&self.pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::params::ListParams;

    fn sqlite() -> SqliteRepository {
        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();
        SqliteRepository::new(pool)
    }

    /// Behaviour every backend must share.
    fn exercise(repo: &dyn ItemRepository) {
        repo.ping().unwrap();
        for (id, name) in [("b", "Banana"), ("a", "Apple"), ("c", "Cherry")] {
            repo.create(id, name, "").unwrap();
        }

        let newest = repo.list(&PageRequest::default()).unwrap();
        assert_eq!(newest.total, 3);
        assert_eq!(newest.rows.first().map(|r| r.id.as_str()), Some("c"));

        let by_id = ListParams {
            sort_by: Some("id".to_string()),
            sort_dir: Some("asc".to_string()),
            page: Some(2),
            page_size: Some(2),
        };
        let page = repo.list(&by_id.resolve()).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, "c");

        let updated = repo
            .update(
                "a",
                &ItemChanges {
                    name: None,
                    content: Some("crisp".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Apple");
        assert_eq!(repo.get("a").unwrap().content, "crisp");

        repo.delete("a").unwrap();
        assert!(matches!(repo.get("a"), Err(DbError::NotFound(_))));
        assert!(matches!(repo.delete("a"), Err(DbError::NotFound(_))));
        assert_eq!(repo.list(&PageRequest::default()).unwrap().total, 2);
    }

    #[test]
    fn test_sqlite_backend() {
        exercise(&sqlite());
    }

    #[test]
    fn test_memory_backend() {
        exercise(&MemoryRepository::new());
    }

    #[test]
    fn test_db_type_parse() {
        assert_eq!("sqlite".parse::<DbType>().unwrap(), DbType::Sqlite);
        assert_eq!(" Memory ".parse::<DbType>().unwrap(), DbType::Memory);
        assert!(matches!(
            "postgres".parse::<DbType>(),
            Err(DbError::Unsupported(name)) if name == "postgres"
        ));
    }

    #[test]
    fn test_open_memory_repository() {
        let config = DbConfig {
            db_type: DbType::Memory,
            ..Default::default()
        };
        let repo = open_repository(&config).unwrap();
        assert_eq!(repo.backend(), DbType::Memory);
    }
}
