//! In-memory item storage, for tests and throwaway deployments.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::params::{PageRequest, SortDir, SortField};
use crate::pool::{DbError, DbResult};
use crate::queries::items::{ItemChanges, ItemPage, ItemRow};
use crate::repository::{DbType, ItemRepository};

struct Entry {
    /// Insertion order, the tie-breaker when sort keys are equal.
    seq: u64,
    row: ItemRow,
}

#[derive(Default)]
struct Store {
    items: HashMap<String, Entry>,
    next_seq: u64,
}

/// Items kept in a process-local map. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DbResult<std::sync::RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|_| DbError::OperationFailed("store lock poisoned".to_string()))
    }

    fn write(&self) -> DbResult<std::sync::RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|_| DbError::OperationFailed("store lock poisoned".to_string()))
    }
}

fn compare(a: &Entry, b: &Entry, field: SortField) -> Ordering {
    let key = match field {
        SortField::CreatedAt => a.row.created_at.cmp(&b.row.created_at),
        SortField::UpdatedAt => a.row.updated_at.cmp(&b.row.updated_at),
        SortField::Name => a.row.name.cmp(&b.row.name),
        SortField::Id => a.row.id.cmp(&b.row.id),
    };
    key.then(a.seq.cmp(&b.seq))
}

impl ItemRepository for MemoryRepository {
    fn backend(&self) -> DbType {
        DbType::Memory
    }

    fn create(&self, id: &str, name: &str, content: &str) -> DbResult<ItemRow> {
        let mut store = self.write()?;
        if store.items.contains_key(id) {
            return Err(DbError::OperationFailed(format!("Item already exists: {}", id)));
        }

        let now = crate::now_timestamp();
        let row = ItemRow {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let seq = store.next_seq;
        store.next_seq += 1;
        store.items.insert(
            id.to_string(),
            Entry {
                seq,
                row: row.clone(),
            },
        );
        Ok(row)
    }

    fn get(&self, id: &str) -> DbResult<ItemRow> {
        self.read()?
            .items
            .get(id)
            .map(|entry| entry.row.clone())
            .ok_or_else(|| DbError::NotFound(format!("Item: {}", id)))
    }

    fn list(&self, request: &PageRequest) -> DbResult<ItemPage> {
        let store = self.read()?;
        let mut entries: Vec<&Entry> = store.items.values().collect();
        entries.sort_by(|a, b| {
            let order = compare(a, b, request.sort_by);
            match request.sort_dir {
                SortDir::Asc => order,
                SortDir::Desc => order.reverse(),
            }
        });

        let rows = entries
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .map(|entry| entry.row.clone())
            .collect();

        Ok(ItemPage {
            rows,
            total: store.items.len() as u64,
        })
    }

    fn update(&self, id: &str, changes: &ItemChanges) -> DbResult<ItemRow> {
        let mut store = self.write()?;
        let entry = store
            .items
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(format!("Item: {}", id)))?;

        if let Some(name) = &changes.name {
            entry.row.name = name.clone();
        }
        if let Some(content) = &changes.content {
            entry.row.content = content.clone();
        }
        entry.row.updated_at = crate::now_timestamp();
        Ok(entry.row.clone())
    }

    fn delete(&self, id: &str) -> DbResult<()> {
        self.write()?
            .items
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DbError::NotFound(format!("Item: {}", id)))
    }

    fn ping(&self) -> DbResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_id_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create("x", "One", "").unwrap();
        assert!(matches!(
            repo.create("x", "Two", ""),
            Err(DbError::OperationFailed(_))
        ));
        assert_eq!(repo.get("x").unwrap().name, "One");
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let repo = MemoryRepository::new();
        repo.create("x", "One", "").unwrap();
        let request = PageRequest {
            page: 5,
            ..PageRequest::default()
        };
        let page = repo.list(&request).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 1);
    }
}
