//! Item queries.

use crate::params::PageRequest;
use crate::pool::{DbError, DbPool, DbResult};
use rusqlite::{params, OptionalExtension, Row};

/// Item row from database.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ItemRow {
    fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

/// One page of items plus the total number of items stored.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub rows: Vec<ItemRow>,
    pub total: u64,
}

/// Fields to change on an item. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub content: Option<String>,
}

/// Insert a new item stamped with the current time.
pub fn create_item(pool: &DbPool, id: &str, name: &str, content: &str) -> DbResult<ItemRow> {
    let now = crate::now_timestamp();
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO items (id, name, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, name, content, now],
        )?;
        Ok(())
    })?;

    Ok(ItemRow {
        id: id.to_string(),
        name: name.to_string(),
        content: content.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get an item by ID.
pub fn get_item(pool: &DbPool, id: &str) -> DbResult<ItemRow> {
    pool.with_conn(|conn| {
        conn.query_row(
            "SELECT id, name, content, created_at, updated_at
             FROM items WHERE id = ?1",
            params![id],
            ItemRow::from_sql,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Item: {}", id)),
            e => DbError::Connection(e),
        })
    })
}

/// List one page of items.
pub fn list_items(pool: &DbPool, request: &PageRequest) -> DbResult<ItemPage> {
    // Column and direction come from closed enums, never from user text.
    let sql = format!(
        "SELECT id, name, content, created_at, updated_at
         FROM items
         ORDER BY {column} {dir}, rowid {dir}
         LIMIT ?1 OFFSET ?2",
        column = request.sort_by.column(),
        dir = request.sort_dir.sql(),
    );

    pool.with_conn(|conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![i64::from(request.page_size), request.offset() as i64],
                ItemRow::from_sql,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ItemPage {
            rows,
            total: total.max(0) as u64,
        })
    })
}

/// Apply `changes` to an item and return the stored result.
pub fn update_item(pool: &DbPool, id: &str, changes: &ItemChanges) -> DbResult<ItemRow> {
    let now = crate::now_timestamp();
    pool.with_conn(|conn| {
        let current = conn
            .query_row(
                "SELECT id, name, content, created_at, updated_at
                 FROM items WHERE id = ?1",
                params![id],
                ItemRow::from_sql,
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("Item: {}", id)))?;

        let updated = ItemRow {
            name: changes.name.clone().unwrap_or(current.name),
            content: changes.content.clone().unwrap_or(current.content),
            updated_at: now,
            ..current
        };

        conn.execute(
            "UPDATE items SET name = ?2, content = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, updated.name, updated.content, updated.updated_at],
        )?;

        Ok(updated)
    })
}

/// Delete an item.
pub fn delete_item(pool: &DbPool, id: &str) -> DbResult<()> {
    pool.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(DbError::NotFound(format!("Item: {}", id)));
        }
        Ok(())
    })
}

/// Check the connection answers queries.
pub fn ping(pool: &DbPool) -> DbResult<()> {
    pool.with_conn(|conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::params::ListParams;

    fn pool() -> DbPool {
        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();
        pool
    }

    #[test]
    fn test_create_and_get() {
        let pool = pool();
        let created = create_item(&pool, "a1", "Alpha", "first").unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let fetched = get_item(&pool, "a1").unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_missing() {
        let pool = pool();
        assert!(matches!(get_item(&pool, "nope"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let pool = pool();
        create_item(&pool, "dup", "One", "").unwrap();
        assert!(matches!(
            create_item(&pool, "dup", "Two", ""),
            Err(DbError::Connection(_))
        ));
    }

    #[test]
    fn test_list_sorts_and_paginates() {
        let pool = pool();
        for (id, name) in [("1", "charlie"), ("2", "alpha"), ("3", "bravo")] {
            create_item(&pool, id, name, "").unwrap();
        }

        let by_name = ListParams {
            sort_by: Some("name".to_string()),
            sort_dir: Some("asc".to_string()),
            page_size: Some(2),
            ..Default::default()
        };
        let page = list_items(&pool, &by_name.resolve()).unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["alpha", "bravo"]);

        let second = ListParams {
            page: Some(2),
            ..by_name
        };
        let page = list_items(&pool, &second.resolve()).unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].name, "charlie");

        // Default: newest first, insertion order breaks timestamp ties.
        let newest = list_items(&pool, &ListParams::default().resolve()).unwrap();
        assert_eq!(newest.rows[0].id, "3");
    }

    #[test]
    fn test_update_and_delete() {
        let pool = pool();
        let created = create_item(&pool, "u1", "Before", "body").unwrap();

        let changes = ItemChanges {
            name: Some("After".to_string()),
            content: None,
        };
        let updated = update_item(&pool, "u1", &changes).unwrap();
        assert_eq!(updated.name, "After");
        assert_eq!(updated.content, "body");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(get_item(&pool, "u1").unwrap(), updated);

        delete_item(&pool, "u1").unwrap();
        assert!(matches!(delete_item(&pool, "u1"), Err(DbError::NotFound(_))));
        assert!(matches!(
            update_item(&pool, "u1", &changes),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_ping() {
        ping(&pool()).unwrap();
    }
}
