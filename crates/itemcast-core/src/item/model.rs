//! Item domain models.

use itemcast_db::{ItemPage, ItemRow, PageRequest};
use serde::Serialize;

/// A catalogue item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    /// Create from database row.
    pub fn from_row(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One page of items.
#[derive(Debug, Clone, Serialize)]
pub struct ItemList {
    pub items: Vec<Item>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl ItemList {
    pub fn from_page(page: ItemPage, request: &PageRequest) -> Self {
        Self {
            items: page.rows.into_iter().map(Item::from_row).collect(),
            total: page.total,
            page: request.page,
            page_size: request.page_size,
            total_pages: page.total.div_ceil(u64::from(request.page_size)),
        }
    }
}
