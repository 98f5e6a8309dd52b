//! Item management.
//!
//! Every successful mutation is published to the hub after the store call
//! returns; failed mutations publish nothing.

pub mod model;

use std::sync::Arc;
use std::time::Duration;

use itemcast_db::{DbError, ItemChanges, ItemRepository, ListParams};
use itemcast_hub::{EventKind, Hub};
use model::{Item, ItemList};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Longest accepted item name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// How long a health check waits for the store to answer.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Item operations backed by a repository and announced through the hub.
#[derive(Clone)]
pub struct ItemService {
    repo: Arc<dyn ItemRepository>,
    hub: Hub,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemRepository>, hub: Hub) -> Self {
        Self { repo, hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Create a new item and broadcast it.
    pub fn create(&self, name: &str, content: &str) -> CoreResult<Item> {
        let name = validate_name(name)?;
        let id = Uuid::new_v4().to_string();

        let row = self.repo.create(&id, name, content)?;
        let item = Item::from_row(row);

        info!(item_id = %item.id, "Item created");
        self.hub.broadcast(EventKind::Created, &item);
        Ok(item)
    }

    /// List one page of items.
    pub fn list(&self, params: &ListParams) -> CoreResult<ItemList> {
        let request = params.resolve();
        let page = self.repo.list(&request)?;
        debug!(total = page.total, page = request.page, "Items listed");
        Ok(ItemList::from_page(page, &request))
    }

    /// Get an item by ID.
    pub fn get(&self, id: &str) -> CoreResult<Item> {
        let row = self.repo.get(id).map_err(|e| not_found(e, id))?;
        Ok(Item::from_row(row))
    }

    /// Change an item's name and/or content and broadcast the result.
    pub fn update(&self, id: &str, name: Option<&str>, content: Option<&str>) -> CoreResult<Item> {
        if name.is_none() && content.is_none() {
            return Err(CoreError::validation("nothing to update"));
        }
        let changes = ItemChanges {
            name: name.map(validate_name).transpose()?.map(str::to_string),
            content: content.map(str::to_string),
        };

        let row = self.repo.update(id, &changes).map_err(|e| not_found(e, id))?;
        let item = Item::from_row(row);

        info!(item_id = %item.id, "Item updated");
        self.hub.broadcast(EventKind::Updated, &item);
        Ok(item)
    }

    /// Delete an item and broadcast its ID.
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        self.repo.delete(id).map_err(|e| not_found(e, id))?;

        info!(item_id = %id, "Item deleted");
        self.hub.broadcast(EventKind::Deleted, json!({ "id": id }));
        Ok(())
    }

    /// Check the store answers within [`HEALTH_CHECK_TIMEOUT`].
    ///
    /// The ping runs on the blocking pool so a wedged store cannot stall
    /// the caller past the timeout.
    pub async fn health_check(&self) -> CoreResult<()> {
        let repo = Arc::clone(&self.repo);
        let ping = tokio::task::spawn_blocking(move || repo.ping());

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, ping).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(e)) => Err(DbError::OperationFailed(format!("health check failed: {}", e)).into()),
            Err(_) => Err(DbError::OperationFailed(format!(
                "store did not answer within {}s",
                HEALTH_CHECK_TIMEOUT.as_secs()
            ))
            .into()),
        }
    }
}

fn validate_name(name: &str) -> CoreResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

fn not_found(e: DbError, id: &str) -> CoreError {
    match e {
        DbError::NotFound(_) => CoreError::ItemNotFound(id.to_string()),
        e => CoreError::Database(e),
    }
}
