//! Itemcast Core Library
//!
//! Item domain model and the service that persists changes and publishes
//! them to the broadcast hub.

pub mod error;
pub mod item;

pub use error::{CoreError, CoreResult};
pub use item::model::{Item, ItemList};
pub use item::ItemService;
