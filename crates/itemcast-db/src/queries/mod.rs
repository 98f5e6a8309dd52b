//! Database query implementations.

pub mod items;
