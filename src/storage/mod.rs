//! Storage Module
//!
//! Local-directory file storage with path containment checks.

pub mod path;
mod gateway;

pub use gateway::{StorageGateway, StoredFile};
pub use path::{normalize, resolve, sanitize};
