//! WolfDrop - Minimal Web File Drop
//!
//! A small HTTP service that stores uploaded files in one directory and
//! lets users list and download them by name.
//!
//! # Path safety
//!
//! Every user-supplied name passes through two independent checks before
//! any filesystem call: path separators are stripped, then the name is
//! joined onto the storage root, normalized, and required to stay strictly
//! below the root. See [`storage::path`].
//!
//! # Features
//!
//! - Upload form with atomic overwrite (temp file + rename)
//! - Listing of regular files only
//! - Streaming downloads as attachments
//! - TOML configuration and structured logging

pub mod config;
pub mod error;
pub mod storage;
pub mod api;

pub use config::WolfDropConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::HttpServer;
    pub use crate::config::WolfDropConfig;
    pub use crate::error::{Error, Result};
    pub use crate::storage::{StorageGateway, StoredFile};
}
