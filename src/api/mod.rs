//! HTTP API Module
//!
//! Serves the upload page, the upload form endpoint and file downloads.

mod http;
pub mod page;

pub use http::{AppState, HttpServer};
