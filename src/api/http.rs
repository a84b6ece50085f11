//! HTTP Server
//!
//! Thin adapters between HTTP and the storage gateway: index page, upload
//! form handler and file download.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use tokio_util::io::{ReaderStream, StreamReader};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::page;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::storage::{sanitize, StorageGateway};

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "file";

/// Stored name used when the client sends no file name
const PLACEHOLDER_NAME: &str = "file";

/// Shared application state
pub struct AppState {
    /// Storage gateway for the configured root
    pub gateway: Arc<StorageGateway>,
}

/// HTTP server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, gateway: Arc<StorageGateway>) -> Self {
        let state = Arc::new(AppState { gateway });
        Self { config, state }
    }

    /// Build the router with all routes and layers
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/", get(handle_index))
            .route("/upload", post(handle_upload))
            .route("/download/:file_name", get(handle_download))
            .route("/health", get(handle_health))
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes()))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state));

        if self.config.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Serve requests until `shutdown` resolves
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| {
                Error::Network(format!("Failed to bind {}: {}", self.config.bind_address, e))
            })?;
        tracing::info!("HTTP server listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Error::InvalidPath(name) => {
                tracing::warn!(name = %name, "Rejected path outside storage root");
                status.into_response()
            }
            Error::NotFound(name) => {
                tracing::debug!(name = %name, "File not found");
                status.into_response()
            }
            _ if status.is_client_error() => {
                tracing::warn!("Bad request: {}", self);
                (status, self.to_string()).into_response()
            }
            _ => {
                tracing::error!("Request failed: {}", self);
                (status, "Internal server error").into_response()
            }
        }
    }
}

// ============ Handlers ============

/// List stored files
async fn handle_index(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let files = state.gateway.list().await?;
    Ok(Html(page::render(&files, None)))
}

/// Accept a multipart upload and re-render the page with the outcome
async fn handle_upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    match receive_upload(&state.gateway, &mut multipart).await {
        Ok(Some(safe_name)) => {
            render_with_message(&state, StatusCode::OK, &page::uploaded_message(&safe_name)).await
        }
        Ok(None) => render_with_message(&state, StatusCode::OK, page::EMPTY_UPLOAD_MESSAGE).await,
        Err(e) => {
            let status = e.status_code();
            let message = match &e {
                Error::InvalidPath(name) => {
                    tracing::warn!(name = %name, "Rejected upload outside storage root");
                    page::INVALID_PATH_MESSAGE.to_string()
                }
                Error::Multipart(_) => {
                    tracing::warn!("Malformed upload: {}", e);
                    e.to_string()
                }
                _ => {
                    tracing::error!("Upload failed: {}", e);
                    page::STORE_FAILED_MESSAGE.to_string()
                }
            };
            render_with_message(&state, status, &message).await
        }
    }
}

/// Stream a stored file back as an attachment
async fn handle_download(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    let safe_name = sanitize(&file_name);
    let stored = state.gateway.retrieve(&safe_name).await?;
    let file = stored.open().await?;
    // Length of the opened file, not of whatever the name points to now
    let size = file.metadata().await?.len();

    let disposition = HeaderValue::from_str(&content_disposition(&stored.name))
        .map_err(|_| Error::InvalidPath(stored.name.clone()))?;

    tracing::info!(name = %stored.name, bytes = size, "Serving download");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Health check
async fn handle_health() -> &'static str {
    "OK"
}

// ============ Helpers ============

/// Pull the `file` field out of the form and store it.
///
/// Returns `Ok(None)` when there is nothing to store: no `file` field, an
/// empty file name, or zero bytes of content.
async fn receive_upload(
    gateway: &StorageGateway,
    multipart: &mut Multipart,
) -> Result<Option<String>> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let safe_name = match field.file_name() {
            None => PLACEHOLDER_NAME.to_string(),
            Some("") => return Ok(None),
            Some(name) => sanitize(name),
        };

        let first = loop {
            match field.chunk().await.map_err(multipart_error)? {
                Some(chunk) if chunk.is_empty() => continue,
                other => break other,
            }
        };
        let Some(first) = first else {
            return Ok(None);
        };

        let rest = field.map_err(std::io::Error::other);
        let body = stream::iter([Ok::<Bytes, std::io::Error>(first)]).chain(rest);
        let reader = std::pin::pin!(StreamReader::new(body));

        gateway.store(&safe_name, reader).await.map_err(body_error)?;
        return Ok(Some(safe_name));
    }

    Ok(None)
}

fn multipart_error(e: MultipartError) -> Error {
    Error::Multipart(e.to_string())
}

/// A body that breaks off mid-field surfaces from the store as an I/O
/// error wrapping the multipart error; report it as a malformed upload.
fn body_error(e: Error) -> Error {
    match e {
        Error::Io(io) => match io.get_ref().and_then(|inner| inner.downcast_ref::<MultipartError>()) {
            Some(inner) => Error::Multipart(inner.to_string()),
            None => Error::Io(io),
        },
        other => other,
    }
}

/// Render the page with a status message and the current file list.
///
/// The outcome of the upload decides the status; a listing failure only
/// leaves the list empty.
async fn render_with_message(state: &AppState, status: StatusCode, message: &str) -> Response {
    let files = match state.gateway.list().await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Failed to list stored files: {}", e);
            Vec::new()
        }
    };
    (status, Html(page::render(&files, Some(message)))).into_response()
}

/// `Content-Disposition` value for downloading `name` as an attachment.
///
/// `filename` is an ASCII fallback; names it cannot carry as-is also get a
/// `filename*` with the exact UTF-8 name (RFC 6266).
fn content_disposition(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len());
    let mut lossy = false;
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() || !c.is_ascii() => {
                quoted.push('_');
                lossy = true;
            }
            c => quoted.push(c),
        }
    }

    if lossy {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            quoted,
            page::encode_path_segment(name)
        )
    } else {
        format!("attachment; filename=\"{}\"", quoted)
    }
}
