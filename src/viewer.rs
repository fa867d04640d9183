//! Static file serving for every request no other route claims.
//!
//! Paths go through the same jail as the `/edit` API; `/` serves the
//! default document.

use axum::extract::{OriginalUri, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::content_type::mime_for_path;
use crate::error::StoreError;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new().fallback(serve_fallback).with_state(state)
}

async fn serve_fallback(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    serve_request_path(&state, uri.path())
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Serve the file a (still percent-encoded) URL path points at.
///
/// Directories are never served; a directory path is `NotFound`.
pub(crate) async fn serve_request_path(
    state: &AppState,
    raw_path: &str,
) -> Result<Response, StoreError> {
    let decoded = urlencoding::decode(raw_path)
        .map_err(|_| StoreError::MalformedRequest(format!("path is not UTF-8: {}", raw_path)))?;
    let path = state.jail.resolve(&decoded)?;
    let data = state.store.read_file(&path).await?;

    tracing::debug!("Serving {} ({} bytes)", path, data.len());
    Ok(([(header::CONTENT_TYPE, mime_for_path(&path))], data).into_response())
}
