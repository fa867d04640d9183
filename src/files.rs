//! `/edit` API: listing, download and mutation of files under the root.
//!
//! - `GET /edit/?list=<dir>` lists a directory as JSON
//! - `GET /edit/?edit=<path>` / `?download=<path>` returns raw file content
//! - any other `GET` under `/edit` falls through to static serving
//! - `PUT` creates or overwrites, `POST` replaces an existing file,
//!   `DELETE` removes a file. The target is the path after `/edit/`, or the
//!   `path` query parameter. Bodies are written byte for byte.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, OriginalUri, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Deserialize;

use crate::content_type::ContentKind;
use crate::error::StoreError;
use crate::viewer;
use crate::AppState;

/// Query parameters understood under `/edit`.
#[derive(Debug, Default, Deserialize)]
pub struct EditQuery {
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub edit: Option<String>,
    #[serde(default)]
    pub download: Option<String>,
    /// Mutation target when it is not part of the URL path
    #[serde(default)]
    pub path: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/edit", any(handle_edit_root))
        .route("/edit/", any(handle_edit_root))
        .route("/edit/*path", any(handle_edit_path))
        // Uploads are unbounded.
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn handle_edit_root(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<EditQuery>,
    body: Bytes,
) -> Response {
    dispatch(&state, method, String::new(), query, uri.path(), body)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn handle_edit_path(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(path): Path<String>,
    Query(query): Query<EditQuery>,
    body: Bytes,
) -> Response {
    dispatch(&state, method, path, query, uri.path(), body)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn dispatch(
    state: &AppState,
    method: Method,
    path: String,
    query: EditQuery,
    raw_path: &str,
    body: Bytes,
) -> Result<Response, StoreError> {
    match method {
        Method::GET | Method::HEAD => {
            if let Some(dir) = query.list.as_deref() {
                return list_files(state, dir).await;
            }
            let forced = query.download.is_some();
            if let Some(name) = query.edit.as_deref().or(query.download.as_deref()) {
                return download(state, name, forced).await;
            }
            viewer::serve_request_path(state, raw_path).await
        }
        Method::PUT => {
            let target = state.jail.resolve(&mutation_target(path, query)?)?;
            state.store.write_file(&target, &body).await?;
            tracing::info!("PUT {} ({} bytes)", target, body.len());
            Ok("ok".into_response())
        }
        Method::POST => {
            let target = state.jail.resolve(&mutation_target(path, query)?)?;
            state.store.update_file(&target, &body).await?;
            tracing::info!("POST {} ({} bytes)", target, body.len());
            Ok("ok".into_response())
        }
        Method::DELETE => {
            let target = state.jail.resolve(&mutation_target(path, query)?)?;
            state.store.delete_file(&target).await?;
            Ok("ok".into_response())
        }
        _ => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// Pick the file a mutation applies to.
fn mutation_target(path: String, query: EditQuery) -> Result<String, StoreError> {
    let target = if path.trim_matches('/').is_empty() {
        query.path.unwrap_or_default()
    } else {
        path
    };

    if target.trim_matches('/').is_empty() {
        return Err(StoreError::MalformedRequest(
            "missing target path".to_string(),
        ));
    }
    Ok(target)
}

/// GET /edit/?list=<dir>
///
/// Listing failures other than a jail violation are reported as 500.
async fn list_files(state: &AppState, dir: &str) -> Result<Response, StoreError> {
    let path = state.jail.resolve_dir(dir)?;
    match state.store.list_directory(&path).await {
        Ok(entries) => {
            tracing::debug!("Listing {}: {} entries", path, entries.len());
            Ok(Json(entries).into_response())
        }
        Err(e) => {
            tracing::warn!("List files failed for {}: {}", path, e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("List files failed: {}", e),
            )
                .into_response())
        }
    }
}

/// GET /edit/?edit=<path> or ?download=<path>
async fn download(state: &AppState, name: &str, forced: bool) -> Result<Response, StoreError> {
    let path = state.jail.resolve(name)?;
    let data = state.store.read_file(&path).await?;
    let kind = ContentKind::sniff(&data);

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(kind.to_mime()))],
        data,
    )
        .into_response();

    if forced {
        let file_name = path.file_name().unwrap_or_default();
        response.headers_mut().insert(
            header::CONTENT_DISPOSITION,
            attachment_header(file_name),
        );
    }

    Ok(response)
}

fn attachment_header(file_name: &str) -> HeaderValue {
    let value = format!("attachment; filename=\"{}\"", file_name.replace('"', "\\\""));
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
