pub mod cli;
pub mod config;
pub mod content_type;
pub mod error;
pub mod events;
pub mod files;
pub mod path;
pub mod relay;
pub mod sse;
pub mod store;
pub mod viewer;
pub mod watcher;

use axum::Router;
use config::ServerConfig;
use events::EventBus;
use path::PathJail;
use std::sync::Arc;
use store::FileStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use watcher::ChangeWatcher;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub jail: Arc<PathJail>,
    pub store: Arc<FileStore>,
    pub bus: EventBus,
}

impl AppState {
    pub fn new(config: &ServerConfig, bus: EventBus) -> Self {
        Self {
            jail: Arc::new(PathJail::new(&config.root, &config.index)),
            store: Arc::new(FileStore::new(config.protected.iter().cloned())),
            bus,
        }
    }
}

/// Create the router: `/events`, the `/edit` API, and static serving for
/// everything else.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(sse::router(state.bus.clone()))
        .merge(files::router(state.clone()))
        .merge(viewer::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create the marker watcher described by `config`, publishing on `bus`.
pub fn create_watcher(config: &ServerConfig, bus: EventBus) -> ChangeWatcher {
    ChangeWatcher::new(&config.marker, bus, relay::from_config(&config.relay))
        .with_destination(&config.relay.destination)
        .with_prefix(&config.relay.prefix)
        .with_interval(config.poll_interval)
}
