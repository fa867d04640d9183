use capture_server::{cli::Args, create_router, create_watcher, events::EventBus, AppState};
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capture_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match args.server_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to resolve configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Make sure the served root and the watch directory exist
    let mut bootstrap_dirs = vec![config.root.clone()];
    if let Some(watch_dir) = config.marker.parent().filter(|p| !p.as_os_str().is_empty()) {
        bootstrap_dirs.push(watch_dir.to_path_buf());
    }
    for dir in bootstrap_dirs {
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!("Failed to create {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    tracing::info!("Serving {}", config.root.display());
    tracing::info!("Default document: {}", config.index);
    match &config.relay.url {
        Some(url) => tracing::info!("Relaying alerts via {}", url),
        None => tracing::warn!("No --relay-url given - alerts will only reach connected browsers"),
    }

    // The bus lives for the whole process; the watcher publishes, /events subscribes
    let bus = EventBus::new();
    let watcher = create_watcher(&config, bus.clone()).spawn();
    let app = create_router(AppState::new(&config, bus.clone()));

    // Run the server
    let addr: SocketAddr = match format!("{}:{}", args.host, args.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid address {}:{}: {}", args.host, args.port, e);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", addr);

    let shutdown_bus = bus.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            // Ends every open /events stream so graceful shutdown can finish
            shutdown_bus.close();
        })
        .await;

    watcher.abort();
    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
