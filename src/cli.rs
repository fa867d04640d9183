use crate::config::{RelayConfig, ServerConfig};
use crate::watcher::MIN_POLL_INTERVAL;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments for capture-server
#[derive(Parser, Debug)]
#[clap(name = "capture-server")]
#[clap(
    about = "Serves a jailed directory with an editing API and pushes capture alerts over SSE",
    long_about = None
)]
pub struct Args {
    /// Port to listen on
    #[clap(short, long, default_value = "8000")]
    pub port: u16,

    /// Host to bind to
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Directory to serve and edit
    #[clap(long, value_name = "DIR", default_value = "www")]
    pub root: PathBuf,

    /// Default document for `/`
    #[clap(long, value_name = "NAME", default_value = "index.html")]
    pub index: String,

    /// File name that may never be deleted (repeatable; the index is always protected)
    #[clap(long = "protect", value_name = "NAME")]
    pub protect: Vec<String>,

    /// Directory the capture tool writes its marker file into
    #[clap(long, value_name = "DIR", default_value = "captures")]
    pub watch_dir: PathBuf,

    /// Marker file name inside the watch directory
    #[clap(long, value_name = "NAME", default_value = "detection.csv")]
    pub watch_file: String,

    /// Marker poll interval in milliseconds
    #[clap(long, value_name = "MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Webhook URL alerts are relayed to (relaying is off without it)
    #[clap(long, value_name = "URL")]
    pub relay_url: Option<String>,

    /// Destination address handed to the relay (e.g. an SMS gateway address)
    #[clap(long, value_name = "ADDRESS", default_value = "")]
    pub relay_to: String,

    /// Text prepended to relayed alerts
    #[clap(long, value_name = "TEXT", default_value = "Home Monitor: ")]
    pub relay_prefix: String,
}

impl Args {
    /// Build the server configuration, making the root absolute.
    pub fn server_config(&self) -> io::Result<ServerConfig> {
        let root = if self.root.is_absolute() {
            self.root.clone()
        } else {
            std::env::current_dir()?.join(&self.root)
        };

        let mut config = ServerConfig::new(root);
        config.index = self.index.clone();
        config.protected = self.protect.iter().cloned().collect();
        config.protected.insert(self.index.clone());
        config.marker = self.watch_dir.join(&self.watch_file);
        config.poll_interval =
            Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL);
        config.relay = RelayConfig {
            url: self.relay_url.clone(),
            destination: self.relay_to.clone(),
            prefix: self.relay_prefix.clone(),
        };
        Ok(config)
    }
}
