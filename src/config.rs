//! Runtime configuration, fixed at startup.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Where and how alerts are relayed.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Webhook endpoint; `None` disables relaying
    pub url: Option<String>,
    /// Destination address passed to the relay
    pub destination: String,
    /// Prepended to the marker content in the relayed body
    pub prefix: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Absolute path of the served root
    pub root: PathBuf,
    /// Default document served for the empty path
    pub index: String,
    /// Base names that can never be deleted (always includes `index`)
    pub protected: BTreeSet<String>,
    /// Marker file written by the capture tool
    pub marker: PathBuf,
    pub poll_interval: Duration,
    pub relay: RelayConfig,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let index = "index.html".to_string();
        Self {
            root: root.into(),
            protected: BTreeSet::from([index.clone()]),
            index,
            marker: PathBuf::from("captures").join("detection.csv"),
            poll_interval: crate::watcher::DEFAULT_POLL_INTERVAL,
            relay: RelayConfig::default(),
        }
    }
}
