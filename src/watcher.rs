//! Marker-file watcher.
//!
//! An external capture tool signals a detection by writing a marker file.
//! The watcher polls for it, publishes its trimmed content as an `ALERT` on
//! the [`EventBus`], hands the same content to the [`MessageRelay`], and then
//! deletes the marker. The marker is a single-shot trigger: a second write
//! landing between the read and the delete is lost.

use crate::events::EventBus;
use crate::relay::MessageRelay;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest poll interval the watcher accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Errors from a single poll. Logged by [`ChangeWatcher::run`], never fatal.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payload published for each detection.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "ALERT",
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Polls a marker file and turns its appearances into alerts.
pub struct ChangeWatcher {
    marker: PathBuf,
    bus: EventBus,
    relay: Arc<dyn MessageRelay>,
    destination: String,
    prefix: String,
    interval: Duration,
}

impl ChangeWatcher {
    pub fn new(marker: impl Into<PathBuf>, bus: EventBus, relay: Arc<dyn MessageRelay>) -> Self {
        Self {
            marker: marker.into(),
            bus,
            relay,
            destination: String::new(),
            prefix: String::new(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Address the relay delivers to.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Text prepended to the relayed message body.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Time between polls. Clamped to at least 1ms.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Check the marker once.
    ///
    /// Returns the alert that was published, or `None` if there was no marker
    /// or it was blank. The marker is removed whenever it was found, even if
    /// handling its content failed.
    pub async fn poll_once(&self) -> Result<Option<Alert>, WatchError> {
        let bytes = match fs::read(&self.marker).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                self.remove_marker().await?;
                return Err(e.into());
            }
        };

        let handled = self.handle_content(&bytes);
        self.remove_marker().await?;
        handled
    }

    fn handle_content(&self, bytes: &[u8]) -> Result<Option<Alert>, WatchError> {
        let content = String::from_utf8_lossy(bytes);
        let content = content.trim();
        if content.is_empty() {
            tracing::debug!("Ignoring empty marker {}", self.marker.display());
            return Ok(None);
        }

        let alert = Alert::new(content);
        let delivered = self.bus.publish(alert.to_json()?);
        tracing::info!("Alert {:?} published to {} subscribers", content, delivered);

        self.relay_alert(content);
        Ok(Some(alert))
    }

    /// Forward content to the relay without waiting for it.
    fn relay_alert(&self, content: &str) {
        let relay = Arc::clone(&self.relay);
        let destination = self.destination.clone();
        let body = format!("{}{}", self.prefix, content);
        tokio::spawn(async move {
            if let Err(e) = relay.send(&destination, &body).await {
                tracing::warn!("Failed to relay alert: {}", e);
            }
        });
    }

    async fn remove_marker(&self) -> Result<(), WatchError> {
        match fs::remove_file(&self.marker).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Poll forever at the configured interval.
    pub async fn run(self) {
        tracing::info!(
            "Monitoring {} every {:?}",
            self.marker.display(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                tracing::error!("Watcher error on {}: {}", self.marker.display(), e);
            }
        }
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_json() {
        let alert = Alert::new("motion detected");
        assert_eq!(
            alert.to_json().unwrap(),
            r#"{"type":"ALERT","message":"motion detected"}"#
        );
    }

    #[test]
    fn test_alert_json_escapes() {
        let alert = Alert::new("cam \"1\"\nzone 2");
        let value: serde_json::Value = serde_json::from_str(&alert.to_json().unwrap()).unwrap();
        assert_eq!(value["message"], "cam \"1\"\nzone 2");
    }
}
