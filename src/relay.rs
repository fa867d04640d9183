//! Out-of-band alert delivery.
//!
//! The watcher hands every alert to a [`MessageRelay`]. Delivery is best
//! effort: failures are logged by the caller and never reach HTTP clients.

use crate::config::RelayConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from relay delivery.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Could not reach the relay endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay answered with a non-success status
    #[error("Relay rejected message: {0}")]
    Rejected(String),
}

/// Something that can deliver a plain-text alert to a destination address.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    async fn send(&self, destination: &str, body: &str) -> Result<(), RelayError>;
}

/// Relay used when none is configured. Accepts and drops every message.
#[derive(Debug, Default, Clone)]
pub struct DisabledRelay;

#[async_trait]
impl MessageRelay for DisabledRelay {
    async fn send(&self, destination: &str, body: &str) -> Result<(), RelayError> {
        tracing::debug!(
            "Relay disabled, not sending {} bytes to {:?}",
            body.len(),
            destination
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts alerts as JSON to an HTTP endpoint (for example an email-to-SMS bridge).
#[derive(Debug, Clone)]
pub struct WebhookRelay {
    client: reqwest::Client,
    url: String,
}

impl WebhookRelay {
    pub fn new(url: impl Into<String>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MessageRelay for WebhookRelay {
    async fn send(&self, destination: &str, body: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage {
                to: destination,
                subject: "ALERT",
                body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Rejected(status.to_string()));
        }

        tracing::info!("Alert relayed to {}", destination);
        Ok(())
    }
}

/// Build the relay described by `config`.
///
/// A webhook relay whose HTTP client cannot be built is replaced by
/// [`DisabledRelay`] after logging the error.
pub fn from_config(config: &RelayConfig) -> Arc<dyn MessageRelay> {
    let Some(url) = &config.url else {
        return Arc::new(DisabledRelay);
    };
    match WebhookRelay::new(url) {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            tracing::error!("Failed to build relay client for {}: {}", url, e);
            Arc::new(DisabledRelay)
        }
    }
}
