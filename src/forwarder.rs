//! HTTP delivery of matched records

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ProcessorError, Result};

/// How a single delivery attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status
    Delivered { status: u16 },
    /// The endpoint answered with any other status
    Rejected { status: u16 },
    /// The request never produced a response (connect, timeout, ...)
    TransportError(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered { status } => write!(f, "delivered ({})", status),
            DeliveryOutcome::Rejected { status } => write!(f, "rejected ({})", status),
            DeliveryOutcome::TransportError(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Delivers a record payload to a destination
///
/// Delivery is attempted once. Implementations report failures through the
/// returned [`DeliveryOutcome`] and never retry.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn deliver(&self, url: &str, sequence_number: &str, payload: &Bytes) -> DeliveryOutcome;
}

/// Posts payloads as `application/json` with reqwest
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Builds the forwarder. Without a timeout, requests wait as long as the
    /// connection allows.
    pub fn new(request_timeout: Option<Duration>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            ProcessorError::ConfigError(format!("failed to construct HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn deliver(&self, url: &str, sequence_number: &str, payload: &Bytes) -> DeliveryOutcome {
        let response = match self.client.post(url).body(payload.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    url = %url,
                    sequence = %sequence_number,
                    error = %e,
                    "Error posting record"
                );
                return DeliveryOutcome::TransportError(e.to_string());
            }
        };

        let status = response.status();

        // Drain the body so the connection goes back to the pool.
        if let Err(e) = response.bytes().await {
            debug!(url = %url, error = %e, "Failed to read response body");
        }

        if status.is_success() {
            debug!(
                url = %url,
                sequence = %sequence_number,
                status = status.as_u16(),
                "Record delivered"
            );
            DeliveryOutcome::Delivered {
                status: status.as_u16(),
            }
        } else {
            warn!(
                url = %url,
                sequence = %sequence_number,
                status = status.as_u16(),
                "Received non-success status when posting record"
            );
            DeliveryOutcome::Rejected {
                status: status.as_u16(),
            }
        }
    }
}
