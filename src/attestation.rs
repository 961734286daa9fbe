//! Polling client for Circle's attestation API.
//!
//! After a burn confirms, the attestation service observes the `MessageSent`
//! event and eventually publishes a signed attestation for it. This client
//! polls `GET /v2/messages/{source_domain}?transactionHash={burn_tx}` until
//! the first entry reports `complete`, with three outcome classes:
//!
//! - pending-family statuses retry on the base interval,
//! - transient HTTP failures retry on a longer interval,
//! - an unrecognized terminal status fails immediately.
//!
//! Polling is bounded: once the attempt cap is reached a still-pending
//! transfer surfaces as [`AttestationError::Timeout`] instead of spinning
//! forever.

use std::time::Duration;

use alloy::primitives::{Bytes, TxHash};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::task::PollTask;

/// Default attestation endpoint for the testnet domains we bridge.
pub const DEFAULT_API_BASE: &str = "https://iris-api-sandbox.circle.com";

/// A complete, signed attestation ready to submit to `receiveMessage`.
///
/// Consumed exactly once by the mint step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationRecord {
    /// CCTP message bytes as attested (the service fills in the nonce).
    pub message: Bytes,
    /// The attestation signature authorizing the mint.
    pub attestation: Bytes,
}

#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("Attestation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Attestation service returned HTTP {status}")]
    BadStatus { status: u16 },
    #[error("Attestation still {status} for this burn")]
    Pending { status: String },
    #[error("No messages found for this burn transaction yet")]
    NoMessages,
    #[error("Attestation failed with status: {status}")]
    Failed { status: String },
    #[error("Attestation response missing field: {field}")]
    MissingField { field: &'static str },
    #[error("Attestation payload is not valid hex: {0}")]
    HexDecode(#[from] alloy::hex::FromHexError),
    #[error("Gave up waiting for attestation after {attempts} attempts: {last}")]
    Timeout {
        attempts: usize,
        #[source]
        last: Box<AttestationError>,
    },
}

impl AttestationError {
    /// Whether another poll attempt could change the outcome.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::BadStatus { .. } | Self::Pending { .. } | Self::NoMessages
        )
    }

    /// Transient transport problems back off longer than ordinary pending.
    fn is_transient_fetch_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::BadStatus { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AttestationConfig {
    pub api_base: String,
    /// Interval between polls while the attestation is pending.
    pub poll_interval: Duration,
    /// Longer interval applied after a transient fetch error.
    pub error_retry_interval: Duration,
    /// Attempt cap; pending beyond this becomes a timeout error.
    pub max_attempts: usize,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: Duration::from_secs(5),
            error_retry_interval: Duration::from_secs(10),
            // 120 polls at 5s matches the original ten-minute ceiling.
            max_attempts: 120,
        }
    }
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<MessageEntry>,
}

#[derive(Deserialize, Debug)]
struct MessageEntry {
    status: Option<String>,
    message: Option<String>,
    attestation: Option<String>,
}

/// Statuses the service reports while an attestation is still in flight.
const PENDING_STATUSES: [&str; 3] = ["pending", "pending_confirmations", "in_progress"];

#[derive(Debug, Clone)]
pub struct AttestationClient {
    http: reqwest::Client,
    config: AttestationConfig,
}

impl AttestationClient {
    pub fn new(config: AttestationConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { http, config })
    }

    fn url(&self, source_domain: u32, burn_tx: TxHash) -> String {
        format!(
            "{}/v2/messages/{source_domain}?transactionHash={burn_tx}",
            self.config.api_base
        )
    }

    /// Polls until the attestation completes, fails terminally, or the
    /// attempt cap is exhausted.
    pub async fn wait_for_attestation(
        &self,
        source_domain: u32,
        burn_tx: TxHash,
    ) -> Result<AttestationRecord, AttestationError> {
        let url = self.url(source_domain, burn_tx);
        info!(%url, "Polling for attestation");

        let mut attempts = 0;
        loop {
            attempts += 1;

            let error = match self.fetch_once(&url).await {
                Ok(record) => {
                    info!(attempts, "Attestation complete");
                    return Ok(record);
                }
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => error,
            };

            if attempts >= self.config.max_attempts {
                return Err(AttestationError::Timeout {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = if error.is_transient_fetch_error() {
                warn!(%error, attempts, "Attestation fetch failed, backing off");
                self.config.error_retry_interval
            } else {
                debug!(%error, attempts, "Attestation not ready, retrying");
                self.config.poll_interval
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// Spawns the wait as a cancellable background task.
    pub fn spawn_wait(
        &self,
        source_domain: u32,
        burn_tx: TxHash,
    ) -> PollTask<Result<AttestationRecord, AttestationError>> {
        let client = self.clone();
        PollTask::wrap(tokio::spawn(async move {
            client.wait_for_attestation(source_domain, burn_tx).await
        }))
    }

    async fn fetch_once(&self, url: &str) -> Result<AttestationRecord, AttestationError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AttestationError::BadStatus {
                status: response.status().as_u16(),
            });
        }

        let body: MessagesResponse = response.json().await?;
        let entry = body.messages.first().ok_or(AttestationError::NoMessages)?;

        classify_entry(entry)
    }
}

/// Maps one API message entry to complete / pending / failed.
fn classify_entry(entry: &MessageEntry) -> Result<AttestationRecord, AttestationError> {
    let status = entry.status.as_deref().unwrap_or("pending");

    // The service sometimes reports completion state through the attestation
    // field itself ("PENDING" placeholder) before status catches up.
    let attestation_placeholder = entry.attestation.as_deref() == Some("PENDING");

    if status == "complete" && !attestation_placeholder {
        let attestation_hex = entry
            .attestation
            .as_deref()
            .ok_or(AttestationError::MissingField {
                field: "attestation",
            })?;
        let message_hex = entry
            .message
            .as_deref()
            .ok_or(AttestationError::MissingField { field: "message" })?;

        if !attestation_hex.starts_with("0x") {
            return Err(AttestationError::Failed {
                status: format!("unrecognized attestation payload: {attestation_hex}"),
            });
        }

        return Ok(AttestationRecord {
            message: Bytes::from(alloy::hex::decode(message_hex)?),
            attestation: Bytes::from(alloy::hex::decode(attestation_hex)?),
        });
    }

    if attestation_placeholder || PENDING_STATUSES.contains(&status) {
        return Err(AttestationError::Pending {
            status: status.to_string(),
        });
    }

    Err(AttestationError::Failed {
        status: status.to_string(),
    })
}
