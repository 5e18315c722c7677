use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use tidewatch_common::{CanonicalDocument, DeliveryReport, IngestError};

/// Delivery attempts per batch. The index call is an upsert, so retrying
/// a half-applied batch is safe.
const DELIVERY_MAX_ATTEMPTS: u32 = 3;
/// Base backoff between attempts; doubles each retry.
const DELIVERY_RETRY_BASE: Duration = Duration::from_secs(2);

/// Downstream document index seam.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn deliver(&self, documents: &[CanonicalDocument]) -> Result<DeliveryReport, IngestError>;
}

#[derive(Serialize)]
struct UpsertEnvelope<'a> {
    index: &'a str,
    data: &'a [CanonicalDocument],
    upsert: bool,
}

/// Posts document batches to the downstream index endpoint.
pub struct HttpIndexSink {
    client: reqwest::Client,
    endpoint: String,
    index_name: String,
}

impl HttpIndexSink {
    pub fn new(endpoint: &str, index_name: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            index_name: index_name.to_string(),
        }
    }

    async fn post_batch(&self, documents: &[CanonicalDocument]) -> Result<(), IngestError> {
        let envelope = UpsertEnvelope {
            index: &self.index_name,
            data: documents,
            upsert: true,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| IngestError::Delivery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(IngestError::Delivery(format!(
                "index returned status {status}: {message}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for HttpIndexSink {
    /// Deliver one batch with bounded retry and backoff. After the last
    /// failed attempt the batch is reported lost, not escalated: the next
    /// scheduled pass re-fetches and re-normalizes independently.
    async fn deliver(&self, documents: &[CanonicalDocument]) -> Result<DeliveryReport, IngestError> {
        let mut errors = Vec::new();
        for attempt in 0..DELIVERY_MAX_ATTEMPTS {
            match self.post_batch(documents).await {
                Ok(()) => {
                    info!(
                        count = documents.len(),
                        index = self.index_name.as_str(),
                        "Delivered document batch"
                    );
                    return Ok(DeliveryReport {
                        successes: documents.len() as u64,
                        errors: Vec::new(),
                    });
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "Index delivery attempt failed");
                    errors.push(e.to_string());
                    if attempt + 1 < DELIVERY_MAX_ATTEMPTS {
                        tokio::time::sleep(DELIVERY_RETRY_BASE * 2u32.pow(attempt)).await;
                    }
                }
            }
        }
        Ok(DeliveryReport {
            successes: 0,
            errors,
        })
    }
}
