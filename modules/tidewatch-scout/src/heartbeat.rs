use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use tidewatch_common::HeartbeatPayload;

/// Announces process health to the fleet monitor on a fixed cadence,
/// independently of the scheduler. A failed post is logged and the loop
/// continues on the next tick; liveness reporting never terminates over
/// a single failure.
pub struct HeartbeatReporter {
    client: reqwest::Client,
    endpoint: String,
    bot_id: String,
    bot_type: String,
    server_ip: String,
    interval: Duration,
}

impl HeartbeatReporter {
    pub fn new(
        endpoint: &str,
        bot_id: &str,
        bot_type: &str,
        server_ip: &str,
        interval: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            bot_id: bot_id.to_string(),
            bot_type: bot_type.to_string(),
            server_ip: server_ip.to_string(),
            interval,
        }
    }

    fn payload(&self) -> HeartbeatPayload {
        HeartbeatPayload {
            bot_id: self.bot_id.clone(),
            bot_type: self.bot_type.clone(),
            server_ip: self.server_ip.clone(),
            last_ping_at: Utc::now().timestamp(),
            status: "running".to_string(),
        }
    }

    /// Tick forever. Spawned alongside the scheduler at startup; aborted
    /// at shutdown.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let payload = self.payload();
            match self.client.post(&self.endpoint).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(bot_id = self.bot_id.as_str(), "Heartbeat delivered");
                }
                Ok(resp) => {
                    warn!(status = %resp.status(), "Heartbeat endpoint returned error");
                }
                Err(e) => {
                    warn!(error = %e, "Heartbeat delivery failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_identity_and_fresh_timestamp() {
        let reporter = HeartbeatReporter::new(
            "http://monitor.local/ping",
            "tiktok_1",
            "tiktok",
            "10.0.0.4",
            Duration::from_secs(60),
        );

        let before = Utc::now().timestamp();
        let payload = reporter.payload();
        let after = Utc::now().timestamp();

        assert_eq!(payload.bot_id, "tiktok_1");
        assert_eq!(payload.bot_type, "tiktok");
        assert_eq!(payload.server_ip, "10.0.0.4");
        assert_eq!(payload.status, "running");
        assert!(payload.last_ping_at >= before && payload.last_ping_at <= after);
    }
}
