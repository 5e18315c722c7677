use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use tidewatch_common::{IngestError, KeywordTask};

/// Persistent connection to the keyword store. Opened once before
/// scheduling starts, closed once on shutdown.
pub struct KeywordStore {
    pool: PgPool,
}

impl KeywordStore {
    pub async fn connect(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(20))
            .connect(database_url)
            .await
            .map_err(|e| IngestError::Store(format!("failed to connect to keyword store: {e}")))?;

        info!("Connected to keyword store");
        Ok(Self { pool })
    }

    /// Fetch every keyword for one tenant at the given status. The match
    /// set is fully materialized here so iteration never holds a live
    /// cursor open across slow network calls.
    pub async fn fetch_for_org(
        &self,
        org_id: i64,
        status: &str,
    ) -> Result<Vec<KeywordTask>, IngestError> {
        sqlx::query_as::<_, KeywordTask>(
            "SELECT org_id, keyword, status FROM search_keywords \
             WHERE org_id = $1 AND status = $2",
        )
        .bind(org_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestError::Store(format!("keyword query failed for org {org_id}: {e}")))
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Keyword store connection closed");
    }
}
