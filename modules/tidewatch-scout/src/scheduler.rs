use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use tidewatch_common::{IngestError, KeywordTask};

use crate::flatten::{filter_vietnamese, PostFlattener};
use crate::keywords::KeywordStore;
use crate::search::KeywordSearcher;
use crate::sink::DocumentSink;

/// Counters for one scheduled pass over all tenants.
#[derive(Debug, Default)]
pub struct RunStats {
    pub keywords_processed: u32,
    pub keywords_failed: u32,
    pub items_fetched: u32,
    pub items_filtered: u32,
    pub documents_delivered: u32,
    pub batches_lost: u32,
    pub total_cost: f64,
}

impl RunStats {
    fn absorb(&mut self, other: RunStats) {
        self.keywords_processed += other.keywords_processed;
        self.keywords_failed += other.keywords_failed;
        self.items_fetched += other.items_fetched;
        self.items_filtered += other.items_filtered;
        self.documents_delivered += other.documents_delivered;
        self.batches_lost += other.batches_lost;
        self.total_cost += other.total_cost;
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "keywords={} failed={} items={} filtered={} delivered={} lost_batches={} cost={:.1}",
            self.keywords_processed,
            self.keywords_failed,
            self.items_fetched,
            self.items_filtered,
            self.documents_delivered,
            self.batches_lost,
            self.total_cost,
        )
    }
}

/// Drives the per-keyword pipeline across all configured tenants. One bad
/// keyword never aborts its siblings; one bad tenant never aborts the
/// others.
pub struct Orchestrator {
    searcher: Arc<dyn KeywordSearcher>,
    sink: Arc<dyn DocumentSink>,
    flattener: PostFlattener,
    org_ids: Vec<i64>,
    keyword_status: String,
    pacing: Duration,
}

impl Orchestrator {
    pub fn new(
        searcher: Arc<dyn KeywordSearcher>,
        sink: Arc<dyn DocumentSink>,
        flattener: PostFlattener,
        org_ids: Vec<i64>,
        keyword_status: &str,
        pacing: Duration,
    ) -> Self {
        Self {
            searcher,
            sink,
            flattener,
            org_ids,
            keyword_status: keyword_status.to_string(),
            pacing,
        }
    }

    /// One full pass: materialize each tenant's keyword set, then process
    /// its keywords strictly sequentially with pacing in between.
    pub async fn run(&self, store: &KeywordStore) -> RunStats {
        let mut stats = RunStats::default();

        for &org_id in &self.org_ids {
            let keywords = match store.fetch_for_org(org_id, &self.keyword_status).await {
                Ok(keywords) => keywords,
                Err(e) => {
                    error!(org_id, error = %e, "Keyword fetch failed, skipping tenant");
                    continue;
                }
            };
            info!(org_id, count = keywords.len(), "Keywords found");
            stats.absorb(self.run_pass(&keywords).await);
        }

        info!(%stats, "Scheduled pass complete");
        stats
    }

    /// Process one materialized keyword set.
    pub async fn run_pass(&self, keywords: &[KeywordTask]) -> RunStats {
        let mut stats = RunStats::default();

        for task in keywords {
            match self.process_keyword(task, &mut stats).await {
                Ok(delivered) => {
                    stats.keywords_processed += 1;
                    info!(
                        org_id = task.org_id,
                        keyword = task.keyword.as_str(),
                        delivered,
                        "Keyword processed"
                    );
                }
                Err(e) => {
                    stats.keywords_failed += 1;
                    error!(
                        org_id = task.org_id,
                        keyword = task.keyword.as_str(),
                        error = %e,
                        "Keyword failed, continuing with next"
                    );
                }
            }
            // Rate-limit courtesy to the upstream search API.
            tokio::time::sleep(self.pacing).await;
        }

        stats
    }

    async fn process_keyword(
        &self,
        task: &KeywordTask,
        stats: &mut RunStats,
    ) -> Result<u32, IngestError> {
        let outcome = self.searcher.search(&task.keyword).await?;
        stats.items_fetched += outcome.items.len() as u32;
        stats.total_cost += outcome.cost;

        // Pages have all settled by now; filtering runs over the aggregate.
        let before = outcome.items.len();
        let items = filter_vietnamese(outcome.items);
        stats.items_filtered += (before - items.len()) as u32;

        let documents = self.flattener.flatten_batch(&items, Utc::now());
        stats.items_filtered += (items.len() - documents.len()) as u32;

        if documents.is_empty() {
            return Ok(0);
        }

        let report = self.sink.deliver(&documents).await?;
        if report.errors.is_empty() {
            stats.documents_delivered += report.successes as u32;
            Ok(report.successes as u32)
        } else {
            // Batch is lost for this run; the next pass re-fetches it.
            stats.batches_lost += 1;
            warn!(
                keyword = task.keyword.as_str(),
                errors = report.errors.len(),
                "Delivery failed after retries, dropping batch"
            );
            Ok(0)
        }
    }
}
