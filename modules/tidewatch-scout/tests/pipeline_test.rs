use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tidewatch_common::{
    CanonicalDocument, DeliveryReport, IngestError, KeywordTask, RawSearchItem, SearchAuthor,
    SearchStats,
};
use tidewatch_scout::flatten::PostFlattener;
use tidewatch_scout::scheduler::Orchestrator;
use tidewatch_scout::search::{KeywordSearcher, SearchOutcome};
use tidewatch_scout::sink::DocumentSink;

fn post(id: &str, desc: &str, create_time: i64) -> RawSearchItem {
    RawSearchItem {
        id: Some(id.to_string()),
        desc: Some(desc.to_string()),
        create_time: Some(create_time),
        video: None,
        author: Some(SearchAuthor {
            id: Some("9".to_string()),
            unique_id: Some("user9".to_string()),
            nickname: Some("User Nine".to_string()),
        }),
        stats: Some(SearchStats::default()),
        author_stats: None,
        item_type: 1,
    }
}

fn task(keyword: &str) -> KeywordTask {
    KeywordTask {
        org_id: 7,
        keyword: keyword.to_string(),
        status: "active".to_string(),
    }
}

/// Searcher returning canned item sets per keyword; errors for keywords
/// it has no entry for.
struct CannedSearcher {
    by_keyword: HashMap<String, Vec<RawSearchItem>>,
}

#[async_trait]
impl KeywordSearcher for CannedSearcher {
    async fn search(&self, keyword: &str) -> Result<SearchOutcome, IngestError> {
        match self.by_keyword.get(keyword) {
            Some(items) => Ok(SearchOutcome {
                items: items.clone(),
                cost: 1.0,
            }),
            None => Err(IngestError::Fetch(format!("no fixture for {keyword:?}"))),
        }
    }
}

/// Sink that records successful batches and fails its first N deliveries
/// with a zero-success report.
struct RecordingSink {
    batches: Mutex<Vec<Vec<CanonicalDocument>>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingSink {
    fn new(failures: u32) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            failures_remaining: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl DocumentSink for RecordingSink {
    async fn deliver(
        &self,
        documents: &[CanonicalDocument],
    ) -> Result<DeliveryReport, IngestError> {
        let mut remaining = self.failures_remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(DeliveryReport {
                successes: 0,
                errors: vec!["index unavailable".to_string()],
            });
        }
        self.batches.lock().unwrap().push(documents.to_vec());
        Ok(DeliveryReport {
            successes: documents.len() as u64,
            errors: Vec::new(),
        })
    }
}

fn orchestrator(searcher: CannedSearcher, sink: Arc<RecordingSink>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(searcher),
        sink,
        PostFlattener::new("https://www.tiktok.com", "tt", "tiktok_1"),
        vec![7],
        "active",
        Duration::ZERO,
    )
}

#[tokio::test]
async fn filters_shape_the_delivered_batch() {
    let now = Utc::now().timestamp();
    let old = now - 5 * 24 * 3600;

    // Five post items: three survive both filters, one is stale, one has
    // no Vietnamese diacritics.
    let items = vec![
        post("1", "tin bão khẩn cấp", now),
        post("2", "cứu trợ miền trung", now),
        post("3", "english only caption", now),
        post("4", "lũ lụt năm ngoái", old),
        post("5", "giá xăng hôm nay", now),
    ];

    let sink = Arc::new(RecordingSink::new(0));
    let orch = orchestrator(
        CannedSearcher {
            by_keyword: HashMap::from([("abc".to_string(), items)]),
        },
        sink.clone(),
    );

    let stats = orch.run_pass(&[task("abc")]).await;

    assert_eq!(stats.keywords_processed, 1);
    assert_eq!(stats.items_fetched, 5);
    assert_eq!(stats.items_filtered, 2);
    assert_eq!(stats.documents_delivered, 3);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let docs = &batches[0];
    assert_eq!(docs.len(), 3);
    let ids: Vec<_> = docs.iter().map(|d| d.source_id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "5"]);
    for doc in docs {
        assert_eq!(doc.doc_type, 1);
        assert_eq!(doc.crawl_source, 2);
        assert_eq!(doc.auth_type, 1);
        assert_eq!(doc.source_type, 5);
    }
}

#[tokio::test]
async fn empty_batch_is_not_delivered() {
    let sink = Arc::new(RecordingSink::new(0));
    let orch = orchestrator(
        CannedSearcher {
            by_keyword: HashMap::from([("quiet".to_string(), Vec::new())]),
        },
        sink.clone(),
    );

    let stats = orch.run_pass(&[task("quiet")]).await;

    assert_eq!(stats.keywords_processed, 1);
    assert_eq!(stats.documents_delivered, 0);
    assert!(sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_does_not_block_next_keyword() {
    let now = Utc::now().timestamp();
    let sink = Arc::new(RecordingSink::new(1));
    let orch = orchestrator(
        CannedSearcher {
            by_keyword: HashMap::from([
                ("first".to_string(), vec![post("10", "bão số 3", now)]),
                ("second".to_string(), vec![post("20", "mưa lớn", now)]),
            ]),
        },
        sink.clone(),
    );

    let stats = orch
        .run_pass(&[task("first"), task("second")])
        .await;

    // The first batch is lost, the second keyword still runs and delivers.
    assert_eq!(stats.keywords_processed, 2);
    assert_eq!(stats.keywords_failed, 0);
    assert_eq!(stats.batches_lost, 1);
    assert_eq!(stats.documents_delivered, 1);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].source_id.as_deref(), Some("20"));
}

#[tokio::test]
async fn failing_keyword_is_isolated_from_siblings() {
    let now = Utc::now().timestamp();
    let sink = Arc::new(RecordingSink::new(0));
    let orch = orchestrator(
        CannedSearcher {
            // "broken" has no fixture, so the searcher errors on it.
            by_keyword: HashMap::from([(
                "healthy".to_string(),
                vec![post("30", "ngập lụt đô thị", now)],
            )]),
        },
        sink.clone(),
    );

    let stats = orch
        .run_pass(&[task("broken"), task("healthy")])
        .await;

    assert_eq!(stats.keywords_failed, 1);
    assert_eq!(stats.keywords_processed, 1);
    assert_eq!(stats.documents_delivered, 1);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].source_id.as_deref(), Some("30"));
}
