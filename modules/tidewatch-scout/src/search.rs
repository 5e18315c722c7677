use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use scrapfly_client::{ScrapeRequest, ScrapeResponse, ScrapflyClient};
use tidewatch_common::{IngestError, RawSearchItem, SEARCH_ITEM_TYPE_POST};

/// Max page requests in flight within one keyword's pagination. The fetch
/// API governs actual browser parallelism on its side.
const PAGE_CONCURRENCY: usize = 5;

/// Total length of a per-request search identifier.
const SEARCH_ID_LEN: usize = 32;

/// Warn when one keyword's cumulative scrape cost crosses this many API
/// credits. Observational only; nothing is aborted.
const COST_WARN_THRESHOLD: f64 = 50.0;

/// Proxy pool country for all search traffic.
const PROXY_COUNTRY: &str = "vn";

/// Load checkpoint the session-opening render settles at: the first
/// organic search result card.
const SEARCH_READY_SELECTOR: &str = "//div[@data-e2e='search_top-item']";

/// Extra settle time after the render, so lazily loaded result cards
/// populate before the session is considered open.
const SESSION_RENDER_WAIT_MS: u32 = 10_000;

/// Short-lived handle binding one keyword's paginated requests together.
/// Never reused across keywords.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub session_id: String,
    pub cumulative_cost: f64,
}

/// Aggregated result of one keyword search: parsed post items from every
/// page that settled, plus the total cost of the session.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub items: Vec<RawSearchItem>,
    pub cost: f64,
}

/// Seam over the external fetch primitive so pagination can be exercised
/// without network access.
#[async_trait]
pub trait SearchFetcher: Send + Sync {
    async fn fetch(&self, request: &ScrapeRequest) -> scrapfly_client::Result<ScrapeResponse>;
}

#[async_trait]
impl SearchFetcher for ScrapflyClient {
    async fn fetch(&self, request: &ScrapeRequest) -> scrapfly_client::Result<ScrapeResponse> {
        self.scrape(request).await
    }
}

/// One keyword in, aggregated post items out. The orchestrator only sees
/// this seam.
#[async_trait]
pub trait KeywordSearcher: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<SearchOutcome, IngestError>;
}

/// Paginated search against the platform's internal search API, bound to
/// a per-keyword scraping session.
pub struct SearchClient {
    fetcher: Arc<dyn SearchFetcher>,
    base_url: String,
    max_results: usize,
    page_size: usize,
}

impl SearchClient {
    pub fn new(
        fetcher: Arc<dyn SearchFetcher>,
        base_url: &str,
        max_results: usize,
        page_size: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
            page_size,
        }
    }

    /// Open a scraping session bound to this keyword's search query.
    /// Renders the search page and settles at the first result card so
    /// the session carries the state the paginated API requires.
    async fn establish_session(&self, keyword: &str) -> Result<SearchSession, IngestError> {
        let session_id = format!("tiktok_search_{}", Uuid::new_v4().simple());
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(keyword));

        info!(keyword, url = url.as_str(), "Establishing search session");
        let request = ScrapeRequest::new(&url)
            .render_js(true)
            .auto_scroll(true)
            .rendering_wait_ms(SESSION_RENDER_WAIT_MS)
            .country(PROXY_COUNTRY)
            .session(&session_id)
            .wait_for_selector(SEARCH_READY_SELECTOR);

        let response = self.fetcher.fetch(&request).await.map_err(|e| {
            IngestError::Fetch(format!("session establishment failed for {keyword:?}: {e}"))
        })?;

        if response.cost > COST_WARN_THRESHOLD {
            warn!(keyword, cost = response.cost, "High-cost session establishment");
        }

        Ok(SearchSession {
            session_id,
            cumulative_cost: response.cost,
        })
    }

    /// Fetch and parse one API page at the given offset, under an
    /// established session.
    async fn fetch_page(
        &self,
        keyword: &str,
        offset: usize,
        session_id: &str,
    ) -> Result<(Vec<RawSearchItem>, f64), IngestError> {
        let search_id = generate_search_id(Utc::now());
        let url = search_page_url(&self.base_url, keyword, offset, &search_id);
        let request = ScrapeRequest::new(&url)
            .country(PROXY_COUNTRY)
            .session(session_id);

        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| IngestError::Fetch(format!("page fetch failed at offset {offset}: {e}")))?;

        Ok((parse_search_page(&response.body), response.cost))
    }

    async fn search_inner(&self, keyword: &str) -> Result<SearchOutcome, IngestError> {
        let mut session = self.establish_session(keyword).await?;

        // The first page is fetched alone; its item order is the one
        // stable ordering the aggregate preserves. Like any other page
        // it is dropped on failure, leaving the siblings to fetch.
        let mut items = match self.fetch_page(keyword, 0, &session.session_id).await {
            Ok((page_items, cost)) => {
                session.cumulative_cost += cost;
                page_items
            }
            Err(e) => {
                warn!(keyword, offset = 0usize, error = %e, "Dropping failed page");
                Vec::new()
            }
        };

        let offsets: Vec<usize> = (1..)
            .map(|i| i * self.page_size)
            .take_while(|&offset| offset < self.max_results)
            .collect();

        // Remaining pages fan out concurrently under the same session,
        // each with a freshly generated search id. A failed page is
        // dropped without aborting its siblings.
        let pages: Vec<_> = stream::iter(offsets.into_iter().map(|offset| {
            let session_id = session.session_id.clone();
            async move { (offset, self.fetch_page(keyword, offset, &session_id).await) }
        }))
        .buffer_unordered(PAGE_CONCURRENCY)
        .collect()
        .await;

        for (offset, result) in pages {
            match result {
                Ok((page_items, cost)) => {
                    session.cumulative_cost += cost;
                    items.extend(page_items);
                }
                Err(e) => {
                    warn!(keyword, offset, error = %e, "Dropping failed page");
                }
            }
        }

        if session.cumulative_cost > COST_WARN_THRESHOLD {
            warn!(
                keyword,
                cost = session.cumulative_cost,
                "Keyword search exceeded cost threshold"
            );
        }

        info!(
            keyword,
            items = items.len(),
            cost = session.cumulative_cost,
            "Search pagination complete"
        );
        Ok(SearchOutcome {
            items,
            cost: session.cumulative_cost,
        })
    }
}

#[async_trait]
impl KeywordSearcher for SearchClient {
    /// Run the full paginated search for one keyword. A total failure of
    /// the fetch layer yields an empty outcome: the keyword contributes
    /// zero results this run and the caller moves on.
    async fn search(&self, keyword: &str) -> Result<SearchOutcome, IngestError> {
        match self.search_inner(keyword).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(keyword, error = %e, "Keyword search failed, yielding no results");
                Ok(SearchOutcome::default())
            }
        }
    }
}

/// Generate the per-request search identifier the API requires: a
/// `%Y%m%d%H%M%S` timestamp prefix padded with random uppercase hex to 32
/// characters. Reusing one across pages desynchronizes result sets.
pub fn generate_search_id(now: DateTime<Utc>) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut id = now.format("%Y%m%d%H%M%S").to_string();
    let mut rng = rand::rng();
    while id.len() < SEARCH_ID_LEN {
        id.push(HEX[rng.random_range(0..HEX.len())] as char);
    }
    id
}

/// Build the search API URL for one page. Spaces must encode as `%20`
/// (the API rejects `+`), hence percent-encoding over form-encoding.
pub fn search_page_url(base_url: &str, keyword: &str, offset: usize, search_id: &str) -> String {
    format!(
        "{base_url}/api/search/general/full/?keyword={}&offset={offset}&search_id={search_id}\
         &region=VN&priority_region=VN&tz_name={}&app_language=vi-VN&browser_language=vi-VN\
         &webcast_language=vi",
        urlencoding::encode(keyword),
        urlencoding::encode("Asia/Saigon"),
    )
}

#[derive(serde::Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Parse one raw page body into post items. Entries that are not posts,
/// or whose `item` projection does not deserialize, are skipped; a
/// malformed payload yields an empty page rather than an error.
pub fn parse_search_page(body: &str) -> Vec<RawSearchItem> {
    let page: SearchPage = match serde_json::from_str(body) {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Failed to parse search page payload");
            return Vec::new();
        }
    };

    let mut items = Vec::new();
    for entry in page.data {
        let entry_type = entry.get("type").and_then(|t| t.as_i64()).unwrap_or(0);
        if entry_type != SEARCH_ITEM_TYPE_POST {
            continue;
        }
        let Some(inner) = entry.get("item") else {
            continue;
        };
        match serde_json::from_value::<RawSearchItem>(inner.clone()) {
            Ok(mut item) => {
                item.item_type = entry_type;
                items.push(item);
            }
            Err(e) => {
                debug!(error = %e, "Skipping structurally invalid search entry");
            }
        }
    }
    items
}
