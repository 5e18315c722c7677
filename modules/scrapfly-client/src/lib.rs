pub mod error;

pub use error::{Result, ScrapflyError};

use std::time::Duration;

use serde::Deserialize;

const API_URL: &str = "https://api.scrapfly.io/scrape";

/// Description of one scrape call against the fetch API. The API runs a
/// headless browser on its side; everything past the URL is rendering and
/// routing configuration.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub render_js: bool,
    /// Proxy pool country code, e.g. "vn".
    pub country: Option<String>,
    /// Client-named session. Requests sharing a name share browser state.
    pub session: Option<String>,
    /// XPath selector the renderer waits on before settling.
    pub wait_for_selector: Option<String>,
    pub auto_scroll: bool,
    pub rendering_wait_ms: Option<u32>,
    /// Hard per-call budget enforced by the API, in credits.
    pub cost_budget: Option<u32>,
    pub headers: Vec<(String, String)>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            render_js: false,
            country: None,
            session: None,
            wait_for_selector: None,
            auto_scroll: false,
            rendering_wait_ms: None,
            cost_budget: None,
            headers: Vec::new(),
        }
    }

    pub fn render_js(mut self, on: bool) -> Self {
        self.render_js = on;
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn session(mut self, session: &str) -> Self {
        self.session = Some(session.to_string());
        self
    }

    pub fn wait_for_selector(mut self, selector: &str) -> Self {
        self.wait_for_selector = Some(selector.to_string());
        self
    }

    pub fn auto_scroll(mut self, on: bool) -> Self {
        self.auto_scroll = on;
        self
    }

    pub fn rendering_wait_ms(mut self, ms: u32) -> Self {
        self.rendering_wait_ms = Some(ms);
        self
    }

    pub fn cost_budget(mut self, credits: u32) -> Self {
        self.cost_budget = Some(credits);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Body and per-call cost returned by the fetch API. Cost is a first-class
/// value so callers can account for it or enforce their own budgets.
#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    pub body: String,
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    result: ApiResult,
    #[serde(default)]
    context: Option<ApiContext>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiContext {
    #[serde(default)]
    cost: ApiCost,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCost {
    #[serde(default)]
    total: f64,
}

pub struct ScrapflyClient {
    client: reqwest::Client,
    api_key: String,
}

impl ScrapflyClient {
    pub fn new(api_key: &str) -> Self {
        // Rendered scrapes with scrolling can legitimately take minutes.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(150))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    /// Execute one scrape call, returning the page body and the monetary
    /// cost the API reports for it.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse> {
        let mut query: Vec<(String, String)> = vec![
            ("key".to_string(), self.api_key.clone()),
            ("url".to_string(), request.url.clone()),
            ("render_js".to_string(), request.render_js.to_string()),
        ];
        if let Some(ref country) = request.country {
            query.push(("country".to_string(), country.clone()));
        }
        if let Some(ref session) = request.session {
            query.push(("session".to_string(), session.clone()));
        }
        if let Some(ref selector) = request.wait_for_selector {
            query.push(("wait_for_selector".to_string(), selector.clone()));
        }
        if request.auto_scroll {
            query.push(("auto_scroll".to_string(), "true".to_string()));
        }
        if let Some(wait) = request.rendering_wait_ms {
            query.push(("rendering_wait".to_string(), wait.to_string()));
        }
        if let Some(budget) = request.cost_budget {
            query.push(("cost_budget".to_string(), budget.to_string()));
        }
        for (name, value) in &request.headers {
            query.push((format!("headers[{name}]"), value.clone()));
        }

        tracing::debug!(url = request.url.as_str(), render_js = request.render_js, "Scrape call");

        let resp = self.client.get(API_URL).query(&query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScrapflyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope = resp
            .json()
            .await
            .map_err(|e| ScrapflyError::Malformed(e.to_string()))?;

        let cost = envelope.context.map(|c| c.cost.total).unwrap_or(0.0);
        Ok(ScrapeResponse {
            body: envelope.result.content,
            cost,
        })
    }
}
