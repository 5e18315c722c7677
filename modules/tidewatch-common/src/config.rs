use std::env;

use tracing::info;

/// Application configuration loaded from environment variables, once at
/// startup. Scrape, store, and delivery credentials are never logged.
#[derive(Debug, Clone)]
pub struct Config {
    // Tenancy and scheduling
    pub org_ids: Vec<i64>,
    pub keyword_status: String,
    pub run_interval_minutes: u64,
    pub pacing_seconds: u64,

    // Search
    pub max_results: usize,
    pub page_size: usize,
    pub base_url: String,
    pub scrapfly_api_key: String,

    // Keyword store
    pub database_url: String,

    // Index delivery
    pub index_url: String,
    pub index_name: String,

    // Liveness
    pub heartbeat_url: String,
    pub heartbeat_interval_seconds: u64,
    pub bot_id: String,
    pub bot_type: String,
    pub server_ip: String,

    // Document identity
    pub crawl_source_code: String,
    pub crawl_bot: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            org_ids: parse_org_ids(&required_env("ORG_IDS")),
            keyword_status: required_env("KEYWORD_STATUS"),
            run_interval_minutes: parsed_env("RUN_INTERVAL_MINUTES", 30),
            pacing_seconds: parsed_env("PACING_SECONDS", 3),
            max_results: parsed_env("MAX_RESULTS", 36),
            page_size: parsed_env("PAGE_SIZE", 12),
            base_url: env::var("TIKTOK_BASE_URL")
                .unwrap_or_else(|_| "https://www.tiktok.com".to_string()),
            scrapfly_api_key: required_env("SCRAPFLY_API_KEY"),
            database_url: required_env("DATABASE_URL"),
            index_url: required_env("INDEX_URL"),
            index_name: env::var("INDEX_NAME")
                .unwrap_or_else(|_| "not_classify_org_posts".to_string()),
            heartbeat_url: required_env("HEARTBEAT_URL"),
            heartbeat_interval_seconds: parsed_env("HEARTBEAT_INTERVAL_SECONDS", 60),
            bot_id: env::var("BOT_ID").unwrap_or_else(|_| "tiktok_1".to_string()),
            bot_type: env::var("BOT_TYPE").unwrap_or_else(|_| "tiktok".to_string()),
            server_ip: env::var("SERVER_IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            crawl_source_code: env::var("CRAWL_SOURCE_CODE").unwrap_or_else(|_| "tt".to_string()),
            crawl_bot: env::var("CRAWL_BOT").unwrap_or_else(|_| "tiktok_1".to_string()),
        }
    }

    /// Log the non-secret parts of the configuration.
    pub fn log_redacted(&self) {
        info!(
            orgs = ?self.org_ids,
            status = self.keyword_status.as_str(),
            run_interval_minutes = self.run_interval_minutes,
            pacing_seconds = self.pacing_seconds,
            max_results = self.max_results,
            page_size = self.page_size,
            base_url = self.base_url.as_str(),
            index = self.index_name.as_str(),
            bot_id = self.bot_id.as_str(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}

fn parse_org_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .unwrap_or_else(|_| panic!("ORG_IDS must be comma-separated integers, got {s:?}"))
        })
        .collect()
}
