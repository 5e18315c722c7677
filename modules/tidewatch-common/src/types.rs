use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Keyword store records ---

/// One tenant-scoped unit of scheduled search work. Immutable for the
/// duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KeywordTask {
    pub org_id: i64,
    pub keyword: String,
    pub status: String,
}

// --- Raw search wire shapes ---

/// `type` value marking a post entry in a search response.
pub const SEARCH_ITEM_TYPE_POST: i64 = 1;

/// Projection of one post entry from a search response page. The upstream
/// wire shape is unstable, so every field is optional; an absent or
/// mistyped field drops the entry, never the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSearchItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(rename = "createTime", default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub video: Option<serde_json::Value>,
    #[serde(default)]
    pub author: Option<SearchAuthor>,
    #[serde(default)]
    pub stats: Option<SearchStats>,
    #[serde(rename = "authorStats", default)]
    pub author_stats: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    pub item_type: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAuthor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "uniqueId", default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    #[serde(rename = "commentCount", default)]
    pub comment_count: Option<i64>,
    #[serde(rename = "shareCount", default)]
    pub share_count: Option<i64>,
    #[serde(rename = "diggCount", default)]
    pub digg_count: Option<i64>,
    /// Upstream sometimes sends this as a string or null, so it is kept
    /// raw and coerced at normalization time.
    #[serde(rename = "collectCount", default)]
    pub collect_count: Option<serde_json::Value>,
    #[serde(rename = "playCount", default)]
    pub play_count: Option<i64>,
}

// --- Canonical document code sets ---
// Stable small integer codes consumed by the downstream index. Named here
// so normalization rules stay auditable; never derived from input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DocType {
    Post = 1,
    Comment = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CrawlSource {
    TikTok = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AuthType {
    User = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SourceType {
    TikTok = 5,
}

// --- Canonical document ---

/// Normalized fixed-schema record delivered to the downstream index.
/// Produced once per surviving raw item and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalDocument {
    pub doc_type: i32,
    pub crawl_source: i32,
    pub crawl_source_code: String,
    pub pub_time: i64,
    pub crawl_time: i64,
    pub subject_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub url: String,
    pub media_urls: String,
    pub comments: i64,
    pub shares: i64,
    pub reactions: i64,
    pub favors: i64,
    pub views: i64,
    pub web_tags: String,
    pub web_keywords: String,
    pub auth_id: String,
    pub auth_name: String,
    pub auth_type: i32,
    pub auth_url: String,
    pub source_id: Option<String>,
    pub source_type: i32,
    pub source_name: Option<String>,
    pub source_url: String,
    pub reply_to: Option<String>,
    pub level: Option<String>,
    pub sentiment: i32,
    #[serde(rename = "isPriority")]
    pub is_priority: bool,
    pub crawl_bot: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

// --- Fleet monitor ---

/// Liveness report sent to the fleet monitor. Regenerated on every tick;
/// only the identity fields are fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(rename = "botId")]
    pub bot_id: String,
    #[serde(rename = "botType")]
    pub bot_type: String,
    #[serde(rename = "serverIp")]
    pub server_ip: String,
    #[serde(rename = "lastPingAt")]
    pub last_ping_at: i64,
    pub status: String,
}

// --- Index delivery ---

/// Outcome of one index delivery call. Failure paths report zero
/// successes and a populated error list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub successes: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_item_tolerates_sparse_payload() {
        let item: RawSearchItem = serde_json::from_str(r#"{"id":"123"}"#).unwrap();
        assert_eq!(item.id.as_deref(), Some("123"));
        assert!(item.desc.is_none());
        assert!(item.stats.is_none());
    }

    #[test]
    fn collect_count_survives_string_value() {
        let stats: SearchStats =
            serde_json::from_str(r#"{"collectCount":"42","diggCount":7}"#).unwrap();
        assert_eq!(stats.collect_count, Some(serde_json::json!("42")));
        assert_eq!(stats.digg_count, Some(7));
    }

    #[test]
    fn heartbeat_serializes_with_wire_names() {
        let payload = HeartbeatPayload {
            bot_id: "tiktok_1".to_string(),
            bot_type: "tiktok".to_string(),
            server_ip: "10.0.0.4".to_string(),
            last_ping_at: 1_700_000_000,
            status: "running".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["botId"], "tiktok_1");
        assert_eq!(json["lastPingAt"], 1_700_000_000);
        assert_eq!(json["serverIp"], "10.0.0.4");
    }
}
