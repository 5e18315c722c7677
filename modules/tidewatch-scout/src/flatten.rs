use chrono::{DateTime, Duration, Utc};

use tidewatch_common::{
    AuthType, CanonicalDocument, CrawlSource, DocType, RawSearchItem, SourceType,
};

/// Maximum age a post may have to be retained.
const RECENCY_WINDOW_DAYS: i64 = 2;

/// Vietnamese diacritic characters, both cases, plus đ. A post counts as
/// Vietnamese when its text contains at least one of these.
const VIETNAMESE_DIACRITICS: &str = "àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡ\
    ùúụủũưừứựửữỳýỵỷỹđÀÁẠẢÃÂẦẤẬẨẪĂẰẮẶẲẴÈÉẸẺẼÊỀẾỆỂỄÌÍỊỈĨÒÓỌỎÕÔỒỐỘỔỖƠỜỚỢỞỠ\
    ÙÚỤỦŨƯỪỨỰỬỮỲÝỴỶỸĐ";

/// True when the text contains at least one Vietnamese diacritic.
pub fn is_vietnamese(text: &str) -> bool {
    text.chars().any(|c| VIETNAMESE_DIACRITICS.contains(c))
}

/// Retain only items whose description reads as Vietnamese. Applied once
/// per keyword, after all pages are aggregated; an item without a
/// description is dropped here too.
pub fn filter_vietnamese(items: Vec<RawSearchItem>) -> Vec<RawSearchItem> {
    items
        .into_iter()
        .filter(|item| item.desc.as_deref().is_some_and(is_vietnamese))
        .collect()
}

/// Flattens raw search items into the canonical document schema consumed
/// by the downstream index.
pub struct PostFlattener {
    base_url: String,
    crawl_source_code: String,
    crawl_bot: String,
}

impl PostFlattener {
    pub fn new(base_url: &str, crawl_source_code: &str, crawl_bot: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            crawl_source_code: crawl_source_code.to_string(),
            crawl_bot: crawl_bot.to_string(),
        }
    }

    /// Normalize one raw item, or nothing when it falls outside the
    /// recency window. Pure function of the input and the injected clock.
    pub fn flatten(&self, item: &RawSearchItem, now: DateTime<Utc>) -> Option<CanonicalDocument> {
        let pub_time = item.create_time.unwrap_or(0);
        let cutoff = now - Duration::days(RECENCY_WINDOW_DAYS);
        if pub_time < cutoff.timestamp() {
            return None;
        }

        let author = item.author.clone().unwrap_or_default();
        let stats = item.stats.clone().unwrap_or_default();
        let unique_id = author.unique_id.unwrap_or_default();

        Some(CanonicalDocument {
            doc_type: DocType::Post as i32,
            crawl_source: CrawlSource::TikTok as i32,
            crawl_source_code: self.crawl_source_code.clone(),
            pub_time,
            crawl_time: now.timestamp(),
            subject_id: None,
            title: None,
            description: None,
            content: item.desc.clone().unwrap_or_default(),
            url: self.video_url(&unique_id, item.id.as_deref()),
            media_urls: "[]".to_string(),
            comments: stats.comment_count.unwrap_or(0),
            shares: stats.share_count.unwrap_or(0),
            reactions: stats.digg_count.unwrap_or(0),
            favors: coerce_count(stats.collect_count.as_ref()),
            views: stats.play_count.unwrap_or(0),
            web_tags: "[]".to_string(),
            web_keywords: "[]".to_string(),
            auth_id: author.id.unwrap_or_default(),
            auth_name: author.nickname.unwrap_or_default(),
            auth_type: AuthType::User as i32,
            auth_url: self.author_url(&unique_id),
            source_id: item.id.clone(),
            source_type: SourceType::TikTok as i32,
            source_name: None,
            source_url: self.video_url(&unique_id, item.id.as_deref()),
            reply_to: None,
            level: None,
            sentiment: 0,
            is_priority: false,
            crawl_bot: self.crawl_bot.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Flatten a batch, preserving relative order and silently omitting
    /// items the recency filter rejects. This list is what gets delivered
    /// downstream.
    pub fn flatten_batch(
        &self,
        items: &[RawSearchItem],
        now: DateTime<Utc>,
    ) -> Vec<CanonicalDocument> {
        items
            .iter()
            .filter_map(|item| self.flatten(item, now))
            .collect()
    }

    fn video_url(&self, unique_id: &str, post_id: Option<&str>) -> String {
        match post_id {
            Some(id) => format!("{}/@{}/video/{}", self.base_url, unique_id, id),
            None => String::new(),
        }
    }

    fn author_url(&self, unique_id: &str) -> String {
        format!("{}/@{}", self.base_url, unique_id)
    }
}

/// Coerce `collectCount` to a number. The upstream sometimes sends it as
/// a string or null; either must become 0 rather than propagate.
fn coerce_count(value: Option<&serde_json::Value>) -> i64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
