//! Atom feed search client (arXiv export API wire format)
//!
//! Fetches and parses the fixed Atom feed the export API serves, caching the
//! parsed entry list. The feed is one request per search; there is no
//! pagination here.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{info, warn};

use super::{CollectError, FeedEntry};
use crate::cache::{CacheStore, Fingerprint};
use crate::retry::{with_retry, RetryPolicy};

/// Base URL for the feed export API
const FEED_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Per-call transport timeout
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Client for the Atom feed search endpoint
#[derive(Debug, Clone)]
pub struct ArxivClient {
    /// HTTP client for making requests
    http: Client,
    /// Cache store for persisting parsed feeds
    cache: Option<CacheStore>,
    /// Maximum age before a cached feed is refreshed
    max_age: Duration,
    /// Retry policy for transport failures
    retry: RetryPolicy,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivClient {
    /// Creates a new client with no cache
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            cache: None,
            max_age: Duration::hours(24),
            retry: RetryPolicy::default(),
            base_url: FEED_BASE_URL.to_string(),
        }
    }

    /// Attaches a cache store with the given maximum entry age in hours
    pub fn with_cache(mut self, cache: CacheStore, max_age_hours: u64) -> Self {
        self.cache = Some(cache);
        self.max_age = Duration::hours(max_age_hours as i64);
        self
    }

    /// Overrides the API base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fingerprint of a feed search request
    fn search_fingerprint(query: &str, max_results: usize) -> Fingerprint {
        Fingerprint::of("arxiv", &format!("{}:{}", query, max_results))
    }

    /// Searches the feed for papers matching a free-text query.
    ///
    /// # Arguments
    /// * `query` - Free-text search query
    /// * `max_results` - Maximum number of entries to request
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FeedEntry>, CollectError> {
        let fingerprint = Self::search_fingerprint(query, max_results);

        if let Some(ref cache) = self.cache {
            if let Some(entries) = cache.get::<Vec<FeedEntry>>(&fingerprint, Some(self.max_age)) {
                info!(query, "returning cached feed results");
                return Ok(entries);
            }
        }

        info!(query, "querying feed API");
        let text = with_retry(&self.retry, "feed_search", || {
            self.fetch_feed(query, max_results)
        })
        .await?;

        let entries = parse_feed(&text)?;

        if let Some(ref cache) = self.cache {
            if let Err(err) = cache.put(&fingerprint, &entries) {
                warn!(error = %err, "failed to write feed results to cache");
            }
        }

        info!(query, count = entries.len(), "collected papers from feed API");
        Ok(entries)
    }

    /// Fetches the raw feed document
    async fn fetch_feed(&self, query: &str, max_results: usize) -> Result<String, CollectError> {
        let response = self
            .http
            .get(&self.base_url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("search_query", query.to_string()),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectError::Status {
                status: response.status(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Fields of a feed entry that carry character data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryField {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
}

/// Accumulates one `<entry>` while the parser walks its children
#[derive(Debug, Default)]
struct EntryBuilder {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    authors: Vec<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: EntryField, text: &str) {
        let text = text.trim();
        match field {
            EntryField::Id => self.id = Some(text.to_string()),
            EntryField::Title => self.title = Some(text.to_string()),
            EntryField::Summary => self.summary = Some(text.to_string()),
            EntryField::Published => self.published = Some(text.to_string()),
            EntryField::Updated => self.updated = Some(text.to_string()),
            EntryField::AuthorName => self.authors.push(text.to_string()),
        }
    }

    fn build(self) -> Result<FeedEntry, CollectError> {
        let id = self
            .id
            .ok_or_else(|| CollectError::Feed("entry missing <id>".to_string()))?;
        let title = self
            .title
            .ok_or_else(|| CollectError::Feed("entry missing <title>".to_string()))?;
        let summary = self
            .summary
            .ok_or_else(|| CollectError::Feed("entry missing <summary>".to_string()))?;

        Ok(FeedEntry {
            url: id.clone(),
            id,
            title,
            summary,
            published: self.published.as_deref().and_then(parse_timestamp),
            updated: self.updated.as_deref().and_then(parse_timestamp),
            authors: self.authors,
        })
    }
}

/// Parses an RFC 3339 feed timestamp, tolerating absent or malformed values
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses the Atom feed document into entry records.
///
/// Only the elements the workflow consumes are extracted; everything else in
/// the feed is skipped. An entry missing a required element fails the whole
/// parse, matching the all-or-nothing shape of the feed response.
fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, CollectError> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut target: Option<EntryField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(EntryBuilder::default()),
                b"author" if current.is_some() => in_author = true,
                b"name" if in_author => {
                    target = Some(EntryField::AuthorName);
                    text.clear();
                }
                b"id" | b"title" | b"summary" | b"published" | b"updated"
                    if current.is_some() && !in_author =>
                {
                    target = Some(match e.local_name().as_ref() {
                        b"id" => EntryField::Id,
                        b"title" => EntryField::Title,
                        b"summary" => EntryField::Summary,
                        b"published" => EntryField::Published,
                        _ => EntryField::Updated,
                    });
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if target.is_some() {
                    let chunk = t
                        .unescape()
                        .map_err(|e| CollectError::Feed(e.to_string()))?;
                    text.push_str(&chunk);
                }
            }
            Ok(Event::CData(t)) => {
                if target.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(builder) = current.take() {
                        entries.push(builder.build()?);
                    }
                }
                b"author" => in_author = false,
                _ => {
                    if let (Some(field), Some(builder)) = (target.take(), current.as_mut()) {
                        builder.set(field, &text);
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(CollectError::Feed(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}
