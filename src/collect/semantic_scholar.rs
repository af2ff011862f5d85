//! Paper search API client (Semantic Scholar graph API wire format)
//!
//! Fetches paper records from the search and details endpoints, with disk
//! caching of whole result sets and transport-level retry. Pagination is
//! sequential with a fixed delay between page fetches.

use std::time::Duration as StdDuration;

use chrono::Duration;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{join_fields, CollectError, Paper, DEFAULT_FIELDS};
use crate::cache::{CacheStore, Fingerprint};
use crate::retry::{with_retry, RetryPolicy};

/// Base URL for the paper search API
const API_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Largest page the search endpoint will return
const SEARCH_PAGE_SIZE: usize = 100;

/// Fixed delay inserted after each remote call
const REQUEST_DELAY: StdDuration = StdDuration::from_secs(1);

/// Per-call transport timeout
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// One page of search results
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

/// Client for the paper search and details endpoints
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
    /// HTTP client for making requests
    http: Client,
    /// Optional API key for higher rate limits
    api_key: Option<String>,
    /// Cache store for persisting responses
    cache: Option<CacheStore>,
    /// Maximum age before a cached response is refreshed
    max_age: Duration,
    /// Retry policy for transport failures
    retry: RetryPolicy,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl Default for SemanticScholarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticScholarClient {
    /// Creates a new client with no cache and no API key
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            api_key: None,
            cache: None,
            max_age: Duration::hours(24),
            retry: RetryPolicy::default(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Attaches a cache store with the given maximum entry age in hours
    pub fn with_cache(mut self, cache: CacheStore, max_age_hours: u64) -> Self {
        self.cache = Some(cache);
        self.max_age = Duration::hours(max_age_hours as i64);
        self
    }

    /// Sets the API key sent with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the API base URL (for testing)
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the retry policy (for testing)
    #[cfg(test)]
    pub(crate) fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fingerprint of a search request
    fn search_fingerprint(query: &str, limit: usize, fields: &[&str]) -> Fingerprint {
        Fingerprint::of(
            "semantic_scholar",
            &format!("{}:{}:{}", query, limit, join_fields(fields)),
        )
    }

    /// Fingerprint of a details request
    fn details_fingerprint(paper_id: &str) -> Fingerprint {
        Fingerprint::of("semantic_scholar", &format!("details:{}", paper_id))
    }

    /// Searches for papers matching a free-text query.
    ///
    /// Pages through results until `limit` papers are collected or the API
    /// runs out, caching the accumulated list. A transport failure partway
    /// through ends the pagination; whatever was collected so far is returned
    /// (and cached), so a long collection run degrades rather than aborts.
    ///
    /// # Arguments
    /// * `query` - Free-text search query
    /// * `limit` - Maximum number of papers to return
    /// * `fields` - Fields to request, or `None` for the default set
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<Paper>, CollectError> {
        let fields = fields.unwrap_or(DEFAULT_FIELDS);
        let fingerprint = Self::search_fingerprint(query, limit, fields);

        if let Some(ref cache) = self.cache {
            if let Some(papers) = cache.get::<Vec<Paper>>(&fingerprint, Some(self.max_age)) {
                info!(query, "returning cached search results");
                return Ok(papers);
            }
        }

        let fields_param = join_fields(fields);
        let fields_param = fields_param.as_str();
        let mut papers: Vec<Paper> = Vec::new();
        let mut offset = 0usize;

        while papers.len() < limit {
            let page_limit = SEARCH_PAGE_SIZE.min(limit - papers.len());
            info!(query, offset, "querying paper search API");

            let page = with_retry(&self.retry, "paper_search", || {
                self.fetch_search_page(query, page_limit, offset, fields_param)
            })
            .await;

            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    warn!(query, offset, error = %err, "search page failed, keeping partial results");
                    break;
                }
            };

            if page.data.is_empty() {
                break;
            }

            offset += page.data.len();
            papers.extend(page.data);

            tokio::time::sleep(REQUEST_DELAY).await;
        }

        if let Some(ref cache) = self.cache {
            if let Err(err) = cache.put(&fingerprint, &papers) {
                warn!(error = %err, "failed to write search results to cache");
            }
        }

        info!(query, count = papers.len(), "collected papers from search API");
        Ok(papers)
    }

    /// Fetches detailed information about a single paper.
    ///
    /// Returns `Ok(None)` when the API reports the paper as not found.
    pub async fn details(&self, paper_id: &str) -> Result<Option<Paper>, CollectError> {
        let fingerprint = Self::details_fingerprint(paper_id);

        if let Some(ref cache) = self.cache {
            if let Some(paper) = cache.get::<Paper>(&fingerprint, Some(self.max_age)) {
                return Ok(Some(paper));
            }
        }

        let url = format!("{}/paper/{}", self.base_url, paper_id);
        let url = url.as_str();
        let response = with_retry(&self.retry, "paper_details", || {
            self.fetch_details_once(url)
        })
        .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response.text().await?;
        let paper: Paper = serde_json::from_str(&text)?;

        if let Some(ref cache) = self.cache {
            if let Err(err) = cache.put(&fingerprint, &paper) {
                warn!(error = %err, "failed to write paper details to cache");
            }
        }

        Ok(Some(paper))
    }

    /// Fetches the details endpoint once, without retry.
    ///
    /// 404 is an answer ("not found"), not a failure worth retrying, so it
    /// passes through as a success here.
    async fn fetch_details_once(&self, url: &str) -> Result<reqwest::Response, CollectError> {
        let mut request = self.http.get(url).timeout(REQUEST_TIMEOUT);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::NOT_FOUND && !status.is_success() {
            return Err(CollectError::Status { status });
        }
        Ok(response)
    }

    /// Fetches a single page of search results
    async fn fetch_search_page(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        fields: &str,
    ) -> Result<SearchResponse, CollectError> {
        let url = format!("{}/paper/search", self.base_url);
        let mut request = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("query", query.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("fields", fields.to_string()),
            ]);

        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CollectError::Status {
                status: response.status(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Unroutable base URL: any accidental network call fails immediately
    // instead of leaving the test hanging on a real endpoint.
    const DEAD_BASE_URL: &str = "http://127.0.0.1:1";

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            paper_id: id.to_string(),
            title: Some(title.to_string()),
            abstract_text: None,
            year: Some(2020),
            authors: vec![],
            citation_count: Some(10),
            reference_count: None,
            publication_date: None,
            venue: None,
            url: None,
            citations: vec![],
            references: vec![],
        }
    }

    #[test]
    fn test_search_fingerprint_depends_on_all_inputs() {
        let base =
            SemanticScholarClient::search_fingerprint("microservice architecture", 50, &["title"]);
        let same =
            SemanticScholarClient::search_fingerprint("microservice architecture", 50, &["title"]);
        let other_query =
            SemanticScholarClient::search_fingerprint("event sourcing", 50, &["title"]);
        let other_limit =
            SemanticScholarClient::search_fingerprint("microservice architecture", 51, &["title"]);
        let other_fields = SemanticScholarClient::search_fingerprint(
            "microservice architecture",
            50,
            &["title", "year"],
        );

        assert_eq!(base, same);
        assert_ne!(base, other_query);
        assert_ne!(base, other_limit);
        assert_ne!(base, other_fields);
    }

    #[test]
    fn test_search_response_parses_wire_format() {
        let json = r#"{
            "total": 2,
            "offset": 0,
            "data": [
                {"paperId": "a", "title": "First"},
                {"paperId": "b", "title": "Second"}
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).expect("Failed to parse page");
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].paper_id, "a");
    }

    #[test]
    fn test_search_response_tolerates_missing_data() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"total": 0}"#).expect("Failed to parse page");
        assert!(response.data.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_seeded_cache_without_network() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::new(temp_dir.path());
        let seeded = vec![paper("a", "First"), paper("b", "Second")];

        let fingerprint = SemanticScholarClient::search_fingerprint(
            "microservice architecture",
            50,
            DEFAULT_FIELDS,
        );
        cache.put(&fingerprint, &seeded).expect("Seed write should succeed");

        let client = SemanticScholarClient::new()
            .with_base_url(DEAD_BASE_URL)
            .with_cache(cache, 24);

        let result = client
            .search("microservice architecture", 50, None)
            .await
            .expect("Cached search should succeed");

        assert_eq!(result, seeded, "Identical request should come from cache");
    }

    #[tokio::test]
    async fn test_details_returns_seeded_cache_without_network() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::new(temp_dir.path());
        let seeded = paper("abc123", "Cached paper");

        let fingerprint = SemanticScholarClient::details_fingerprint("abc123");
        cache.put(&fingerprint, &seeded).expect("Seed write should succeed");

        let client = SemanticScholarClient::new()
            .with_base_url(DEAD_BASE_URL)
            .with_cache(cache, 24);

        let result = client
            .details("abc123")
            .await
            .expect("Cached details should succeed");

        assert_eq!(result, Some(seeded));
    }

    #[tokio::test]
    async fn test_search_without_cache_fails_fast_on_dead_endpoint() {
        let client = SemanticScholarClient::new()
            .with_base_url(DEAD_BASE_URL)
            .with_retry_policy(RetryPolicy::new(1));

        // A dead endpoint yields partial (empty) results, not an error
        let result = client.search("anything", 10, None).await;
        assert_eq!(result.expect("Search should degrade to empty"), vec![]);
    }
}
