//! Paper collection from external search APIs
//!
//! This module contains the data types shared by the paper-search clients and
//! the clients themselves: a Semantic Scholar style JSON API, an arXiv style
//! Atom feed, and a breadth-first citation-network collector built on top of
//! the single-paper lookup.

pub mod arxiv;
pub mod network;
pub mod semantic_scholar;

pub use arxiv::ArxivClient;
pub use network::{collect_citation_network, CitationEdge, CitationNetwork, NetworkMetadata};
pub use semantic_scholar::SemanticScholarClient;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::Retryable;

/// Fields requested from the paper-search API when the caller does not choose
pub const DEFAULT_FIELDS: &[&str] = &[
    "paperId",
    "title",
    "abstract",
    "year",
    "authors",
    "citationCount",
    "referenceCount",
    "publicationDate",
    "venue",
    "url",
    "citations",
    "references",
];

/// Errors that can occur while collecting papers
#[derive(Debug, Error)]
pub enum CollectError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned status {status}")]
    Status { status: reqwest::StatusCode },

    /// Failed to decode a JSON response
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The Atom feed could not be parsed
    #[error("Failed to parse feed: {0}")]
    Feed(String),
}

impl Retryable for CollectError {
    fn is_retryable(&self) -> bool {
        match self {
            CollectError::Http(e) => e.is_timeout() || e.is_connect(),
            CollectError::Status { status } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            CollectError::Decode(_) | CollectError::Feed(_) => false,
        }
    }
}

/// A paper author as returned by the search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Author identifier, when the API knows one
    #[serde(default)]
    pub author_id: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// A reference to another paper inside a citation or reference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperStub {
    /// Identifier of the cited or citing paper, if resolved
    #[serde(default)]
    pub paper_id: Option<String>,
    /// Title of the cited or citing paper
    #[serde(default)]
    pub title: Option<String>,
}

/// A paper record from the search API
///
/// Mirrors the API's camelCase wire format. Most fields are optional because
/// the API omits whatever the caller did not request (and is missing for some
/// papers regardless).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Stable paper identifier
    pub paper_id: String,
    /// Paper title
    #[serde(default)]
    pub title: Option<String>,
    /// Abstract text
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Publication year
    #[serde(default)]
    pub year: Option<i32>,
    /// Author list
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Number of papers citing this one
    #[serde(default)]
    pub citation_count: Option<u32>,
    /// Number of papers this one references
    #[serde(default)]
    pub reference_count: Option<u32>,
    /// Publication date, when known more precisely than the year
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    /// Publication venue
    #[serde(default)]
    pub venue: Option<String>,
    /// Landing page URL
    #[serde(default)]
    pub url: Option<String>,
    /// Papers citing this one
    #[serde(default)]
    pub citations: Vec<PaperStub>,
    /// Papers this one references
    #[serde(default)]
    pub references: Vec<PaperStub>,
}

/// A paper record from the Atom feed API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Entry identifier (doubles as the abstract page URL)
    pub id: String,
    /// Paper title
    pub title: String,
    /// Abstract text
    pub summary: String,
    /// First publication timestamp
    pub published: Option<DateTime<Utc>>,
    /// Last update timestamp
    pub updated: Option<DateTime<Utc>>,
    /// Author names
    pub authors: Vec<String>,
    /// Landing page URL
    pub url: String,
}

/// Joins the field list the way the search API expects it
pub(crate) fn join_fields(fields: &[&str]) -> String {
    fields.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_deserializes_from_wire_format() {
        let json = r#"{
            "paperId": "649def34",
            "title": "Microservices: A Definition",
            "abstract": "We define the microservice architectural style.",
            "year": 2014,
            "authors": [{"authorId": "1", "name": "A. Author"}],
            "citationCount": 1200,
            "referenceCount": 35,
            "publicationDate": "2014-03-25",
            "venue": "IEEE Software",
            "url": "https://example.org/paper/649def34",
            "citations": [{"paperId": "abc", "title": "A follow-up"}],
            "references": []
        }"#;

        let paper: Paper = serde_json::from_str(json).expect("Failed to deserialize Paper");

        assert_eq!(paper.paper_id, "649def34");
        assert_eq!(paper.title.as_deref(), Some("Microservices: A Definition"));
        assert_eq!(
            paper.abstract_text.as_deref(),
            Some("We define the microservice architectural style.")
        );
        assert_eq!(paper.year, Some(2014));
        assert_eq!(paper.citation_count, Some(1200));
        assert_eq!(
            paper.publication_date,
            NaiveDate::from_ymd_opt(2014, 3, 25)
        );
        assert_eq!(paper.citations.len(), 1);
        assert_eq!(paper.citations[0].paper_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_paper_tolerates_missing_optional_fields() {
        let json = r#"{"paperId": "bare"}"#;

        let paper: Paper = serde_json::from_str(json).expect("Failed to deserialize Paper");

        assert_eq!(paper.paper_id, "bare");
        assert!(paper.title.is_none());
        assert!(paper.authors.is_empty());
        assert!(paper.citations.is_empty());
    }

    #[test]
    fn test_paper_serialization_round_trip() {
        let paper = Paper {
            paper_id: "p1".to_string(),
            title: Some("Title".to_string()),
            abstract_text: Some("Abstract".to_string()),
            year: Some(2020),
            authors: vec![Author {
                author_id: None,
                name: Some("B. Author".to_string()),
            }],
            citation_count: Some(3),
            reference_count: None,
            publication_date: None,
            venue: Some("A venue".to_string()),
            url: None,
            citations: vec![],
            references: vec![],
        };

        let json = serde_json::to_string(&paper).expect("Failed to serialize Paper");
        assert!(json.contains("\"paperId\""), "Wire format stays camelCase");
        assert!(json.contains("\"abstract\""));

        let back: Paper = serde_json::from_str(&json).expect("Failed to deserialize Paper");
        assert_eq!(back, paper);
    }

    #[test]
    fn test_join_fields_matches_wire_format() {
        assert_eq!(join_fields(&["paperId", "title"]), "paperId,title");
        assert_eq!(join_fields(&[]), "");
    }

    #[test]
    fn test_collect_error_retryability() {
        let throttled = CollectError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
        };
        let server = CollectError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        let not_found = CollectError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
        };
        let feed = CollectError::Feed("broken".to_string());

        assert!(throttled.is_retryable());
        assert!(server.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(!feed.is_retryable());
    }
}
