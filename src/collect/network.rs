//! Citation network collection
//!
//! Breadth-first traversal over the paper-details endpoint, starting from a
//! set of seed papers and following citation stubs up to a configured depth.
//! Individual lookup failures are skipped so one bad paper never aborts the
//! traversal.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Paper, SemanticScholarClient};

/// Citation stubs followed per paper, to keep the frontier from exploding
const MAX_CITATION_STUBS: usize = 10;

/// Fixed delay inserted after each remote call
const REQUEST_DELAY: StdDuration = StdDuration::from_secs(1);

/// A directed citation edge between two collected papers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEdge {
    /// The citing paper
    pub from: String,
    /// The cited paper
    pub to: String,
}

/// Metadata describing one collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetadata {
    /// Paper ids the traversal started from
    pub seed_papers: Vec<String>,
    /// Citation levels traversed
    pub depth: usize,
    /// Number of papers collected
    pub total_papers: usize,
    /// Number of citation edges collected
    pub total_citations: usize,
    /// When the collection finished
    pub collected_at: DateTime<Utc>,
}

/// A collected citation network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationNetwork {
    /// Collected papers keyed by paper id
    pub papers: BTreeMap<String, Paper>,
    /// Directed citation edges between collected papers
    pub citations: Vec<CitationEdge>,
    /// Collection run metadata
    pub metadata: NetworkMetadata,
}

/// Collects a citation network starting from seed papers.
///
/// Each visited paper is looked up through `client.details` (and therefore
/// through the cache), its first `MAX_CITATION_STUBS` citations are queued one
/// level deeper, and a fixed delay follows each lookup. Papers that fail to
/// resolve are logged and skipped.
///
/// # Arguments
/// * `client` - Paper details client (with or without a cache attached)
/// * `seed_ids` - Paper ids to start from
/// * `depth` - How many citation levels to traverse
pub async fn collect_citation_network(
    client: &SemanticScholarClient,
    seed_ids: &[String],
    depth: usize,
) -> CitationNetwork {
    let mut papers: BTreeMap<String, Paper> = BTreeMap::new();
    let mut citations: Vec<CitationEdge> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<(String, usize)> = seed_ids
        .iter()
        .map(|id| (id.clone(), 0usize))
        .collect();

    while let Some((paper_id, level)) = frontier.pop_front() {
        if visited.contains(&paper_id) || level >= depth {
            continue;
        }
        visited.insert(paper_id.clone());

        let paper = match client.details(&paper_id).await {
            Ok(Some(paper)) => paper,
            Ok(None) => {
                debug!(paper_id, "paper not found, skipping");
                continue;
            }
            Err(err) => {
                warn!(paper_id, error = %err, "details lookup failed, skipping");
                continue;
            }
        };

        // Queue the next citation level before handing the paper over
        if level < depth.saturating_sub(1) {
            for stub in paper.citations.iter().take(MAX_CITATION_STUBS) {
                if let Some(cited_id) = stub.paper_id.clone() {
                    citations.push(CitationEdge {
                        from: paper_id.clone(),
                        to: cited_id.clone(),
                    });
                    frontier.push_back((cited_id, level + 1));
                }
            }
        }

        papers.insert(paper_id, paper);

        tokio::time::sleep(REQUEST_DELAY).await;
        info!(collected = visited.len(), "citation network progress");
    }

    let metadata = NetworkMetadata {
        seed_papers: seed_ids.to_vec(),
        depth,
        total_papers: papers.len(),
        total_citations: citations.len(),
        collected_at: Utc::now(),
    };

    CitationNetwork {
        papers,
        citations,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::collect::PaperStub;
    use tempfile::TempDir;

    const DEAD_BASE_URL: &str = "http://127.0.0.1:1";

    fn paper_with_citations(id: &str, cited: &[&str]) -> Paper {
        Paper {
            paper_id: id.to_string(),
            title: Some(format!("Paper {}", id)),
            abstract_text: None,
            year: Some(2021),
            authors: vec![],
            citation_count: Some(cited.len() as u32),
            reference_count: None,
            publication_date: None,
            venue: None,
            url: None,
            citations: cited
                .iter()
                .map(|c| PaperStub {
                    paper_id: Some(c.to_string()),
                    title: None,
                })
                .collect(),
            references: vec![],
        }
    }

    /// Client whose details lookups resolve purely from a seeded cache
    fn seeded_client(papers: &[Paper]) -> (SemanticScholarClient, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::new(temp_dir.path());
        for paper in papers {
            let fingerprint = crate::cache::Fingerprint::of(
                "semantic_scholar",
                &format!("details:{}", paper.paper_id),
            );
            cache.put(&fingerprint, paper).expect("Seed write should succeed");
        }
        let client = SemanticScholarClient::new()
            .with_base_url(DEAD_BASE_URL)
            .with_retry_policy(crate::retry::RetryPolicy::new(1))
            .with_cache(cache, 24);
        (client, temp_dir)
    }

    #[tokio::test]
    async fn test_zero_depth_collects_nothing() {
        let (client, _temp_dir) = seeded_client(&[paper_with_citations("seed", &[])]);

        let network =
            collect_citation_network(&client, &["seed".to_string()], 0).await;

        assert!(network.papers.is_empty());
        assert!(network.citations.is_empty());
        assert_eq!(network.metadata.depth, 0);
    }

    #[tokio::test]
    async fn test_depth_one_collects_seeds_only() {
        let (client, _temp_dir) =
            seeded_client(&[paper_with_citations("seed", &["child-a", "child-b"])]);

        let network =
            collect_citation_network(&client, &["seed".to_string()], 1).await;

        assert_eq!(network.papers.len(), 1);
        assert!(network.papers.contains_key("seed"));
        assert!(
            network.citations.is_empty(),
            "Depth 1 must not follow citation stubs"
        );
        assert_eq!(network.metadata.total_papers, 1);
    }

    #[tokio::test]
    async fn test_depth_two_follows_citations_and_skips_unresolved() {
        let (client, _temp_dir) = seeded_client(&[
            paper_with_citations("seed", &["child-a", "child-b"]),
            paper_with_citations("child-a", &["grandchild"]),
            // child-b is not in the cache; its lookup fails and is skipped
        ]);

        let network =
            collect_citation_network(&client, &["seed".to_string()], 2).await;

        assert_eq!(network.papers.len(), 2, "seed and child-a resolve");
        assert!(network.papers.contains_key("child-a"));
        assert!(!network.papers.contains_key("child-b"));
        assert_eq!(
            network.citations,
            vec![
                CitationEdge {
                    from: "seed".to_string(),
                    to: "child-a".to_string()
                },
                CitationEdge {
                    from: "seed".to_string(),
                    to: "child-b".to_string()
                },
            ],
            "Edges are recorded when queued, resolved or not"
        );
        assert_eq!(network.metadata.total_citations, 2);
    }

    #[tokio::test]
    async fn test_visited_papers_are_not_refetched() {
        // Both seeds cite each other; the traversal must terminate
        let (client, _temp_dir) = seeded_client(&[
            paper_with_citations("a", &["b"]),
            paper_with_citations("b", &["a"]),
        ]);

        let network = collect_citation_network(
            &client,
            &["a".to_string(), "b".to_string()],
            3,
        )
        .await;

        assert_eq!(network.papers.len(), 2);
    }
}
