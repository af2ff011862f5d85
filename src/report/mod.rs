//! Chart-data aggregation for the rendering layer
//!
//! Rendering itself lives outside this crate; these aggregations produce the
//! JSON documents a renderer consumes: publication timelines, relevance-score
//! distributions, venue breakdowns, citation scatter points, and network
//! node/edge lists.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::analyze::AnalysisOutcome;
use crate::collect::{CitationEdge, CitationNetwork, Paper};

/// Number of histogram bins for relevance scores (one per score value)
const SCORE_BINS: usize = 10;

/// Errors that can occur while writing report documents
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure while writing a document
    #[error("failed to write report document: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be serialized
    #[error("failed to serialize report document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Papers published in one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Publication timeline, sorted by year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub years: Vec<YearCount>,
}

/// Summary statistics over relevance scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Relevance-score distribution: raw scores, histogram, and statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceDistribution {
    /// Scores in batch order
    pub scores: Vec<f64>,
    /// Histogram over score values 1 through 10
    pub bins: Vec<usize>,
    /// Statistics, absent when no outcome carried a score
    pub stats: Option<ScoreStats>,
}

/// Papers published at one venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueCount {
    pub venue: String,
    pub count: usize,
}

/// One (year, citation count) point for a scatter chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPoint {
    pub year: i32,
    pub citations: u32,
}

/// One node of the citation graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub citations: u32,
}

/// Citation graph document: node list plus directed edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<CitationEdge>,
}

/// Everything a summary dashboard renders, in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub timeline: Timeline,
    pub relevance: RelevanceDistribution,
    pub venues: Vec<VenueCount>,
    pub citations: Vec<CitationPoint>,
}

impl Dashboard {
    /// Number of venues the dashboard keeps
    const TOP_VENUES: usize = 10;

    /// Builds the dashboard document from collected papers and their analyses
    pub fn build(papers: &[Paper], outcomes: &[AnalysisOutcome]) -> Self {
        Self {
            timeline: timeline(papers),
            relevance: relevance_distribution(outcomes),
            venues: venue_breakdown(papers, Self::TOP_VENUES),
            citations: citation_scatter(papers),
        }
    }
}

/// Counts papers per publication year
pub fn timeline(papers: &[Paper]) -> Timeline {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for paper in papers {
        if let Some(year) = paper.year {
            *counts.entry(year).or_default() += 1;
        }
    }

    if counts.is_empty() {
        warn!("no year information available for timeline");
    }

    Timeline {
        years: counts
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect(),
    }
}

/// Collects relevance scores into a histogram with summary statistics
pub fn relevance_distribution(outcomes: &[AnalysisOutcome]) -> RelevanceDistribution {
    let scores: Vec<f64> = outcomes
        .iter()
        .filter_map(AnalysisOutcome::relevance_score)
        .collect();

    let mut bins = vec![0usize; SCORE_BINS];
    for score in &scores {
        let bin = (score.round().clamp(1.0, SCORE_BINS as f64) as usize) - 1;
        bins[bin] += 1;
    }

    let stats = score_stats(&scores);
    if stats.is_none() {
        warn!("no relevance scores available");
    }

    RelevanceDistribution {
        scores,
        bins,
        stats,
    }
}

/// Summary statistics over a score list; `None` when the list is empty
fn score_stats(scores: &[f64]) -> Option<ScoreStats> {
    if scores.is_empty() {
        return None;
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(ScoreStats {
        mean,
        median,
        std_dev: variance.sqrt(),
    })
}

/// Counts the most frequent venues, largest first
pub fn venue_breakdown(papers: &[Paper], top_n: usize) -> Vec<VenueCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for paper in papers {
        if let Some(venue) = paper.venue.as_deref() {
            if !venue.is_empty() {
                *counts.entry(venue).or_default() += 1;
            }
        }
    }

    let mut venues: Vec<VenueCount> = counts
        .into_iter()
        .map(|(venue, count)| VenueCount {
            venue: venue.to_string(),
            count,
        })
        .collect();
    // BTreeMap iteration is name-ordered, so ties stay deterministic
    venues.sort_by(|a, b| b.count.cmp(&a.count));
    venues.truncate(top_n);
    venues
}

/// Extracts (year, citation count) points for papers carrying both
pub fn citation_scatter(papers: &[Paper]) -> Vec<CitationPoint> {
    papers
        .iter()
        .filter_map(|paper| {
            Some(CitationPoint {
                year: paper.year?,
                citations: paper.citation_count?,
            })
        })
        .collect()
}

/// Converts a collected citation network into a renderable graph document
pub fn network_graph(network: &CitationNetwork) -> NetworkGraph {
    let nodes = network
        .papers
        .values()
        .map(|paper| NetworkNode {
            id: paper.paper_id.clone(),
            title: paper
                .title
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            year: paper.year,
            citations: paper.citation_count.unwrap_or(0),
        })
        .collect();

    NetworkGraph {
        nodes,
        edges: network.citations.clone(),
    }
}

/// Writes one report document as pretty JSON under the output directory.
///
/// The directory is created on first use. Returns the path written.
pub fn write_json<T: Serialize>(
    output_dir: &Path,
    name: &str,
    document: &T,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.json", name));
    fs::write(&path, serde_json::to_string_pretty(document)?)?;
    info!(path = %path.display(), "report document written");
    Ok(path)
}
