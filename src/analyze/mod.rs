//! LLM-based paper analysis
//!
//! This module contains the analysis data types, the chat-completion client
//! behind the `ChatBackend` seam, prompt assembly, and the analyzer that ties
//! them together with permanent result caching.

pub mod analyzer;
pub mod llm;
pub mod prompts;

pub use analyzer::PaperAnalyzer;
pub use llm::{ChatBackend, ChatClient, ChatMessage, ChatRole, LlmError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collect::{FeedEntry, Paper};

/// The two kinds of analysis the workflow can request for a paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Full technical analysis: contributions, approach, strengths, limitations
    Comprehensive,
    /// Platform integration recommendations
    Integration,
}

impl AnalysisKind {
    /// Stable tag used in cache keys and output documents
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Comprehensive => "comprehensive",
            AnalysisKind::Integration => "integration",
        }
    }
}

/// The text handed to the language model for one paper
///
/// Both search-API papers and feed entries reduce to this shape; missing
/// titles and abstracts are replaced with placeholders so the prompt is
/// always well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    /// Paper identifier used for caching and result stamping
    pub paper_id: String,
    /// Paper title
    pub title: String,
    /// Abstract text
    pub abstract_text: String,
}

impl From<&Paper> for AnalysisInput {
    fn from(paper: &Paper) -> Self {
        Self {
            paper_id: paper.paper_id.clone(),
            title: paper.title.clone().unwrap_or_else(|| "No title".to_string()),
            abstract_text: paper
                .abstract_text
                .clone()
                .unwrap_or_else(|| "No abstract available".to_string()),
        }
    }
}

impl From<&FeedEntry> for AnalysisInput {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            paper_id: entry.id.clone(),
            title: entry.title.clone(),
            abstract_text: entry.summary.clone(),
        }
    }
}

/// Recommendation priority reported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Comprehensive analysis of a single paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperAnalysis {
    /// Main contributions and innovations
    #[serde(default)]
    pub key_contributions: Vec<String>,
    /// Methods, algorithms, or techniques used
    pub technical_approach: String,
    /// What makes the work valuable
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Potential weaknesses or gaps
    #[serde(default)]
    pub limitations: Vec<String>,
    /// Relevance to architecture validation, 1-10
    pub relevance_score: f64,
    /// Ways the work could integrate with the host platform
    #[serde(default)]
    pub integration_opportunities: Vec<String>,
    /// Brief summary
    pub summary: String,
    /// Identifier of the analyzed paper (stamped after parsing)
    #[serde(default)]
    pub paper_id: String,
    /// When the analysis was produced (stamped after parsing)
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Platform integration recommendations for a single paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationReport {
    /// Validation techniques the paper contributes
    #[serde(default)]
    pub validation_techniques: Vec<String>,
    /// AI/ML applications the paper suggests
    #[serde(default)]
    pub ai_ml_applications: Vec<String>,
    /// Architecture patterns involved
    #[serde(default)]
    pub architecture_patterns: Vec<String>,
    /// Quality attributes addressed
    #[serde(default)]
    pub quality_attributes: Vec<String>,
    /// Concrete implementation steps
    #[serde(default)]
    pub implementation_steps: Vec<String>,
    /// Expected benefits of integrating
    #[serde(default)]
    pub expected_benefits: Vec<String>,
    /// Anticipated challenges
    #[serde(default)]
    pub challenges: Vec<String>,
    /// Overall priority
    pub priority: Priority,
    /// Identifier of the analyzed paper (stamped after parsing)
    #[serde(default)]
    pub paper_id: String,
    /// When the analysis was produced (stamped after parsing)
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Result of analyzing one paper
///
/// Failures are values, not errors: a batch of analyses always yields one
/// outcome per input, and a single malformed model response or transport
/// failure marks only its own slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Comprehensive analysis succeeded
    Analysis(PaperAnalysis),
    /// Integration analysis succeeded
    Integration(IntegrationReport),
    /// The analysis failed; the batch continues
    Failed {
        /// Identifier of the paper whose analysis failed
        paper_id: String,
        /// What went wrong
        reason: String,
        /// The raw model output, when the failure was a parse failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl AnalysisOutcome {
    /// The relevance score, when this outcome carries one
    pub fn relevance_score(&self) -> Option<f64> {
        match self {
            AnalysisOutcome::Analysis(analysis) => Some(analysis.relevance_score),
            _ => None,
        }
    }
}

/// A prioritized recommendation inside a findings summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommendation priority
    pub priority: Priority,
    /// Recommendation title
    pub title: String,
    /// Detailed description
    pub description: String,
}

/// Cross-paper synthesis of a batch of analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingsSummary {
    /// Common themes across papers
    #[serde(default)]
    pub overall_themes: Vec<String>,
    /// Most important technical insights
    #[serde(default)]
    pub key_insights: Vec<String>,
    /// Areas that need more investigation
    #[serde(default)]
    pub research_gaps: Vec<String>,
    /// Prioritized integration recommendations
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}
