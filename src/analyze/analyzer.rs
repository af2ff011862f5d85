//! Paper analyzer: prompts, completion calls, caching, batch processing
//!
//! Analysis results are cached without expiry: the same prompt against the
//! same model is assumed to produce an equivalent answer, so recomputation is
//! only forced by deleting the cache entry.

use std::time::Duration as StdDuration;

use chrono::Utc;
use tracing::{info, warn};

use super::llm::{ChatBackend, LlmError};
use super::{
    prompts, AnalysisInput, AnalysisKind, AnalysisOutcome, FindingsSummary, IntegrationReport,
    PaperAnalysis,
};
use crate::cache::{CacheStore, Fingerprint};

/// Sampling temperature for comprehensive analysis
const TEMPERATURE_COMPREHENSIVE: f32 = 0.3;

/// Sampling temperature for integration analysis
const TEMPERATURE_INTEGRATION: f32 = 0.2;

/// Sampling temperature for findings synthesis
const TEMPERATURE_SUMMARY: f32 = 0.4;

/// Completion token limit for per-paper analyses
const MAX_TOKENS: u32 = 2000;

/// Completion token limit for the findings summary
const SUMMARY_MAX_TOKENS: u32 = 3000;

/// Analyzes papers through a chat-completion backend
pub struct PaperAnalyzer<B> {
    backend: B,
    cache: Option<CacheStore>,
}

impl<B: ChatBackend> PaperAnalyzer<B> {
    /// Creates an analyzer with no cache
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    /// Attaches a cache store for analysis results
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fingerprint of one analysis request
    fn fingerprint(paper_id: &str, kind: AnalysisKind) -> Fingerprint {
        Fingerprint::of("analysis", &format!("{}:{}", paper_id, kind.as_str()))
    }

    /// Runs one analysis of the requested kind.
    ///
    /// Never returns an error: transport failures and malformed model output
    /// become `AnalysisOutcome::Failed`, so batch callers keep going.
    pub async fn analyze(&self, input: &AnalysisInput, kind: AnalysisKind) -> AnalysisOutcome {
        match kind {
            AnalysisKind::Comprehensive => self.analyze_comprehensive(input).await,
            AnalysisKind::Integration => self.analyze_integration(input).await,
        }
    }

    async fn analyze_comprehensive(&self, input: &AnalysisInput) -> AnalysisOutcome {
        let fingerprint = Self::fingerprint(&input.paper_id, AnalysisKind::Comprehensive);

        if let Some(ref cache) = self.cache {
            // Analysis entries never expire
            if let Some(analysis) = cache.get::<PaperAnalysis>(&fingerprint, None) {
                info!(paper_id = %input.paper_id, "returning cached analysis");
                return AnalysisOutcome::Analysis(analysis);
            }
        }

        info!(paper_id = %input.paper_id, title = %input.title, "analyzing paper");
        let response = match self
            .backend
            .complete(
                &prompts::comprehensive(input),
                TEMPERATURE_COMPREHENSIVE,
                MAX_TOKENS,
            )
            .await
        {
            Ok(response) => response,
            Err(err) => return failed(input, err),
        };

        let mut analysis: PaperAnalysis = match parse_model_json(&response) {
            Ok(analysis) => analysis,
            Err(err) => return malformed(input, err, response),
        };
        analysis.paper_id = input.paper_id.clone();
        analysis.analyzed_at = Some(Utc::now());

        if let Some(ref cache) = self.cache {
            if let Err(err) = cache.put(&fingerprint, &analysis) {
                warn!(error = %err, "failed to write analysis to cache");
            }
        }

        AnalysisOutcome::Analysis(analysis)
    }

    async fn analyze_integration(&self, input: &AnalysisInput) -> AnalysisOutcome {
        let fingerprint = Self::fingerprint(&input.paper_id, AnalysisKind::Integration);

        if let Some(ref cache) = self.cache {
            if let Some(report) = cache.get::<IntegrationReport>(&fingerprint, None) {
                info!(paper_id = %input.paper_id, "returning cached integration report");
                return AnalysisOutcome::Integration(report);
            }
        }

        info!(paper_id = %input.paper_id, title = %input.title, "extracting integration points");
        let response = match self
            .backend
            .complete(
                &prompts::integration(input),
                TEMPERATURE_INTEGRATION,
                MAX_TOKENS,
            )
            .await
        {
            Ok(response) => response,
            Err(err) => return failed(input, err),
        };

        let mut report: IntegrationReport = match parse_model_json(&response) {
            Ok(report) => report,
            Err(err) => return malformed(input, err, response),
        };
        report.paper_id = input.paper_id.clone();
        report.analyzed_at = Some(Utc::now());

        if let Some(ref cache) = self.cache {
            if let Err(err) = cache.put(&fingerprint, &report) {
                warn!(error = %err, "failed to write integration report to cache");
            }
        }

        AnalysisOutcome::Integration(report)
    }

    /// Analyzes a batch of papers sequentially.
    ///
    /// A fixed delay follows each remote call as simple rate limiting. The
    /// result always has one outcome per input, in input order.
    pub async fn batch(
        &self,
        inputs: &[AnalysisInput],
        kind: AnalysisKind,
        delay: StdDuration,
    ) -> Vec<AnalysisOutcome> {
        let total = inputs.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, input) in inputs.iter().enumerate() {
            info!(current = index + 1, total, "analyzing batch item");
            outcomes.push(self.analyze(input, kind).await);

            if index + 1 < total {
                tokio::time::sleep(delay).await;
            }
        }

        outcomes
    }

    /// Synthesizes a batch of analysis outcomes into one findings summary.
    ///
    /// Not cached: summaries depend on the whole batch, not a single paper.
    pub async fn summarize(
        &self,
        outcomes: &[AnalysisOutcome],
    ) -> Result<FindingsSummary, LlmError> {
        let analyses_json = serde_json::to_string_pretty(outcomes)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let response = self
            .backend
            .complete(
                &prompts::summary(&analyses_json),
                TEMPERATURE_SUMMARY,
                SUMMARY_MAX_TOKENS,
            )
            .await?;

        parse_model_json(&response).map_err(LlmError::InvalidResponse)
    }
}

/// Strips surrounding Markdown code-fence markup from model output
fn strip_code_fences(text: &str) -> &str {
    let mut stripped = text.trim();
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest;
    } else if let Some(rest) = stripped.strip_prefix("```") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    stripped.trim()
}

/// Parses model output as JSON after removing any code fences
fn parse_model_json<T: serde::de::DeserializeOwned>(response: &str) -> Result<T, String> {
    serde_json::from_str(strip_code_fences(response)).map_err(|e| e.to_string())
}

fn failed(input: &AnalysisInput, err: LlmError) -> AnalysisOutcome {
    warn!(paper_id = %input.paper_id, error = %err, "analysis failed");
    AnalysisOutcome::Failed {
        paper_id: input.paper_id.clone(),
        reason: err.to_string(),
        raw_response: None,
    }
}

fn malformed(input: &AnalysisInput, reason: String, response: String) -> AnalysisOutcome {
    warn!(paper_id = %input.paper_id, reason, "failed to parse model output");
    AnalysisOutcome::Failed {
        paper_id: input.paper_id.clone(),
        reason: format!("failed to parse model output: {}", reason),
        raw_response: Some(response),
    }
}
