//! Command-line interface parsing for paperscope
//!
//! This module handles parsing of CLI arguments using clap: one subcommand
//! per workflow operation, with shared cache options and a helper to resolve
//! them into an optional cache store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::analyze::AnalysisKind;
use crate::cache::CacheStore;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified analysis kind is not recognized
    #[error("Invalid analysis kind: '{0}'. Valid kinds: comprehensive, integration")]
    InvalidAnalysisKind(String),
}

/// Paperscope - collect papers, analyze them with an LLM, export report data
#[derive(Parser, Debug)]
#[command(name = "paperscope")]
#[command(about = "Academic paper collection, LLM analysis, and report data export")]
#[command(version)]
pub struct Cli {
    /// Directory for cached responses (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum age of cached collector responses, in hours
    #[arg(long, value_name = "HOURS", default_value_t = 24, global = true)]
    pub max_age_hours: u64,

    /// Disable the response cache entirely
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Write the result document here instead of stdout
    #[arg(long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// One workflow operation
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the paper search API
    Search {
        /// Free-text search query
        query: String,

        /// Maximum number of papers to collect
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// API key for higher rate limits
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Search the arXiv-style Atom feed
    Feed {
        /// Free-text search query
        query: String,

        /// Maximum number of entries to request
        #[arg(long, default_value_t = 100)]
        max_results: usize,
    },

    /// Fetch details for a single paper
    Details {
        /// Paper identifier
        paper_id: String,

        /// API key for higher rate limits
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Collect a citation network starting from seed papers
    Network {
        /// Seed paper identifiers
        #[arg(required = true)]
        seeds: Vec<String>,

        /// How many citation levels to traverse
        #[arg(long, default_value_t = 2)]
        depth: usize,

        /// API key for higher rate limits
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Analyze collected papers with the language model
    Analyze {
        /// JSON file of collected papers (search or feed output)
        papers: PathBuf,

        /// Analysis kind: comprehensive or integration
        #[arg(long, default_value = "comprehensive")]
        kind: String,

        /// Delay between completion calls, in seconds
        #[arg(long, default_value_t = 1.0)]
        delay_secs: f64,

        /// Model requested for every completion
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// API key for the completion endpoint (falls back to OPENAI_API_KEY)
        #[arg(long, value_name = "KEY")]
        llm_api_key: Option<String>,

        /// Base URL of the completion endpoint
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },

    /// Summarize a batch of analysis outcomes
    Summarize {
        /// JSON file of analysis outcomes (analyze output)
        analyses: PathBuf,

        /// Model requested for the completion
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// API key for the completion endpoint (falls back to OPENAI_API_KEY)
        #[arg(long, value_name = "KEY")]
        llm_api_key: Option<String>,

        /// Base URL of the completion endpoint
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },

    /// Export chart-ready report documents
    Report {
        /// JSON file of collected papers (search output)
        papers: PathBuf,

        /// JSON file of analysis outcomes (analyze output)
        #[arg(long, value_name = "FILE")]
        analyses: Option<PathBuf>,

        /// JSON file of a collected citation network (network output)
        #[arg(long, value_name = "FILE")]
        network: Option<PathBuf>,

        /// Directory the report documents are written to
        #[arg(long, value_name = "DIR", default_value = "reports")]
        out_dir: PathBuf,
    },
}

/// Cache configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Explicit cache directory, when one was given
    pub dir: Option<PathBuf>,
    /// Maximum age of collector cache entries, in hours
    pub max_age_hours: u64,
    /// Whether caching is enabled at all
    pub enabled: bool,
}

impl CacheSettings {
    /// Reads the cache settings out of parsed arguments
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            dir: cli.cache_dir.clone(),
            max_age_hours: cli.max_age_hours,
            enabled: !cli.no_cache,
        }
    }

    /// Opens the configured cache store.
    ///
    /// Returns `None` when caching is disabled, or when no explicit directory
    /// was given and no platform cache directory exists; the workflow then
    /// simply runs uncached.
    pub fn open(&self) -> Option<CacheStore> {
        if !self.enabled {
            return None;
        }
        match &self.dir {
            Some(dir) => Some(CacheStore::new(dir)),
            None => CacheStore::open_default(),
        }
    }
}

/// Parses an analysis kind argument.
///
/// # Arguments
/// * `s` - The kind string from the CLI
///
/// # Returns
/// * `Ok(AnalysisKind)` if the string matches a valid kind
/// * `Err(CliError::InvalidAnalysisKind)` otherwise
pub fn parse_analysis_kind(s: &str) -> Result<AnalysisKind, CliError> {
    match s {
        "comprehensive" => Ok(AnalysisKind::Comprehensive),
        "integration" => Ok(AnalysisKind::Integration),
        other => Err(CliError::InvalidAnalysisKind(other.to_string())),
    }
}
