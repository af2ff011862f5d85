//! Paperscope - collect academic papers, analyze them, export report data
//!
//! A command-line workflow that searches paper APIs, runs LLM analyses over
//! the collected papers, and aggregates chart-ready report documents, with
//! every remote response memoized on disk.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use paperscope::analyze::llm::DEFAULT_MODEL;
use paperscope::analyze::{AnalysisInput, AnalysisOutcome, ChatClient, LlmError, PaperAnalyzer};
use paperscope::cache::CacheStore;
use paperscope::cli::{parse_analysis_kind, CacheSettings, Cli, Command};
use paperscope::collect::{
    collect_citation_network, ArxivClient, CitationNetwork, FeedEntry, Paper,
    SemanticScholarClient,
};
use paperscope::report::{self, Dashboard};

/// Venues kept in the standalone venue report
const REPORT_TOP_VENUES: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so stdout stays a valid result document
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

/// Dispatches the parsed command
async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = CacheSettings::from_cli(&cli);
    let cache = settings.open();
    let output = cli.output.clone();

    match cli.command {
        Command::Search {
            query,
            limit,
            api_key,
        } => {
            let client = collector_client(cache, &settings, api_key);
            let papers = client.search(&query, limit, None).await?;
            emit(output.as_deref(), &papers)
        }

        Command::Feed { query, max_results } => {
            let mut client = ArxivClient::new();
            if let Some(cache) = cache {
                client = client.with_cache(cache, settings.max_age_hours);
            }
            let entries = client.search(&query, max_results).await?;
            emit(output.as_deref(), &entries)
        }

        Command::Details { paper_id, api_key } => {
            let client = collector_client(cache, &settings, api_key);
            // A missing paper serializes as null
            let paper = client.details(&paper_id).await?;
            emit(output.as_deref(), &paper)
        }

        Command::Network {
            seeds,
            depth,
            api_key,
        } => {
            let client = collector_client(cache, &settings, api_key);
            let network = collect_citation_network(&client, &seeds, depth).await;
            emit(output.as_deref(), &network)
        }

        Command::Analyze {
            papers,
            kind,
            delay_secs,
            model,
            llm_api_key,
            base_url,
        } => {
            let kind = parse_analysis_kind(&kind)?;
            let inputs = load_analysis_inputs(&papers)?;
            let analyzer = build_analyzer(cache, model, llm_api_key, base_url)?;
            let delay = Duration::from_secs_f64(delay_secs.max(0.0));
            let outcomes = analyzer.batch(&inputs, kind, delay).await;
            emit(output.as_deref(), &outcomes)
        }

        Command::Summarize {
            analyses,
            model,
            llm_api_key,
            base_url,
        } => {
            let outcomes: Vec<AnalysisOutcome> = read_json(&analyses)?;
            let analyzer = build_analyzer(cache, model, llm_api_key, base_url)?;
            let summary = analyzer.summarize(&outcomes).await?;
            emit(output.as_deref(), &summary)
        }

        Command::Report {
            papers,
            analyses,
            network,
            out_dir,
        } => {
            let papers: Vec<Paper> = read_json(&papers)?;
            let outcomes: Vec<AnalysisOutcome> = match analyses {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };

            let mut written = vec![
                report::write_json(&out_dir, "timeline", &report::timeline(&papers))?,
                report::write_json(
                    &out_dir,
                    "relevance",
                    &report::relevance_distribution(&outcomes),
                )?,
                report::write_json(
                    &out_dir,
                    "venues",
                    &report::venue_breakdown(&papers, REPORT_TOP_VENUES),
                )?,
                report::write_json(&out_dir, "citations", &report::citation_scatter(&papers))?,
                report::write_json(&out_dir, "dashboard", &Dashboard::build(&papers, &outcomes))?,
            ];

            if let Some(path) = network {
                let network: CitationNetwork = read_json(&path)?;
                written.push(report::write_json(
                    &out_dir,
                    "network",
                    &report::network_graph(&network),
                )?);
            }

            emit(output.as_deref(), &serde_json::json!({ "written": written }))
        }
    }
}

/// Builds the paper-search client from the shared options
fn collector_client(
    cache: Option<CacheStore>,
    settings: &CacheSettings,
    api_key: Option<String>,
) -> SemanticScholarClient {
    let mut client = SemanticScholarClient::new();
    if let Some(cache) = cache {
        client = client.with_cache(cache, settings.max_age_hours);
    }
    if let Some(key) = api_key {
        client = client.with_api_key(key);
    }
    client
}

/// Builds the analyzer from the LLM options.
///
/// Analysis entries live in an `llm/` subdirectory of the cache root, apart
/// from the collector entries that do expire.
fn build_analyzer(
    cache: Option<CacheStore>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
) -> Result<PaperAnalyzer<ChatClient>, LlmError> {
    let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let mut chat = ChatClient::new(model, api_key)?;
    if let Some(url) = base_url {
        chat = chat.with_base_url(url);
    }

    let mut analyzer = PaperAnalyzer::new(chat);
    if let Some(cache) = cache {
        analyzer = analyzer.with_cache(cache.subdir("llm"));
    }
    Ok(analyzer)
}

/// Reads a JSON document produced by an earlier command
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Loads analysis inputs from either search output or feed output
fn load_analysis_inputs(path: &Path) -> Result<Vec<AnalysisInput>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    if let Ok(papers) = serde_json::from_str::<Vec<Paper>>(&text) {
        return Ok(papers.iter().map(AnalysisInput::from).collect());
    }
    let entries: Vec<FeedEntry> = serde_json::from_str(&text)?;
    Ok(entries.iter().map(AnalysisInput::from).collect())
}

/// Writes the result document to the chosen destination
fn emit<T: Serialize>(output: Option<&Path>, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
