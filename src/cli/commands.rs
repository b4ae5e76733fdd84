//! Command implementations for the docseek CLI.

use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::DocseekConfig;
use crate::error::{DocseekError, Result};
use crate::index::store::IndexStore;
use crate::ingest::extract::{AutoExtractor, Extractor, HtmlExtractor, MarkdownExtractor};
use crate::ingest::fetch::{Fetcher, FileFetcher, HttpFetcher, LocatorFetcher};
use crate::ingest::pipeline::{IngestReport, IngestionPipeline};
use crate::query::engine::QueryEngine;
use crate::query::evaluator::ScanControl;
use crate::service::handler::{QueryRequest, QueryResult, QueryService};

/// Execute a CLI command.
pub fn execute_command(args: DocseekArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Ingest(ingest_args) => ingest(ingest_args, &config, &args),
        Command::Search(search_args) => search(search_args, &config, &args),
        Command::Ask(ask_args) => ask(ask_args, &config, &args),
        Command::Stats => show_stats(&config, &args),
        Command::Verify => verify(&config, &args),
        Command::Rebuild(rebuild_args) => rebuild(rebuild_args, &config, &args),
    }
}

/// Load the configuration file and apply command line overrides.
pub fn load_config(args: &DocseekArgs) -> Result<DocseekConfig> {
    let mut config = DocseekConfig::load_or_default(args.config.as_ref())?;
    if let Some(index) = &args.index {
        config.store.path = Some(index.clone());
    }
    Ok(config)
}

/// Open the index store described by `config`.
pub fn open_store(config: &DocseekConfig) -> Result<Arc<IndexStore>> {
    let analyzer = Arc::new(StandardAnalyzer::with_config(config.analyzer.clone())?);
    Ok(Arc::new(IndexStore::open_with_config(
        analyzer,
        config.store.clone(),
    )?))
}

fn extractor_for(format: PageFormat) -> Result<Arc<dyn Extractor>> {
    Ok(match format {
        PageFormat::Auto => Arc::new(AutoExtractor::new()?),
        PageFormat::Html => Arc::new(HtmlExtractor::new()?),
        PageFormat::Markdown => Arc::new(MarkdownExtractor::new()),
    })
}

fn fetcher_for(source: &SourceArgs, config: &DocseekConfig) -> Arc<dyn Fetcher> {
    let files = match &source.base {
        Some(base) => FileFetcher::with_base(base),
        None => FileFetcher::new(),
    };
    let http = HttpFetcher::with_timeout(config.service.fetch_timeout());
    Arc::new(LocatorFetcher::new(files, http))
}

fn pipeline_for(
    store: Arc<IndexStore>,
    source: &SourceArgs,
    config: &DocseekConfig,
) -> Result<IngestionPipeline> {
    Ok(IngestionPipeline::new(
        store,
        fetcher_for(source, config),
        extractor_for(source.page_format)?,
    ))
}

fn finish_report(report: &IngestReport, cli_args: &DocseekArgs) -> Result<()> {
    output_result("Ingestion finished", report, cli_args)?;
    if report.is_success() {
        Ok(())
    } else {
        Err(DocseekError::other(format!(
            "{} of {} locators failed",
            report.failures.len(),
            report.failures.len() + report.ingested.len()
        )))
    }
}

/// Fetch and index pages.
fn ingest(args: &IngestArgs, config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    let store = open_store(config)?;
    let pipeline = pipeline_for(store.clone(), &args.source, config)?;

    let report = pipeline.ingest_all(args.locators.as_slice())?;
    store.close()?;
    finish_report(&report, cli_args)
}

/// Search the index.
fn search(args: &SearchArgs, config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    let store = open_store(config)?;
    let operator = args
        .operator
        .map(Into::into)
        .unwrap_or(config.search.default_operator);
    let engine = QueryEngine::new(store).with_default_operator(operator);

    let mut control = ScanControl::new();
    if let Some(timeout) = args
        .timeout_ms
        .map(std::time::Duration::from_millis)
        .or(config.search.timeout())
    {
        control = control.with_timeout(timeout);
    }

    let start_time = Instant::now();
    let query = engine.parse(&args.query)?;
    let hits = engine.search_query(
        &query,
        args.limit.unwrap_or(config.search.limit),
        &control,
    )?;
    let duration = start_time.elapsed();

    info!("Query {query} returned {} hits", hits.len());
    let results = SearchResults {
        query: args.query.clone(),
        parsed: args.explain.then(|| query.to_string()),
        total_hits: hits.len(),
        hits: hits.into_iter().map(QueryResult::from).collect(),
        duration_ms: duration.as_millis() as u64,
    };
    output_result("Search finished", &results, cli_args)
}

/// Answer a question through the query service.
fn ask(args: &AskArgs, config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    let store = open_store(config)?;
    let service = QueryService::from_config(
        store.clone(),
        fetcher_for(&args.source, config),
        extractor_for(args.source.page_format)?,
        config,
    )?;
    let service = match args.limit {
        Some(limit) => service.with_limit(limit),
        None => service,
    }
    .with_refresh_on_query(args.refresh || config.service.refresh_on_query);

    let response = service.handle(&QueryRequest::new(args.question.clone()))?;
    store.close()?;
    output_result("Query answered", &response, cli_args)
}

/// Show index statistics.
fn show_stats(config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    let store = open_store(config)?;
    output_result("Index statistics", &store.stats(), cli_args)
}

/// Check the invariants of the current snapshot.
fn verify(config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    let store = open_store(config)?;
    store.verify()?;

    let stats = store.stats();
    let result = VerificationResult {
        location: stats.location,
        version: stats.version,
        documents: stats.documents,
        terms: stats.terms,
        verified: true,
    };
    output_result("Index verified", &result, cli_args)
}

/// Clear the index and ingest pages from scratch.
fn rebuild(args: &RebuildArgs, config: &DocseekConfig, cli_args: &DocseekArgs) -> Result<()> {
    if args.discard {
        let storage = config.store.open_storage()?;
        IndexStore::discard_persisted(storage.as_ref())?;
        storage.close()?;
    }

    let store = open_store(config)?;
    let pipeline = pipeline_for(store.clone(), &args.source, config)?;
    let report = pipeline.rebuild(args.locators.as_slice())?;
    store.close()?;
    finish_report(&report, cli_args)
}
