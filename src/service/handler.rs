//! The query request handler.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::DocseekConfig;
use crate::error::Result;
use crate::index::store::IndexStore;
use crate::ingest::extract::Extractor;
use crate::ingest::fetch::Fetcher;
use crate::ingest::pipeline::IngestionPipeline;
use crate::query::engine::QueryEngine;
use crate::query::evaluator::{ScanControl, SearchHit};
use crate::service::annotator::{Annotation, Annotator, GazetteerAnnotator};
use crate::service::resolver::SourceResolver;

/// Message returned when no route matches the query.
pub const NO_DOCUMENTATION_MESSAGE: &str = "No relevant documentation found for the query.";

/// Message returned when the search yields no passages.
pub const NO_CONTENT_MESSAGE: &str = "No relevant content found for your query.";

/// An incoming query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        QueryRequest {
            query: query.into(),
        }
    }
}

/// One ranked passage in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub source: String,
    pub score: f32,
}

impl From<SearchHit> for QueryResult {
    fn from(hit: SearchHit) -> Self {
        QueryResult {
            title: hit.document.title,
            subtitle: hit.document.subtitle,
            content: hit.document.body,
            source: hit.document.source,
            score: hit.score,
        }
    }
}

/// The answer to a [`QueryRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<QueryResult>,
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Annotates, routes, ingests on demand and searches.
#[derive(Debug, Clone)]
pub struct QueryService {
    pipeline: IngestionPipeline,
    engine: QueryEngine,
    resolver: SourceResolver,
    annotator: Arc<dyn Annotator>,
    limit: usize,
    timeout: Option<Duration>,
    refresh_on_query: bool,
}

impl QueryService {
    /// Create a service returning at most five results.
    pub fn new(
        pipeline: IngestionPipeline,
        engine: QueryEngine,
        resolver: SourceResolver,
        annotator: Arc<dyn Annotator>,
    ) -> Self {
        QueryService {
            pipeline,
            engine,
            resolver,
            annotator,
            limit: 5,
            timeout: None,
            refresh_on_query: false,
        }
    }

    /// Assemble a service over `store` from configuration.
    pub fn from_config(
        store: Arc<IndexStore>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        config: &DocseekConfig,
    ) -> Result<Self> {
        let pipeline = IngestionPipeline::new(store.clone(), fetcher, extractor);
        let engine = QueryEngine::new(store).with_default_operator(config.search.default_operator);
        let resolver = SourceResolver::new(config.service.routes.clone());
        let annotator = Arc::new(GazetteerAnnotator::new(config.service.gazetteer.clone())?);

        Ok(QueryService::new(pipeline, engine, resolver, annotator)
            .with_limit(config.search.limit)
            .with_timeout(config.search.timeout())
            .with_refresh_on_query(config.service.refresh_on_query))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-ingest the routed source on every query instead of only when absent.
    pub fn with_refresh_on_query(mut self, refresh: bool) -> Self {
        self.refresh_on_query = refresh;
        self
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// Answer `request`.
    ///
    /// An unparseable query or an unusable store is an error. The query is
    /// parsed before the routed source is touched. A failed
    /// ingestion of the routed source is logged and the search runs against
    /// whatever is already indexed.
    pub fn handle(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = request.query.as_str();
        debug!("Received query: {query}");

        let annotations = self.annotator.annotate(query);
        let parsed = self.engine.parse(query)?;

        let Some(locator) = self.resolver.resolve(query) else {
            return Ok(QueryResponse {
                annotations,
                message: Some(NO_DOCUMENTATION_MESSAGE.to_string()),
                ..Default::default()
            });
        };

        let ingested = if self.refresh_on_query {
            self.pipeline.ingest(locator).map(Some)
        } else {
            self.pipeline.ensure_indexed(locator)
        };
        match ingested {
            Ok(Some(outcome)) => info!("Source {locator} for query: {outcome}"),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Searching without refreshing {locator}: {e}"),
        }

        let mut control = ScanControl::new();
        if let Some(timeout) = self.timeout {
            control = control.with_timeout(timeout);
        }
        let hits = self.engine.search_query(&parsed, self.limit, &control)?;

        let message = hits.is_empty().then(|| NO_CONTENT_MESSAGE.to_string());
        Ok(QueryResponse {
            results: hits.into_iter().map(QueryResult::from).collect(),
            annotations,
            source: Some(locator.to_string()),
            message,
        })
    }
}
