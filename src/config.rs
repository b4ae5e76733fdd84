//! Configuration of a docseek deployment.
//!
//! Every section has serde defaults, so a configuration file only needs the
//! keys it changes:
//!
//! ```
//! use docseek::config::DocseekConfig;
//!
//! let config = DocseekConfig::from_json_str(r#"{"search": {"limit": 10}}"#).unwrap();
//! assert_eq!(config.search.limit, 10);
//! assert!(config.analyzer.strip_stopwords);
//! assert_eq!(config.service.routes.len(), 4);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::standard::AnalyzerConfig;
use crate::error::{DocseekError, Result};
use crate::index::store::StoreConfig;
use crate::query::parser::DefaultOperator;
use crate::service::annotator::{GazetteerEntry, default_gazetteer};
use crate::service::resolver::{SourceRoute, default_routes};

/// Search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results per query.
    pub limit: usize,
    /// Operator joining juxtaposed query words.
    pub default_operator: DefaultOperator,
    /// Evaluation deadline in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            limit: 5,
            default_operator: DefaultOperator::And,
            timeout_ms: None,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Query service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub routes: Vec<SourceRoute>,
    pub gazetteer: Vec<GazetteerEntry>,
    /// Re-ingest the routed source on every query.
    pub refresh_on_query: bool,
    /// Timeout for fetching a page over HTTP, in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            routes: default_routes(),
            gazetteer: default_gazetteer(),
            refresh_on_query: false,
            fetch_timeout_ms: 30_000,
        }
    }
}

impl ServiceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocseekConfig {
    pub analyzer: AnalyzerConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub service: ServiceConfig,
}

impl DocseekConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DocseekConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DocseekError::invalid_argument(format!(
                "Cannot read configuration {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Load `path` if given, the defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.analyzer.min_term_length == 0 {
            return Err(DocseekError::invalid_argument(
                "analyzer.min_term_length must be at least 1",
            ));
        }
        if self.search.timeout_ms == Some(0) {
            return Err(DocseekError::invalid_argument(
                "search.timeout_ms must be positive",
            ));
        }
        if self.service.fetch_timeout_ms == 0 {
            return Err(DocseekError::invalid_argument(
                "service.fetch_timeout_ms must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DocseekConfig::default();
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.search.default_operator, DefaultOperator::And);
        assert_eq!(config.search.timeout(), None);
        assert!(config.store.path.is_none());
        assert!(!config.service.refresh_on_query);
        assert_eq!(config.service.gazetteer.len(), 4);
        assert_eq!(config.service.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json() {
        let config = DocseekConfig::from_json_str(
            r#"{
                "analyzer": {"strip_stopwords": false},
                "store": {"path": "/var/lib/docseek"},
                "search": {"default_operator": "or", "timeout_ms": 250},
                "service": {"routes": [{"keyword": "acme", "locator": "docs/acme.md"}]}
            }"#,
        )
        .unwrap();

        assert!(!config.analyzer.strip_stopwords);
        assert_eq!(config.analyzer.min_term_length, 1);
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/var/lib/docseek")));
        assert!(config.store.create_if_missing);
        assert_eq!(config.search.default_operator, DefaultOperator::Or);
        assert_eq!(config.search.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.service.routes, vec![SourceRoute::new("acme", "docs/acme.md")]);
        assert_eq!(config.service.gazetteer.len(), 4);
    }

    #[test]
    fn test_invalid_config() {
        assert!(DocseekConfig::from_json_str("{").is_err());
        assert!(DocseekConfig::from_json_str(r#"{"analyzer": {"min_term_length": 0}}"#).is_err());
        assert!(DocseekConfig::from_json_str(r#"{"search": {"timeout_ms": 0}}"#).is_err());
        assert!(
            DocseekConfig::from_json_str(r#"{"service": {"fetch_timeout_ms": 0}}"#).is_err()
        );
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docseek.json");

        let mut config = DocseekConfig::default();
        config.search.limit = 12;
        std::fs::write(&path, config.to_json_pretty().unwrap()).unwrap();

        assert_eq!(DocseekConfig::load(&path).unwrap(), config);
        assert_eq!(
            DocseekConfig::load_or_default(None::<&Path>).unwrap(),
            DocseekConfig::default()
        );
        assert!(DocseekConfig::load(dir.path().join("missing.json")).is_err());
    }
}
