//! Fetch collaborators turning a source locator into raw page text.

use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ahash::AHashMap;
use log::debug;
use parking_lot::RwLock;

use crate::error::{DocseekError, Result};

const FILE_SCHEME: &str = "file://";

/// Timeout applied to a whole HTTP exchange unless configured otherwise.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn is_http(locator: &str) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Retrieves the raw content of a page.
pub trait Fetcher: Send + Sync + Debug {
    /// Fetch the page at `locator`.
    ///
    /// Fails with [`DocseekError::Fetch`] when the page cannot be retrieved
    /// and with [`DocseekError::Encoding`] when it is not valid UTF-8.
    fn fetch(&self, locator: &str) -> Result<String>;
}

/// Fetches local files given as plain paths or `file://` URLs.
///
/// Relative paths are resolved against the optional base directory.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    base: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locators against `base`.
    pub fn with_base<P: AsRef<Path>>(base: P) -> Self {
        FileFetcher {
            base: Some(base.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf> {
        let raw = locator.strip_prefix(FILE_SCHEME).unwrap_or(locator);
        if raw.is_empty() {
            return Err(DocseekError::fetch(locator, "empty path"));
        }
        if let Some((scheme, _)) = raw.split_once("://") {
            return Err(DocseekError::fetch(
                locator,
                format!("unsupported scheme '{scheme}'"),
            ));
        }

        let path = Path::new(raw);
        Ok(match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, locator: &str) -> Result<String> {
        let path = self.resolve(locator)?;
        let bytes =
            std::fs::read(&path).map_err(|e| DocseekError::fetch(locator, e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|e| DocseekError::encoding(format!("{locator}: {e}")))
    }
}

/// Fetches pages over HTTP(S) with a blocking agent.
///
/// Transport failures and non-success statuses are reported as
/// [`DocseekError::Fetch`].
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Abort any exchange that takes longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        HttpFetcher {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn http_failure(locator: &str, error: ureq::Error) -> DocseekError {
    match error {
        ureq::Error::StatusCode(status) => DocseekError::fetch(locator, format!("HTTP {status}")),
        ureq::Error::Timeout(_) => DocseekError::fetch(locator, "request timed out"),
        other => DocseekError::fetch(locator, other.to_string()),
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, locator: &str) -> Result<String> {
        if !is_http(locator) {
            return Err(DocseekError::fetch(locator, "not an http(s) URL"));
        }

        debug!("GET {locator}");
        let mut response = self
            .agent
            .get(locator)
            .call()
            .map_err(|e| http_failure(locator, e))?;
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| http_failure(locator, e))?;

        String::from_utf8(bytes)
            .map_err(|e| DocseekError::encoding(format!("{locator}: {e}")))
    }
}

/// Dispatches `http://` and `https://` locators to an [`HttpFetcher`] and
/// everything else to a [`FileFetcher`].
#[derive(Debug, Clone, Default)]
pub struct LocatorFetcher {
    files: FileFetcher,
    http: HttpFetcher,
}

impl LocatorFetcher {
    pub fn new(files: FileFetcher, http: HttpFetcher) -> Self {
        LocatorFetcher { files, http }
    }
}

impl Fetcher for LocatorFetcher {
    fn fetch(&self, locator: &str) -> Result<String> {
        if is_http(locator) {
            self.http.fetch(locator)
        } else {
            self.files.fetch(locator)
        }
    }
}

/// Serves pages from an in-memory map.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: RwLock<AHashMap<String, String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page, builder style.
    pub fn with_page<L: Into<String>, C: Into<String>>(self, locator: L, content: C) -> Self {
        self.insert(locator, content);
        self
    }

    /// Add or replace a page.
    pub fn insert<L: Into<String>, C: Into<String>>(&self, locator: L, content: C) {
        self.pages.write().insert(locator.into(), content.into());
    }

    /// Remove a page so later fetches fail.
    pub fn remove(&self, locator: &str) -> Option<String> {
        self.pages.write().remove(locator)
    }

    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, locator: &str) -> Result<String> {
        self.pages
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| DocseekError::fetch(locator, "no such page"))
    }
}
