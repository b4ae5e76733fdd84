//! Keyword routing from queries to documentation roots.

use serde::{Deserialize, Serialize};

/// A keyword and the documentation root it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRoute {
    pub keyword: String,
    pub locator: String,
}

impl SourceRoute {
    pub fn new<K: Into<String>, L: Into<String>>(keyword: K, locator: L) -> Self {
        SourceRoute {
            keyword: keyword.into(),
            locator: locator.into(),
        }
    }
}

/// Default routes for the supported customer data platforms.
pub fn default_routes() -> Vec<SourceRoute> {
    vec![
        SourceRoute::new("segment", "https://segment.com/docs/?ref=nav"),
        SourceRoute::new("mparticle", "https://docs.mparticle.com/"),
        SourceRoute::new("lytics", "https://docs.lytics.com/"),
        SourceRoute::new("zeotap", "https://docs.zeotap.com/home/en-us/"),
    ]
}

/// Picks the documentation root for a query.
///
/// Routes are tried in order and the first whose keyword occurs in the query,
/// ignoring case, wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResolver {
    routes: Vec<SourceRoute>,
}

impl SourceResolver {
    pub fn new(routes: Vec<SourceRoute>) -> Self {
        let routes = routes
            .into_iter()
            .map(|route| SourceRoute {
                keyword: route.keyword.to_lowercase(),
                locator: route.locator,
            })
            .filter(|route| !route.keyword.is_empty())
            .collect();
        SourceResolver { routes }
    }

    pub fn routes(&self) -> &[SourceRoute] {
        &self.routes
    }

    /// The locator routed to by `query`, if any.
    pub fn resolve(&self, query: &str) -> Option<&str> {
        let query = query.to_lowercase();
        self.routes
            .iter()
            .find(|route| query.contains(&route.keyword))
            .map(|route| route.locator.as_str())
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        SourceResolver::new(default_routes())
    }
}
