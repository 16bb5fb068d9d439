//! # Route Table Module
//!
//! Route tables describe a whole [`RouteCache`] in a file, so routes can be
//! checked, inspected and hot-reloaded without recompiling.
//!
//! ## Format
//!
//! YAML (`.yaml`/`.yml`), TOML (`.toml`) or JSON (`.json`):
//!
//! ```yaml
//! router:
//!   redirect_trailing_slash: true
//!   redirect_fixed_path: true
//! routes:
//!   - { method: GET, path: /users/:id, handler: get_user }
//!   - { method: ANY, path: /static/*file, handler: serve_static }
//! ```
//!
//! The `router` section is optional and maps onto [`RouterConfig`]. `method`
//! is case-insensitive; `ANY` registers the route for every verb. The handler
//! is an opaque name carried through to [`RouteMatch::handler`](crate::router::RouteMatch::handler).

use anyhow::{anyhow, bail, Context, Result};
use http::Method;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::router::RouteCache;
use crate::runtime_config::RouterConfig;

/// Method name that registers a route for every verb.
pub const ANY_METHOD: &str = "ANY";

/// On-disk encoding of a route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Yaml,
    Toml,
    Json,
}

impl TableFormat {
    /// Pick a format from the file extension.
    ///
    /// # Errors
    ///
    /// Unknown or missing extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(TableFormat::Yaml),
            Some("toml") => Ok(TableFormat::Toml),
            Some("json") => Ok(TableFormat::Json),
            _ => bail!(
                "unsupported route table extension for {} (expected .yaml, .yml, .toml or .json)",
                path.display()
            ),
        }
    }
}

/// One `routes:` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    pub handler: String,
}

impl RouteEntry {
    /// `None` for [`ANY_METHOD`].
    ///
    /// # Errors
    ///
    /// The method is not a valid HTTP token.
    pub fn http_method(&self) -> Result<Option<Method>> {
        let name = self.method.trim().to_ascii_uppercase();
        if name == ANY_METHOD {
            return Ok(None);
        }
        Method::from_bytes(name.as_bytes())
            .map(Some)
            .map_err(|e| anyhow!("invalid HTTP method '{}': {}", self.method, e))
    }
}

/// A parsed route table file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Read and parse `path`, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// I/O failure, unsupported extension, or malformed document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read route table {}", path.display()))?;
        Self::parse(&content, format)
            .with_context(|| format!("failed to parse route table {}", path.display()))
    }

    /// Parse a document already in memory.
    ///
    /// # Errors
    ///
    /// Malformed document.
    pub fn parse(content: &str, format: TableFormat) -> Result<Self> {
        let table = match format {
            TableFormat::Yaml => serde_yaml::from_str(content)?,
            TableFormat::Toml => toml::from_str(content)?,
            TableFormat::Json => serde_json::from_str(content)?,
        };
        Ok(table)
    }

    /// Register every entry into `cache`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first invalid method or [`RouteError`](crate::router::RouteError),
    /// with the entry index in the context.
    pub fn populate(&self, cache: &RouteCache<String>) -> Result<()> {
        for (idx, entry) in self.routes.iter().enumerate() {
            let context = || format!("route #{idx} ({} {})", entry.method, entry.path);
            let method = entry.http_method().with_context(context)?;
            let handler = entry.handler.clone();
            let registered = match method {
                Some(method) => cache.add_route(method, &entry.path, handler),
                None => cache.add_route_any(&entry.path, handler),
            };
            registered.with_context(context)?;
        }
        Ok(())
    }

    /// Build a new cache configured by the `router` section.
    ///
    /// # Errors
    ///
    /// Same as [`RouteTable::populate`].
    pub fn build_cache(&self) -> Result<RouteCache<String>> {
        let cache = RouteCache::with_config(self.router.clone());
        self.populate(&cache)?;
        info!(
            routes_count = cache.len(),
            redirect_trailing_slash = self.router.redirect_trailing_slash,
            redirect_fixed_path = self.router.redirect_fixed_path,
            "Routing table loaded"
        );
        Ok(cache)
    }
}
