//! Route cache - the public face of the router and the request hot path.
//!
//! Fully literal patterns are indexed twice: in an exact-match map for the
//! common O(1) case, and in the trie, which stays the single authority for
//! conflicts, `405` detection and redirect suggestions.

// Hot path: keep allocation-prone patterns out of lookups
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::RouteError;
use super::fold;
use super::node::{Endpoint, Endpoints};
use super::path::clean_path;
use super::pattern::{self, ParsedPattern};
use super::radix::Tree;
use crate::runtime_config::RouterConfig;
use crate::verb::{Verb, VerbRegistry, VerbSet};

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// A captured path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name declared in the pattern (shared with the endpoint, never copied)
    pub key: Arc<str>,
    /// Bytes of the request path, exactly as received
    pub value: String,
}

/// Captured parameters in declaration order.
///
/// Stack-allocated for up to [`MAX_INLINE_PARAMS`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(SmallVec<[Param; MAX_INLINE_PARAMS]>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the parameter called `name`.
    ///
    /// Uses "last write wins" semantics when a key occurs more than once.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|p| p.key.as_ref() == name)
            .map(|p| p.value.as_str())
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the parameters fit in inline storage.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        !self.0.spilled()
    }

    pub(crate) fn push(&mut self, key: &Arc<str>, value: &str) {
        self.0.push(Param {
            key: Arc::clone(key),
            value: value.to_owned(),
        });
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of resolving a request.
///
/// Exactly one of the following holds:
/// - `endpoint` is set: the request matched
/// - `method_not_allowed` is set: the path exists for the verbs in `allowed`
/// - neither: not found, possibly with a `redirect` suggestion
#[derive(Debug)]
pub struct RouteMatch<H> {
    /// The matched endpoint
    pub endpoint: Option<Arc<Endpoint<H>>>,
    /// Captured parameters (e.g., `:id` → `("id", "123")`)
    pub path_params: Params,
    /// The path is registered, but not for the requested verb
    pub method_not_allowed: bool,
    /// Verbs that would have matched, for an `Allow` header
    pub allowed: Vec<Method>,
    /// A registered spelling of the path to redirect to
    pub redirect: Option<String>,
}

impl<H> Clone for RouteMatch<H> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            path_params: self.path_params.clone(),
            method_not_allowed: self.method_not_allowed,
            allowed: self.allowed.clone(),
            redirect: self.redirect.clone(),
        }
    }
}

impl<H> RouteMatch<H> {
    fn not_found() -> Self {
        Self {
            endpoint: None,
            path_params: Params::new(),
            method_not_allowed: false,
            allowed: Vec::new(),
            redirect: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.endpoint.is_some()
    }

    #[inline]
    #[must_use]
    pub fn handler(&self) -> Option<&H> {
        self.endpoint.as_ref().map(|ep| &ep.handler)
    }

    /// Pattern of the matched route.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|ep| ep.pattern.as_ref())
    }

    /// Get a path parameter by name (last occurrence wins).
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }
}

/// A registration as recorded by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    /// `None` for a match-all registration
    pub method: Option<Method>,
    pub pattern: Arc<str>,
}

impl fmt::Display for RegisteredRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.pattern),
            None => write!(f, "ANY {}", self.pattern),
        }
    }
}

#[derive(Debug)]
struct Table<H> {
    verbs: VerbRegistry,
    statics: HashMap<Box<str>, Endpoints<H>>,
    tree: Tree<H>,
    routes: Vec<RegisteredRoute>,
}

impl<H> Table<H> {
    fn new() -> Self {
        Self {
            verbs: VerbRegistry::new(),
            statics: HashMap::new(),
            tree: Tree::new(),
            routes: Vec::new(),
        }
    }

    fn insert(
        &mut self,
        method: Option<Method>,
        parsed: &ParsedPattern,
        handler: H,
    ) -> Result<(), RouteError> {
        // a new method's bit is only assigned once the route is in
        let verbs = match &method {
            Some(m) => self.verbs.reserve(m)?.mask(),
            None => self.verbs.all().union(VerbSet::STUB),
        };
        let endpoint = Arc::new(Endpoint {
            handler,
            pattern: Arc::clone(&parsed.pattern),
            param_keys: parsed.keys.clone().into(),
        });

        self.tree.insert(verbs, parsed, &endpoint)?;
        if let Some(literal) = parsed.literal() {
            self.statics
                .entry(literal.into_boxed_str())
                .or_default()
                .set(verbs, &endpoint);
        }
        if let Some(m) = &method {
            self.verbs.register(m)?;
        }
        self.routes.push(RegisteredRoute {
            method,
            pattern: Arc::clone(&parsed.pattern),
        });
        Ok(())
    }
}

/// Thread-safe route table.
///
/// Registration takes a write lock and lookups a read lock, so a cache can be
/// shared behind an `Arc` while it is still being populated. [`RouteCache::rebuild`]
/// swaps in a whole new table at once; there is no per-route removal.
pub struct RouteCache<H> {
    table: RwLock<Table<H>>,
    config: RouterConfig,
}

impl<H> Default for RouteCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for RouteCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCache")
            .field("routes", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<H> RouteCache<H> {
    /// Empty cache with the default [`RouterConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            table: RwLock::new(Table::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Make a custom method known so match-all routes added afterwards cover it.
    ///
    /// # Errors
    ///
    /// [`RouteError::VerbLimit`] once every verb bit is taken.
    pub fn register_verb(&self, method: Method) -> Result<(), RouteError> {
        self.table.write().verbs.register(&method).map(|_| ())
    }

    /// Register `handler` for `method` requests matching `pattern`.
    ///
    /// Methods outside the built-in set are registered on first use.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`]; the cache is unchanged when registration fails.
    pub fn add_route(&self, method: Method, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.register(Some(method), pattern, handler)
    }

    /// Register `handler` for every verb, including verbs registered later.
    ///
    /// # Errors
    ///
    /// Same as [`RouteCache::add_route`].
    pub fn add_route_any(&self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.register(None, pattern, handler)
    }

    fn register(&self, method: Option<Method>, pattern: &str, handler: H) -> Result<(), RouteError> {
        let result = pattern::parse(pattern)
            .and_then(|parsed| self.table.write().insert(method.clone(), &parsed, handler));
        match &result {
            Ok(()) => debug!(
                method = method.as_ref().map_or("ANY", Method::as_str),
                pattern = %pattern,
                "Route registered"
            ),
            Err(err) => warn!(
                method = method.as_ref().map_or("ANY", Method::as_str),
                pattern = %pattern,
                error = %err,
                "Route registration failed"
            ),
        }
        result
    }

    /// Resolve a request.
    ///
    /// Never fails: a miss is reported through the fields of [`RouteMatch`].
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch<H> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let table = self.table.read();
        let verb = table.verbs.get(method);

        let mut result = RouteMatch::not_found();
        let fast = table.statics.get(path).and_then(|eps| eps.get(verb));
        if let Some(endpoint) = fast {
            result.endpoint = Some(Arc::clone(endpoint));
        } else {
            let lookup = table.tree.lookup(verb, path);
            if let Some(endpoint) = lookup.endpoint {
                for (key, (start, end)) in endpoint.param_keys.iter().zip(lookup.captures.iter()) {
                    result
                        .path_params
                        .push(key, path.get(*start..*end).unwrap_or_default());
                }
                result.endpoint = Some(Arc::clone(endpoint));
            } else if !lookup.allowed.is_empty() {
                result.method_not_allowed = true;
                result.allowed = table.verbs.methods(lookup.allowed);
            } else {
                result.redirect = self.suggest(&table, verb, path);
            }
        }
        drop(table);

        let match_duration = match_start.elapsed();
        if match_duration > Duration::from_micros(self.config.slow_match_threshold_us) {
            warn!(
                method = %method,
                path = %path,
                matched = result.is_match(),
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        }

        match result.pattern() {
            Some(route_pattern) => debug!(
                method = %method,
                path = %path,
                route_pattern = %route_pattern,
                path_params = ?result.path_params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            ),
            None => debug!(
                method = %method,
                path = %path,
                method_not_allowed = result.method_not_allowed,
                redirect = ?result.redirect,
                duration_us = match_duration.as_micros(),
                "No route matched"
            ),
        }
        result
    }

    // Trailing-slash toggle first, then the cleaned, case-folded path.
    fn suggest(&self, table: &Table<H>, verb: Option<Verb>, path: &str) -> Option<String> {
        if self.config.redirect_trailing_slash && path.len() > 1 {
            let toggled = match path.strip_suffix('/') {
                Some(trimmed) => trimmed.to_owned(),
                None => {
                    let mut with_slash = String::with_capacity(path.len() + 1);
                    with_slash.push_str(path);
                    with_slash.push('/');
                    with_slash
                }
            };
            if table.tree.lookup(verb, &toggled).endpoint.is_some() {
                return Some(toggled);
            }
        }

        if self.config.redirect_fixed_path {
            let cleaned = clean_path(path);
            let fixed = fold::find_case_insensitive(
                &table.tree,
                verb,
                &cleaned,
                self.config.redirect_trailing_slash,
            )?;
            if fixed != path {
                return Some(fixed);
            }
        }
        None
    }

    /// Replace the whole table.
    ///
    /// `populate` fills a fresh cache with the same configuration; only if it
    /// succeeds is the new table swapped in, so readers see either the old or
    /// the new routes, never a mix. Returns the number of registrations.
    ///
    /// # Errors
    ///
    /// Whatever `populate` returns; the current table stays active.
    pub fn rebuild<F, E>(&self, populate: F) -> Result<usize, E>
    where
        F: FnOnce(&RouteCache<H>) -> Result<(), E>,
    {
        let fresh = RouteCache::with_config(self.config.clone());
        populate(&fresh)?;
        let table = fresh.table.into_inner();
        let count = table.routes.len();
        let nodes = table.tree.node_count();
        *self.table.write() = table;
        info!(routes_count = count, nodes, "Routing table rebuilt");
        Ok(count)
    }

    /// Every successful registration, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RegisteredRoute> {
        self.table.read().routes.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indented dump of the trie, one node per line.
    #[must_use]
    pub fn dump_tree(&self) -> String {
        let table = self.table.read();
        table.tree.render(&table.verbs)
    }
}
