//! # Router Module
//!
//! The router module maps an HTTP method and a request path to a registered
//! handler using a compressed prefix tree.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing route patterns into literal and dynamic segments
//! - Building the trie, splitting shared prefixes and rejecting conflicts
//! - Matching requests and capturing path parameters
//! - Reporting `405` candidates and redirect suggestions on a miss
//!
//! ## Architecture
//!
//! 1. **Registration**: [`RouteCache::add_route`] parses the pattern, checks the
//!    trie for conflicts without touching it, then inserts. Fully literal
//!    patterns are also put in an exact-match map.
//!
//! 2. **Matching**: [`RouteCache::match_route`] tries the exact-match map, then
//!    descends the trie. On a miss it looks for other verbs at the same node
//!    and, failing that, for a trailing-slash or case-corrected spelling of the
//!    path.
//!
//! ## Example
//!
//! ```rust
//! use brrtrie::router::RouteCache;
//! use http::Method;
//!
//! let cache = RouteCache::new();
//! cache.add_route(Method::GET, "/users/:id", "get_user").unwrap();
//!
//! let m = cache.match_route(&Method::GET, "/Users/42");
//! assert!(!m.is_match());
//! assert_eq!(m.redirect.as_deref(), Some("/users/42"));
//! ```
//!
//! ## Performance
//!
//! - Static routes: one hash lookup
//! - Dynamic routes: O(k) in the path length, plus backtracking where a static
//!   branch shadows a dynamic one
//! - Up to [`MAX_INLINE_PARAMS`] captured parameters without heap allocation

mod core;
mod error;
mod fold;
mod node;
mod path;
pub mod pattern;
mod radix;

pub use self::core::{Param, Params, RegisteredRoute, RouteCache, RouteMatch, MAX_INLINE_PARAMS};
pub use error::RouteError;
pub use node::Endpoint;
pub use path::clean_path;
