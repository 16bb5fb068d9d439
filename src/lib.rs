//! # brrtrie
//!
//! **brrtrie** is a compressed-prefix (radix) routing trie that maps an HTTP
//! method and a request path to a registered handler in time proportional to
//! the path length, independent of how many routes are registered.
//!
//! ## Overview
//!
//! The crate is a routing core, not a server: the surrounding HTTP layer hands
//! it a method and a path and acts on the [`RouteMatch`](router::RouteMatch) it
//! gets back (dispatch, `404`, `405` with an `Allow` list, or a redirect).
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, the arena trie, lookup and the [`RouteCache`](router::RouteCache) facade
//! - **[`verb`]** - HTTP methods as bits of a mask, with a registry for custom methods
//! - **[`runtime_config`]** - Redirect and slow-lookup settings
//! - **[`table`]** - Route tables in YAML, TOML or JSON files
//! - **[`hot_reload`]** - Rebuilding a cache when its table file changes
//! - **[`otel`]** - Structured logging setup for binaries
//! - **[`cli`]** - The `brrtrie` command line tool
//!
//! ### Request Resolution Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant HTTP as HTTP layer
//!     participant Cache as RouteCache
//!     participant Map as Static map
//!     participant Trie as Radix trie
//!
//!     HTTP->>Cache: match_route(GET, "/users/42")
//!     Cache->>Map: exact path lookup
//!     Map-->>Cache: miss
//!     Cache->>Trie: descend (static first, then dynamic)
//!     Trie-->>Cache: endpoint + captures
//!     Cache-->>HTTP: RouteMatch { handler, params }
//! ```
//!
//! ## Pattern Syntax
//!
//! | Pattern               | Matches                   | Params                 |
//! |-----------------------|---------------------------|------------------------|
//! | `/users/:id`          | `/users/42`               | `id=42`                |
//! | `/files/{name}.json`  | `/files/report.json`      | `name=report`          |
//! | `/items/{id:[0-9]+}`  | `/items/7`, not `/items/x`| `id=7`                 |
//! | `/static/*path`       | `/static/css/app.css`     | `path=css/app.css`     |
//!
//! Static segments win over dynamic ones; when a static branch dead-ends, the
//! lookup backtracks into the dynamic branch.
//!
//! ## Quick Start
//!
//! ```
//! use brrtrie::router::RouteCache;
//! use http::Method;
//!
//! let cache = RouteCache::new();
//! cache.add_route(Method::GET, "/users/:id", "get_user").unwrap();
//! cache.add_route(Method::GET, "/users/admin", "admin").unwrap();
//!
//! let m = cache.match_route(&Method::GET, "/users/42");
//! assert_eq!(m.handler(), Some(&"get_user"));
//! assert_eq!(m.get_path_param("id"), Some("42"));
//!
//! let m = cache.match_route(&Method::POST, "/users/42");
//! assert!(m.method_not_allowed);
//! assert_eq!(m.allowed, vec![Method::GET]);
//! ```
//!
//! ## Concurrency
//!
//! [`RouteCache`](router::RouteCache) is `Send + Sync` for `Send + Sync`
//! handlers. Lookups share a read lock; registration and
//! [`rebuild`](router::RouteCache::rebuild) take the write lock.

pub mod cli;

pub mod hot_reload;
pub mod otel;
pub mod router;
pub mod runtime_config;
pub mod table;
pub mod verb;

pub use router::{RouteCache, RouteError, RouteMatch};
pub use runtime_config::RouterConfig;
