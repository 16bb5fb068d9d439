//! # CLI Module
//!
//! Command-line access to route tables, exposed as the `brrtrie` binary.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load a route table and register every entry; exits non-zero on the first
//! invalid or conflicting route:
//!
//! ```bash
//! brrtrie check --routes routes.yaml
//! ```
//!
//! ### `match`
//!
//! Resolve one request against a table:
//!
//! ```bash
//! brrtrie match --routes routes.yaml --method POST /users/42/posts
//! brrtrie match --routes routes.yaml /Users/42 --json
//! ```
//!
//! ### `dump`
//!
//! Print the registered routes and the trie they produced:
//!
//! ```bash
//! brrtrie dump --routes routes.yaml
//! ```
//!
//! ### `watch`
//!
//! Keep a table loaded and rebuild it whenever the file changes:
//!
//! ```bash
//! BRRTRIE_LOG_FORMAT=pretty brrtrie watch --routes routes.yaml
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli, Commands};
