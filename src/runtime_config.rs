//! # Runtime Configuration Module
//!
//! Behaviour switches for [`RouteCache`](crate::router::RouteCache), loaded from
//! environment variables or from the `router:` section of a route table file.
//!
//! ## Environment Variables
//!
//! ### `BRRTRIE_REDIRECT_TRAILING_SLASH`
//!
//! Suggest a redirect when the path only differs from a registered route by a
//! trailing `/`. Default: `true`
//!
//! ### `BRRTRIE_REDIRECT_FIXED_PATH`
//!
//! Suggest a redirect to the cleaned, case-corrected path (`/USERS//42` →
//! `/users/42`). Default: `true`
//!
//! ### `BRRTRIE_SLOW_MATCH_US`
//!
//! Lookups slower than this many microseconds are logged at `warn`.
//! Default: `1000`
//!
//! Booleans accept `true`/`false`, `1`/`0` and `yes`/`no`. Malformed values
//! keep the default.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrie::runtime_config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("slow match threshold: {}us", config.slow_match_threshold_us);
//! ```

use serde::Deserialize;
use std::env;

const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Router behaviour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Compute trailing-slash redirect suggestions (default: true)
    pub redirect_trailing_slash: bool,
    /// Compute cleaned/case-insensitive redirect suggestions (default: true)
    pub redirect_fixed_path: bool,
    /// Warn threshold for a single lookup, in microseconds (default: 1000)
    pub slow_match_threshold_us: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            slow_match_threshold_us: DEFAULT_SLOW_MATCH_US,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        RouterConfig {
            redirect_trailing_slash: lookup("BRRTRIE_REDIRECT_TRAILING_SLASH")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.redirect_trailing_slash),
            redirect_fixed_path: lookup("BRRTRIE_REDIRECT_FIXED_PATH")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.redirect_fixed_path),
            slow_match_threshold_us: lookup("BRRTRIE_SLOW_MATCH_US")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.slow_match_threshold_us),
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> RouterConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RouterConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config, RouterConfig::default());
        assert!(config.redirect_trailing_slash);
        assert!(config.redirect_fixed_path);
        assert_eq!(config.slow_match_threshold_us, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let config = from_map(&[
            ("BRRTRIE_REDIRECT_TRAILING_SLASH", "no"),
            ("BRRTRIE_REDIRECT_FIXED_PATH", "0"),
            ("BRRTRIE_SLOW_MATCH_US", " 250 "),
        ]);
        assert!(!config.redirect_trailing_slash);
        assert!(!config.redirect_fixed_path);
        assert_eq!(config.slow_match_threshold_us, 250);
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = from_map(&[
            ("BRRTRIE_REDIRECT_TRAILING_SLASH", "maybe"),
            ("BRRTRIE_SLOW_MATCH_US", "fast"),
        ]);
        assert_eq!(config, RouterConfig::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RouterConfig = serde_yaml::from_str("redirect_fixed_path: false").unwrap();
        assert!(config.redirect_trailing_slash);
        assert!(!config.redirect_fixed_path);
    }
}
