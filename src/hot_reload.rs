//! # Hot Reload Module
//!
//! Live reloading of a route table file without restarting the process.
//!
//! ## Reload Process
//!
//! When the table file changes:
//!
//! 1. **Detection** - Filesystem watcher reports a modify or create event
//! 2. **Parse** - The file is loaded and every route registered into a fresh table
//! 3. **Swap** - The fresh table replaces the old one in a single write
//!
//! ## Error Handling
//!
//! If the new table fails to parse or register:
//! - The error is logged
//! - The previous table remains active
//! - Lookups keep being served
//!
//! The `router:` section of the file is read once, when the cache is first
//! built; a reload only replaces routes.

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::router::RouteCache;
use crate::table::RouteTable;

/// Reload `path` into `cache`, returning the new route count.
///
/// # Errors
///
/// Any load or registration error; `cache` is left untouched.
pub fn reload_routes(path: &Path, cache: &RouteCache<String>) -> anyhow::Result<usize> {
    let table = RouteTable::load(path)?;
    cache.rebuild(|fresh| table.populate(fresh))
}

/// Watch a route table file and rebuild `cache` whenever it changes.
///
/// The watcher stops when the returned handle is dropped.
///
/// # Errors
///
/// The watcher could not be created or the path could not be watched.
pub fn watch_routes<P>(
    table_path: P,
    cache: Arc<RouteCache<String>>,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
{
    let path: PathBuf = table_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    debug!(kind = ?event.kind, "hot-reload: ignoring event");
                    return;
                }
                match reload_routes(&watch_path, &cache) {
                    Ok(count) => info!(
                        path = %watch_path.display(),
                        routes_count = count,
                        "hot-reload: route table applied"
                    ),
                    Err(e) => error!(
                        path = %watch_path.display(),
                        error = %format!("{e:#}"),
                        "hot-reload: keeping previous route table"
                    ),
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching route table");
    Ok(watcher)
}
