use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::hot_reload::watch_routes;
use crate::router::{RouteCache, RouteMatch};
use crate::table::RouteTable;

/// Command-line interface for brrtrie
#[derive(Parser, Debug)]
#[command(name = "brrtrie", version)]
#[command(about = "Inspect and check radix-trie route tables", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register every route of a table and report conflicts
    Check {
        /// Route table file (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "BRRTRIE_ROUTES")]
        routes: PathBuf,
    },
    /// Resolve a single request
    Match {
        /// Route table file (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "BRRTRIE_ROUTES")]
        routes: PathBuf,

        /// HTTP method of the request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, e.g. /users/42
        path: String,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print registered routes and the trie
    Dump {
        /// Route table file (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "BRRTRIE_ROUTES")]
        routes: PathBuf,
    },
    /// Keep a table loaded, reloading it when the file changes
    Watch {
        /// Route table file (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "BRRTRIE_ROUTES")]
        routes: PathBuf,
    },
}

/// Execute the CLI command, writing results to stdout
///
/// # Errors
///
/// Returns an error if:
/// - The route table cannot be read or parsed
/// - A route fails to register
/// - The method given to `match` is not a valid HTTP method
/// - The watcher cannot be started
pub fn run_cli(cli: &Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

/// Execute the CLI command, writing results to `out`
///
/// # Errors
///
/// Same as [`run_cli`].
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Check { routes } => {
            let cache = load_cache(routes)?;
            writeln!(out, "ok: {} routes registered from {}", cache.len(), routes.display())?;
            Ok(())
        }
        Commands::Match {
            routes,
            method,
            path,
            json,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| anyhow!("invalid HTTP method '{}': {}", method, e))?;
            let cache = load_cache(routes)?;
            let result = cache.match_route(&method, path);
            if *json {
                let doc = match_json(&method, path, &result);
                writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
            } else {
                write_match(out, &method, path, &result)?;
            }
            Ok(())
        }
        Commands::Dump { routes } => {
            let cache = load_cache(routes)?;
            writeln!(out, "[routes] count={}", cache.len())?;
            for route in cache.routes() {
                writeln!(out, "[route] {route}")?;
            }
            writeln!(out, "[tree]")?;
            write!(out, "{}", cache.dump_tree())?;
            Ok(())
        }
        Commands::Watch { routes } => {
            let cache = Arc::new(load_cache(routes)?);
            let _watcher = watch_routes(routes, Arc::clone(&cache))
                .with_context(|| format!("failed to watch {}", routes.display()))?;
            writeln!(out, "watching {} ({} routes)", routes.display(), cache.len())?;
            out.flush()?;
            loop {
                std::thread::park();
            }
        }
    }
}

fn write_match(
    out: &mut dyn Write,
    method: &Method,
    path: &str,
    result: &RouteMatch<String>,
) -> io::Result<()> {
    if let (Some(handler), Some(pattern)) = (result.handler(), result.pattern()) {
        writeln!(out, "{method} {path} -> {handler} ({pattern})")?;
        for param in &result.path_params {
            writeln!(out, "  {} = {}", param.key, param.value)?;
        }
        return Ok(());
    }
    if result.method_not_allowed {
        let allowed: Vec<&str> = result.allowed.iter().map(Method::as_str).collect();
        return writeln!(
            out,
            "{method} {path} -> method not allowed (allow: {})",
            allowed.join(", ")
        );
    }
    writeln!(out, "{method} {path} -> not found")?;
    if let Some(redirect) = &result.redirect {
        writeln!(out, "  redirect: {redirect}")?;
    }
    Ok(())
}

fn match_json(method: &Method, path: &str, result: &RouteMatch<String>) -> serde_json::Value {
    let params: Vec<serde_json::Value> = result
        .path_params
        .iter()
        .map(|p| json!({ "key": p.key.as_ref(), "value": p.value }))
        .collect();
    let allowed: Vec<&str> = result.allowed.iter().map(Method::as_str).collect();
    json!({
        "method": method.as_str(),
        "path": path,
        "matched": result.is_match(),
        "handler": result.handler(),
        "pattern": result.pattern(),
        "params": params,
        "method_not_allowed": result.method_not_allowed,
        "allowed": allowed,
        "redirect": result.redirect,
    })
}

fn load_cache(routes: &Path) -> Result<RouteCache<String>> {
    RouteTable::load(routes)?.build_cache()
}
