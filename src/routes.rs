// Route coverage: which (method, path) endpoints of the backend are missing
// from the collection, and which collection requests match no backend
// route.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// Leading `{{baseUrl}}`-style variable standing in for scheme and host.
static BASE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{[^{}/]+\}\}(/|$)").expect("valid base variable pattern"));

// `{id}`, `{{id}}` and `{{{id}}}` path parameters.
static BRACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{+([^{}]+)\}+$").expect("valid braced parameter pattern"));

// Postman's `:id` path parameters.
static COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z_][A-Za-z0-9_]*)$").expect("valid colon parameter pattern"));

/// One endpoint. The path is normalized: no base URL variable, no query,
/// no leading or trailing slash, and every parameter written as `{name}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "RawRoute")]
pub struct Route {
    pub method: String,
    pub path: String,
}

#[derive(Deserialize)]
struct RawRoute {
    method: String,
    #[serde(default)]
    path: String,
}

impl From<RawRoute> for Route {
    fn from(raw: RawRoute) -> Self {
        Route::new(&raw.method, &raw.path)
    }
}

impl Route {
    pub fn new(method: &str, path: &str) -> Self {
        Route {
            method: method.trim().to_ascii_uppercase(),
            path: normalize_path(path),
        }
    }

    /// First path segment, or `root` for the empty path.
    pub fn category(&self) -> &str {
        match self.path.split('/').next() {
            Some(first) if !first.is_empty() => first,
            _ => "root",
        }
    }
}

/// Bring a path from either side into one comparable form.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let path = BASE_VAR.replace(path, "");
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if let Some(caps) = BRACED.captures(segment).or_else(|| COLON.captures(segment)) {
                format!("{{{}}}", caps[1].trim())
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Every request in a collection, folders walked recursively.
pub fn collection_routes(collection: &Value) -> BTreeSet<Route> {
    let mut routes = BTreeSet::new();
    if let Some(items) = collection.get("item").and_then(Value::as_array) {
        walk_items(items, &mut routes);
    }
    routes
}

fn walk_items(items: &[Value], routes: &mut BTreeSet<Route>) {
    for item in items {
        if let Some(children) = item.get("item").and_then(Value::as_array) {
            walk_items(children, routes);
        } else if let Some(request) = item.get("request") {
            if let Some(url) = request_url(request) {
                let method = request
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or("GET");
                routes.insert(Route::new(method, &url));
            }
        }
    }
}

/// A request's URL: a plain string, `url.raw`, or `url.path` joined.
fn request_url(request: &Value) -> Option<String> {
    match request.get("url")? {
        Value::String(raw) => Some(raw.clone()),
        url => {
            if let Some(raw) = url.get("raw").and_then(Value::as_str) {
                return Some(raw.to_string());
            }
            let segments = url.get("path")?.as_array()?;
            let parts: Vec<&str> = segments.iter().filter_map(Value::as_str).collect();
            Some(parts.join("/"))
        }
    }
}

pub fn load_collection_routes(path: &Path) -> Result<BTreeSet<Route>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read collection {}", path.display()))?;
    let collection: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in collection {}", path.display()))?;
    let routes = collection_routes(&collection);
    debug!(path = %path.display(), routes = routes.len(), "read collection endpoints");
    Ok(routes)
}

/// Parse a route list: either a JSON array of `{"method", "path"}` objects
/// or text with one `METHOD path` per line. `#` starts a comment line.
pub fn parse_route_list(text: &str) -> Result<BTreeSet<Route>> {
    if text.trim_start().starts_with('[') {
        let routes: Vec<Route> = serde_json::from_str(text).context("Invalid JSON route list")?;
        return Ok(routes.into_iter().collect());
    }

    let mut routes = BTreeSet::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(method), path) = (parts.next(), parts.next()) else {
            continue;
        };
        if parts.next().is_some() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("line {}: expected `METHOD path`, got `{line}`", n + 1);
        }
        routes.insert(Route::new(method, path.unwrap_or_default()));
    }
    Ok(routes)
}

pub fn load_route_list(path: &Path) -> Result<BTreeSet<Route>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route list {}", path.display()))?;
    parse_route_list(&text).with_context(|| format!("Invalid route list {}", path.display()))
}

/// Backend routes compared against collection endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub expected_total: usize,
    pub documented_total: usize,
    /// Backend routes with no request in the collection.
    pub missing: BTreeSet<Route>,
    /// Collection requests matching no backend route.
    pub extra: BTreeSet<Route>,
}

impl RouteReport {
    pub fn compare(expected: &BTreeSet<Route>, documented: &BTreeSet<Route>) -> Self {
        RouteReport {
            expected_total: expected.len(),
            documented_total: documented.len(),
            missing: expected.difference(documented).cloned().collect(),
            extra: documented.difference(expected).cloned().collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Group routes by first path segment; both levels come out sorted.
pub fn categorize(routes: &BTreeSet<Route>) -> BTreeMap<&str, Vec<&Route>> {
    let mut categories: BTreeMap<&str, Vec<&Route>> = BTreeMap::new();
    for route in routes {
        categories.entry(route.category()).or_default().push(route);
    }
    categories
}
