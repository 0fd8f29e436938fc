// ═══════════════════════════════════════════════════════════════
// METRICS + STATUS ENDPOINT
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters for the fetch loop and the endpoint, plus a small
// HTTP/1.1 responder over a raw TcpListener serving JSON:
//
//   GET /listings?view=&q=&country=&asset_type=   grouped view
//   GET /listing/{id}?source=                     one record (deep links)
//   GET /status                                   sources, breakers, counters
//   GET /attributions                             license blocks
//
// One request per connection; the response closes it.

use anyhow::Context;
use parking_lot::RwLock;
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::catalog::{source_key, Catalog};
use crate::classifier::display_label;
use crate::filter::{FilterQuery, ListingView};
use crate::models::{share_link, AssetType, DataSourceDescriptor};
use crate::sources::{registry, ListingSource};
use crate::view_cache::ViewCache;

const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// The metrics snapshot, serialized into `/status`.
#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub fetch_cycles: u64,
    pub listings_ingested: u64,
    pub duplicates_dropped: u64,
    pub source_errors: u64,
    pub listing_requests: u64,
    pub status_requests: u64,
    pub not_found: u64,
    pub uptime_seconds: u64,
}

pub struct MetricsCollector {
    fetch_cycles: AtomicU64,
    listings_ingested: AtomicU64,
    duplicates_dropped: AtomicU64,
    source_errors: AtomicU64,
    listing_requests: AtomicU64,
    status_requests: AtomicU64,
    not_found: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            fetch_cycles: AtomicU64::new(0),
            listings_ingested: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            listing_requests: AtomicU64::new(0),
            status_requests: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Account for one finished fetch cycle.
    pub fn record_cycle(&self, received: usize, ingested: usize, errors: usize) {
        self.fetch_cycles.fetch_add(1, Ordering::Relaxed);
        self.listings_ingested
            .fetch_add(ingested as u64, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(received.saturating_sub(ingested) as u64, Ordering::Relaxed);
        self.source_errors.fetch_add(errors as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetch_cycles: self.fetch_cycles.load(Ordering::Relaxed),
            listings_ingested: self.listings_ingested.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            listing_requests: self.listing_requests.load(Ordering::Relaxed),
            status_requests: self.status_requests.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the endpoint reads. The fetch loop swaps in a new catalog
/// with [`ServiceState::publish`]; readers hold an `Arc` to whichever
/// catalog was current when their request arrived.
pub struct ServiceState {
    catalog: RwLock<Arc<Catalog>>,
    sources: Vec<Arc<dyn ListingSource>>,
    pub view_cache: ViewCache,
    pub metrics: MetricsCollector,
    pub public_base_url: String,
}

impl ServiceState {
    pub fn new(
        sources: Vec<Arc<dyn ListingSource>>,
        view_cache_size: usize,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(Catalog::empty())),
            sources,
            view_cache: ViewCache::new(view_cache_size),
            metrics: MetricsCollector::new(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog.read())
    }

    pub fn publish(&self, catalog: Catalog) {
        *self.catalog.write() = Arc::new(catalog);
    }

    pub fn sources(&self) -> &[Arc<dyn ListingSource>] {
        &self.sources
    }

    /// Descriptors of the registered sources, first registration per id.
    pub fn descriptors(&self) -> Vec<DataSourceDescriptor> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .map(|source| source.descriptor())
            .filter(|descriptor| seen.insert(descriptor.id.clone()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    fn to_http(&self) -> String {
        let json = serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| "{}".to_string());
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            json.len(),
            json,
        )
    }
}

/// Dispatch one request. `target` is the request-target from the request
/// line, path plus optional query string.
pub fn route(state: &ServiceState, method: &str, target: &str) -> Response {
    if method != "GET" {
        return Response::error(405, format!("method {method} not allowed"));
    }

    let url = match Url::parse("http://status.local/").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(e) => return Response::error(400, format!("bad request target: {e}")),
    };

    let path = url.path();
    if let Some(id) = path.strip_prefix("/listing/") {
        let source = url
            .query_pairs()
            .find(|(key, _)| key == "source")
            .map(|(_, value)| value.into_owned());
        return listing_detail(state, id, source.as_deref());
    }

    match path {
        "/listings" => listings(state, &url),
        "/status" => status(state),
        "/attributions" => Response::ok(json!(registry::with_attribution())),
        _ => {
            state.metrics.not_found.fetch_add(1, Ordering::Relaxed);
            Response::error(404, format!("no route for {path}"))
        }
    }
}

/// Build the view and query from the URL. Unknown parameters are ignored;
/// unknown views or asset types are a 400.
fn parse_listing_query(url: &Url) -> Result<(ListingView, FilterQuery), String> {
    let mut view = ListingView::Active;
    let mut query = FilterQuery::new();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "view" => {
                view = ListingView::from_param(&value).ok_or_else(|| format!("unknown view '{value}'"))?;
            }
            "q" => query.search_text = value.into_owned(),
            "country" => {
                query.countries.insert(value.into_owned());
            }
            "asset_type" => {
                let asset_type =
                    AssetType::from_slug(&value).ok_or_else(|| format!("unknown asset type '{value}'"))?;
                query.asset_types.insert(asset_type);
            }
            _ => {}
        }
    }

    Ok((view, query))
}

fn listings(state: &ServiceState, url: &Url) -> Response {
    let (view, query) = match parse_listing_query(url) {
        Ok(parsed) => parsed,
        Err(message) => return Response::error(400, message),
    };

    state.metrics.listing_requests.fetch_add(1, Ordering::Relaxed);
    let catalog = state.catalog();
    let grouped = state.view_cache.get_or_compute(&catalog, view, &query);

    Response::ok(json!({
        "view": view,
        "generation": catalog.generation(),
        "fetched_at": catalog.fetched_at(),
        "has_active_filters": query.has_active_filters(),
        "available_countries": catalog.available_countries(view),
        "total": grouped.listing_count(),
        "countries": &*grouped,
        "errors": catalog.errors(),
    }))
}

/// Without `source` the first source publishing `id` wins.
fn listing_detail(state: &ServiceState, encoded_id: &str, source: Option<&str>) -> Response {
    let id = match urlencoding::decode(encoded_id) {
        Ok(id) => id,
        Err(_) => return Response::error(400, "listing id is not valid UTF-8"),
    };

    let catalog = state.catalog();
    let found = match source {
        Some(source) => catalog.find_from(source, &id),
        None => catalog.find(&id),
    };
    let Some(listing) = found else {
        state.metrics.not_found.fetch_add(1, Ordering::Relaxed);
        return Response::error(404, format!("no listing {id}"));
    };

    Response::ok(json!({
        "listing": listing,
        "source": source_key(listing),
        "lifecycle": listing.lifecycle(),
        "asset_label": display_label(listing.asset_type),
        "time_remaining": listing.time_remaining(chrono::Utc::now()),
        "primary_image": listing.primary_image(),
        "share_link": share_link(&state.public_base_url, &listing.id),
        "attribution": catalog.attribution_for(listing),
    }))
}

fn status(state: &ServiceState) -> Response {
    state.metrics.status_requests.fetch_add(1, Ordering::Relaxed);
    let catalog = state.catalog();
    let breakers: Vec<_> = state.sources.iter().filter_map(|source| source.breaker()).collect();

    Response::ok(json!({
        "status": "operational",
        "generation": catalog.generation(),
        "cycle_id": catalog.cycle_id(),
        "last_updated": catalog.fetched_at(),
        "sources": catalog.source_status(&state.descriptors()),
        "breakers": breakers,
        "metrics": state.metrics.snapshot(),
        "view_cache": state.view_cache.snapshot(),
    }))
}

/// Pull method and target out of the first request line.
fn parse_request_line(raw: &str) -> Option<(&str, &str)> {
    let line = raw.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// Read until the request line is complete, the peer stops writing, or
/// `MAX_REQUEST_BYTES` have arrived. Only the request line is routed on.
async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        let scan_from = filled;
        filled += n;
        if memchr::memchr(b'\n', &buf[scan_from..filled]).is_some() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

async fn handle_connection(mut stream: TcpStream, state: Arc<ServiceState>) {
    let buf = match read_request_head(&mut stream).await {
        Ok(buf) => buf,
        Err(e) => {
            debug!(error = %e, "Status endpoint read failed");
            return;
        }
    };

    let raw = String::from_utf8_lossy(&buf);
    let response = match parse_request_line(&raw) {
        Some((method, target)) => {
            debug!(method = method, target = target, "Status endpoint request");
            route(&state, method, target)
        }
        None => Response::error(400, "malformed request line"),
    };

    if let Err(e) = stream.write_all(response.to_http().as_bytes()).await {
        debug!(error = %e, "Status endpoint write failed");
    }
    let _ = stream.shutdown().await;
}

/// Serve on an already-bound listener until `shutdown` flips.
pub async fn serve(listener: TcpListener, state: Arc<ServiceState>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _addr)) => {
                        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
                    }
                    Err(e) => {
                        error!(error = %e, "Status endpoint accept error");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("Status endpoint shutting down");
                break;
            }
        }
    }
}

pub async fn run_status_server(
    addr: &str,
    state: Arc<ServiceState>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding status endpoint on {addr}"))?;

    match listener.local_addr() {
        Ok(local) => info!(addr = %local, "Status endpoint listening"),
        Err(e) => warn!(error = %e, "Status endpoint listening on unknown address"),
    }

    serve(listener, state, shutdown).await;
    Ok(())
}
