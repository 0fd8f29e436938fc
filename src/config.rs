// =============================================================================
// config.rs — ENVIRONMENT CONFIGURATION
// =============================================================================
//
// Every knob is a `SURPLUS_*` environment variable with a default that works
// out of the box: mock sources on, refetch every ten minutes, status endpoint
// on :9090. A `.env` file in the working directory is loaded first if present.
//
// Malformed values fall back to their defaults rather than aborting startup.
// =============================================================================

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::circuit_breaker::BreakerSettings;

/// Refetch interval used when `SURPLUS_REFETCH_SECS` is missing, zero or
/// not a number. Matches the ten-minute refresh the front end always had.
const DEFAULT_REFETCH_SECS: u64 = 600;

/// One `id=url` entry from `SURPLUS_HTTP_SOURCES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceEntry {
    pub id: String,
    pub url: String,
}

/// Runtime configuration, read once at startup by [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // FETCH CYCLE
    // =========================================================================

    /// Time between fetch cycles. Default: 600 seconds. Never zero.
    /// `SURPLUS_REFETCH_SECS`.
    pub refetch_interval: Duration,

    /// Register one mock source per registry entry. Default: true.
    /// `SURPLUS_USE_MOCK_SOURCES`; accepts true/false, 1/0, yes/no, on/off.
    pub use_mock_sources: bool,

    /// JSON feeds to poll over HTTP, in registration order, from
    /// `SURPLUS_HTTP_SOURCES="gsa-us=https://...,uk-surplus=https://..."`.
    /// An id found in the registry inherits its name and attribution.
    pub http_sources: Vec<HttpSourceEntry>,

    /// Per-request timeout for HTTP sources. Default: 20 seconds.
    /// `SURPLUS_HTTP_TIMEOUT_SECS`.
    pub http_timeout: Duration,

    // =========================================================================
    // CIRCUIT BREAKER
    // =========================================================================

    /// Consecutive failures that trip a source's breaker open.
    /// Default: 5. `SURPLUS_CB_FAILURE_THRESHOLD`.
    pub circuit_breaker_failure_threshold: u32,

    /// How long an open breaker refuses requests before letting a trial
    /// request through. Default: 60 seconds. `SURPLUS_CB_RESET_TIMEOUT_SECS`.
    pub circuit_breaker_reset_timeout: Duration,

    /// Successful trial requests needed to close a half-open breaker.
    /// Default: 2. `SURPLUS_CB_SUCCESS_THRESHOLD`.
    pub circuit_breaker_success_threshold: u32,

    // =========================================================================
    // SERVING
    // =========================================================================

    /// Bind address of the status/listings endpoint.
    /// Default: `0.0.0.0:9090`. `SURPLUS_STATUS_ADDR`.
    pub status_addr: String,

    /// Base URL share links are built from; anything after a `#` is dropped.
    /// Default: `http://localhost:9090/`. `SURPLUS_PUBLIC_BASE_URL`.
    pub public_base_url: String,

    /// Memoized grouped views kept per process. Zero means the cache's own
    /// default of 256. `SURPLUS_VIEW_CACHE_SIZE`.
    pub view_cache_size: usize,

    /// Emit logs as JSON lines instead of the human format.
    /// Default: false. `SURPLUS_LOG_JSON`.
    pub log_json: bool,
}

impl Config {
    /// Load `.env` if present, then read every `SURPLUS_*` variable,
    /// falling back to the documented default for anything missing or
    /// malformed. Never fails.
    pub fn from_env() -> Self {
        // Missing .env is the normal case in production.
        let _ = dotenvy::dotenv();

        Config {
            refetch_interval: parse_refetch_interval(&env_or_default("SURPLUS_REFETCH_SECS", "600")),
            use_mock_sources: parse_bool(&env_or_default("SURPLUS_USE_MOCK_SOURCES", "true"), true),
            http_sources: parse_http_sources(&env_or_default("SURPLUS_HTTP_SOURCES", "")),
            http_timeout: Duration::from_secs(
                env_or_default("SURPLUS_HTTP_TIMEOUT_SECS", "20").parse().unwrap_or(20),
            ),

            circuit_breaker_failure_threshold: env_or_default("SURPLUS_CB_FAILURE_THRESHOLD", "5")
                .parse()
                .unwrap_or(5),
            circuit_breaker_reset_timeout: Duration::from_secs(
                env_or_default("SURPLUS_CB_RESET_TIMEOUT_SECS", "60").parse().unwrap_or(60),
            ),
            circuit_breaker_success_threshold: env_or_default("SURPLUS_CB_SUCCESS_THRESHOLD", "2")
                .parse()
                .unwrap_or(2),

            status_addr: env_or_default("SURPLUS_STATUS_ADDR", "0.0.0.0:9090"),
            public_base_url: env_or_default("SURPLUS_PUBLIC_BASE_URL", "http://localhost:9090/"),
            view_cache_size: env_or_default("SURPLUS_VIEW_CACHE_SIZE", "256")
                .parse()
                .unwrap_or(256),
            log_json: log_json_from_env(),
        }
    }

    /// Thresholds handed to each HTTP source's circuit breaker.
    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.circuit_breaker_failure_threshold,
            reset_timeout: self.circuit_breaker_reset_timeout,
            success_threshold: self.circuit_breaker_success_threshold,
        }
    }
}

/// Read just the log format, so logging can start before the rest of the
/// config is parsed and its warnings are not lost.
pub fn log_json_from_env() -> bool {
    let _ = dotenvy::dotenv();
    parse_bool(&env_or_default("SURPLUS_LOG_JSON", "false"), false)
}

/// `env::var` with a default for unset or non-UTF-8 values.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Seconds between fetch cycles. Zero or unparsable falls back to the
/// 600-second default; a zero period would spin the fetch loop.
fn parse_refetch_interval(raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(
                value = raw,
                default_secs = DEFAULT_REFETCH_SECS,
                "Invalid SURPLUS_REFETCH_SECS; using default"
            );
            Duration::from_secs(DEFAULT_REFETCH_SECS)
        }
    }
}

/// Lenient boolean parse; anything unrecognized keeps `default`.
fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse `id=url,id=url`. Entries without an `=`, with an empty side, or
/// with a URL that does not parse are skipped.
fn parse_http_sources(raw: &str) -> Vec<HttpSourceEntry> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let Some((id, url)) = entry.split_once('=') else {
                warn!(entry = entry, "Ignoring HTTP source without id=url form");
                return None;
            };
            let (id, url) = (id.trim(), url.trim());
            if id.is_empty() || url::Url::parse(url).is_err() {
                warn!(entry = entry, "Ignoring malformed HTTP source");
                return None;
            }
            Some(HttpSourceEntry {
                id: id.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
