// =============================================================================
// circuit_breaker.rs — KEEPING FLAKY FEEDS FROM STALLING A FETCH CYCLE
// =============================================================================
//
// Government feeds go down, sometimes for days. Each HTTP source owns one
// breaker:
//
//   Closed:   requests flow; consecutive failures are counted.
//   Open:     `failure_threshold` failures in a row; requests are refused
//             until `reset_timeout` has passed since the last failure.
//   HalfOpen: trial requests allowed; `success_threshold` successes close
//             the breaker, a single failure re-opens it.
//
// A refused request surfaces as `SourceError::CircuitOpen`, which the fetch
// cycle reports like any other source failure.
// =============================================================================

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where a breaker sits in its cycle. Serialized as `CLOSED`, `OPEN`, `HALF_OPEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation; failures are being counted.
    Closed,
    /// Tripped; requests are refused until the reset timeout passes.
    Open,
    /// Cooling off; trial requests decide whether to close or re-open.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Thresholds shared by every breaker, taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    /// Consecutive failures in Closed that trip the breaker.
    pub failure_threshold: u32,
    /// How long Open refuses requests, measured from the last failure.
    pub reset_timeout: Duration,
    /// Successful trial requests in HalfOpen needed to close again.
    pub success_threshold: u32,
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    last_failure: Option<Instant>,
    since: Instant,
    trips: u64,
}

impl BreakerState {
    fn enter(&mut self, state: CircuitState) {
        self.state = state;
        self.since = Instant::now();
    }
}

/// One breaker per upstream feed. Cheap to share behind an `Arc`; all
/// state sits behind a single lock so transitions are never torn.
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// A closed breaker. `name` shows up in logs and in `/status`.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let name = name.into();
        info!(
            name = %name,
            failure_threshold = settings.failure_threshold,
            reset_timeout_secs = settings.reset_timeout.as_secs(),
            success_threshold = settings.success_threshold,
            "Circuit breaker ready"
        );

        Self {
            name,
            settings,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                last_failure: None,
                since: Instant::now(),
                trips: 0,
            }),
        }
    }

    /// Whether a request may go out now. Moves Open → HalfOpen once the
    /// reset timeout has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.settings.reset_timeout);
                if cooled_down {
                    info!(name = %self.name, "Circuit breaker OPEN -> HALF_OPEN");
                    inner.half_open_successes = 0;
                    inner.enter(CircuitState::HalfOpen);
                }
                cooled_down
            }
        }
    }

    /// Report a request that went through. Clears the failure streak in
    /// Closed and counts toward `success_threshold` in HalfOpen.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.settings.success_threshold {
                    info!(name = %self.name, "Circuit breaker HALF_OPEN -> CLOSED");
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    inner.enter(CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Report a failed request. May trip Closed → Open; any failure in
    /// HalfOpen re-opens immediately.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.settings.failure_threshold {
                    warn!(
                        name = %self.name,
                        failures = inner.consecutive_failures,
                        "Circuit breaker tripped: CLOSED -> OPEN"
                    );
                    inner.trips += 1;
                    inner.enter(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                warn!(name = %self.name, "Trial request failed: HALF_OPEN -> OPEN");
                inner.trips += 1;
                inner.enter(CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Current state. Does not advance Open → HalfOpen; only
    /// [`CircuitBreaker::allow_request`] does that.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point-in-time copy for the status page.
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_trips: inner.trips,
            secs_in_state: inner.since.elapsed().as_secs(),
        }
    }
}

/// One row of the `breakers` array in `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    /// Breaker name, normally the source id
    pub name: String,
    pub state: CircuitState,
    /// Current failure streak; reset by a success in Closed or by closing
    pub consecutive_failures: u32,
    /// Times the breaker has opened since startup, re-opens from HalfOpen included
    pub total_trips: u64,
    /// Whole seconds since the last state change
    pub secs_in_state: u64,
}
