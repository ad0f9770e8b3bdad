use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::client_key::ClientKey;
use crate::clock::{Clock, SystemClock};
use crate::rate_limit_config::RateLimitPolicy;

/// Upper bound on tracked client keys unless configured otherwise
pub const DEFAULT_MAX_TRACKED_CLIENTS: usize = 100_000;

/// Longest gap between opportunistic sweeps
const SWEEP_EVERY: Duration = Duration::from_secs(60);

/// Per-client window record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub window_started_at: Instant,
}

impl WindowState {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 1,
            window_started_at: now,
        }
    }

    /// A window is stale once its full duration has elapsed
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_started_at) >= window
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted { remaining: u32 },
    Rejected { retry_after: Duration },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }
}

struct Table {
    entries: HashMap<ClientKey, WindowState>,
    last_sweep: Instant,
}

/// Fixed-window-with-reset admission controller.
///
/// Each client key gets `limit` requests per window. The window starts at the
/// first request and is replaced by a new one on the first request after it
/// has run out. Rejected requests are not counted. One lock guards the whole
/// table so every check-then-increment is atomic.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    table: Mutex<Table>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            policy,
            max_entries: DEFAULT_MAX_TRACKED_CLIENTS,
            clock,
            table: Mutex::new(Table {
                entries: HashMap::new(),
                last_sweep: now,
            }),
        }
    }

    /// Cap the number of tracked keys. Values below one are raised to one.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Admit or reject a request under the default policy
    pub fn admit(&self, key: &ClientKey) -> bool {
        self.check(key).is_admitted()
    }

    /// Admit or reject a request under an explicit policy
    pub fn admit_with(&self, key: &ClientKey, policy: &RateLimitPolicy) -> bool {
        self.check_with(key, policy).is_admitted()
    }

    pub fn check(&self, key: &ClientKey) -> Decision {
        let policy = self.policy;
        self.check_with(key, &policy)
    }

    pub fn check_with(&self, key: &ClientKey, policy: &RateLimitPolicy) -> Decision {
        let now = self.clock.now();
        let mut table = self.lock();

        if now.saturating_duration_since(table.last_sweep) >= SWEEP_EVERY.min(policy.window) {
            sweep(&mut table, now, policy.window);
        }

        if let Some(state) = table.entries.get_mut(key) {
            if state.is_stale(now, policy.window) {
                *state = WindowState::fresh(now);
                return Decision::Admitted {
                    remaining: policy.limit.saturating_sub(1),
                };
            }

            if state.count >= policy.limit {
                let elapsed = now.saturating_duration_since(state.window_started_at);
                return Decision::Rejected {
                    retry_after: policy.window.saturating_sub(elapsed),
                };
            }

            state.count += 1;
            return Decision::Admitted {
                remaining: policy.limit - state.count,
            };
        }

        if table.entries.len() >= self.max_entries {
            self.make_room(&mut table, now, policy.window);
        }

        table.entries.insert(*key, WindowState::fresh(now));
        Decision::Admitted {
            remaining: policy.limit.saturating_sub(1),
        }
    }

    /// Current window record for a key, if tracked
    pub fn window_state(&self, key: &ClientKey) -> Option<WindowState> {
        self.lock().entries.get(key).copied()
    }

    /// Drop every entry whose window has run out. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.lock();
        sweep(&mut table, now, self.policy.window)
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().entries.len()
    }

    fn make_room(&self, table: &mut Table, now: Instant, window: Duration) {
        let removed = sweep(table, now, window);
        if removed > 0 {
            return;
        }

        let oldest = table
            .entries
            .iter()
            .min_by_key(|(_, state)| state.window_started_at)
            .map(|(key, _)| *key);

        if let Some(key) = oldest {
            table.entries.remove(&key);
            tracing::warn!(
                evicted = %key.short(),
                max_entries = self.max_entries,
                "Rate limit table full, evicted oldest client"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // Table updates are single assignments, so a poisoned guard is still consistent.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep(table: &mut Table, now: Instant, window: Duration) -> usize {
    let before = table.entries.len();
    table.entries.retain(|_, state| !state.is_stale(now, window));
    table.last_sweep = now;

    let removed = before - table.entries.len();
    if removed > 0 {
        tracing::debug!(removed, remaining = table.entries.len(), "Swept expired rate limit windows");
    }
    removed
}
