use super::rate_limit::RateLimitSnapshot;
use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, OnceLock,
    },
};

/// Source of the current time. Swapped out in tests to step over cache TTLs.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// State shared by every `Client` that holds the same `Context`.
///
/// The query counter is only ever incremented. The rate limit cache is
/// guarded by a mutex which is held across a refresh, so a reader never sees
/// a partially replaced snapshot.
#[derive(Debug)]
pub struct Context {
    queries: AtomicU64,
    rate_limits: Mutex<Option<RateLimitSnapshot>>,
    clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            queries: AtomicU64::new(0),
            rate_limits: Mutex::new(None),
            clock,
        }
    }

    /// The process-wide context used by clients that are not handed one
    /// explicitly.
    pub fn shared() -> Arc<Context> {
        static SHARED: OnceLock<Arc<Context>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Context::new())).clone()
    }

    /// Number of HTTP calls dispatched through this context so far
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn record_query(&self) -> u64 {
        self.queries.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn rate_limits(&self) -> MutexGuard<'_, Option<RateLimitSnapshot>> {
        // A panic while refreshing leaves either the old snapshot or a
        // complete new one in place, so a poisoned lock is still usable.
        self.rate_limits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop the cached rate limit snapshot, forcing the next query to refresh
    pub fn invalidate_rate_limits(&self) {
        self.rate_limits().take();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
