use crate::client::{
    Client, Request, Result, HEADER_RATE_LIMIT, HEADER_RATE_REMAINING, HEADER_RATE_RESET,
};
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Method;
use serde::Deserialize;

/// How long a fetched snapshot is served from cache, in seconds
pub const RATE_LIMIT_TTL_SECS: i64 = 60;

/// Core limit Github grants to authenticated requests
pub const AUTHENTICATED_CORE_LIMIT: u64 = 5000;
// Anything below this is the unauthenticated ceiling (60 per hour)
const ANONYMOUS_CORE_CEILING: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Rate {
    pub limit: u64,
    pub remaining: u64,
    /// UTC epoch seconds at which the window resets
    pub reset: i64,
}

impl Rate {
    pub(crate) fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let mut rate = Self::default();

        if let Some(limit) = header_value(headers, HEADER_RATE_LIMIT) {
            rate.limit = limit;
        };

        if let Some(remaining) = header_value(headers, HEADER_RATE_REMAINING) {
            rate.remaining = remaining;
        };

        if let Some(reset) = header_value(headers, HEADER_RATE_RESET) {
            rate.reset = reset;
        };

        rate
    }

    /// Integer percentage of the limit already consumed, rounded down
    pub fn percent_used(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        let used = self.limit.saturating_sub(self.remaining);
        100 * used / self.limit
    }

    /// Negative once the reset time has passed
    pub fn seconds_until_reset(&self, now: DateTime<Utc>) -> i64 {
        self.reset - now.timestamp()
    }
}

fn header_value<T: std::str::FromStr>(
    headers: &reqwest::header::HeaderMap,
    name: &str,
) -> Option<T> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct RateLimits {
    // The rate limit for non-search API v3 requests. Unauthenticated
    // requests are limited to 60 per hour. Authenticated requests are
    // limited to 5,000 per hour.
    //
    // GitHub API docs: https://developer.github.com/v3/#rate-limiting
    pub core: Rate,

    // The rate limit for search API requests. Unauthenticated requests
    // are limited to 10 requests per minute. Authenticated requests are
    // limited to 30 per minute.
    //
    // GitHub API docs: https://developer.github.com/v3/search/#rate-limit
    pub search: Rate,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimits,
}

/// Quota as reported by the rate_limit endpoint at `fetched_at`
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitSnapshot {
    pub core: Rate,
    pub search: Rate,
    pub fetched_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now - self.fetched_at).num_milliseconds() <= RATE_LIMIT_TTL_SECS * 1000
    }
}

/// `RateLimitClient` handles communication with the rate_limit related methods of the GitHub API.
///
/// Results are cached in the client's `Context` for `RATE_LIMIT_TTL_SECS`.
///
/// GitHub API docs: https://developer.github.com/v3/rate_limit/
pub struct RateLimitClient<'a> {
    inner: &'a Client,
}

impl<'a> RateLimitClient<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { inner: client }
    }

    /// Current rate limit status, served from cache while it is fresh.
    /// Note: Accessing this endpoint does not count against your REST API rate limit.
    pub fn snapshot(&self) -> Result<RateLimitSnapshot> {
        let context = self.inner.context();
        let mut cached = context.rate_limits();

        if let Some(snapshot) = cached.as_ref() {
            if snapshot.is_fresh(context.now()) {
                return Ok(snapshot.clone());
            }
        }

        let snapshot = self.fetch()?;
        *cached = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Bypass the cache and replace it with a freshly fetched snapshot
    pub fn refresh(&self) -> Result<RateLimitSnapshot> {
        let context = self.inner.context();
        let mut cached = context.rate_limits();
        let snapshot = self.fetch()?;
        *cached = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn fetch(&self) -> Result<RateLimitSnapshot> {
        let mut body = self
            .inner
            .execute(Request::new(Method::GET, "rate_limit"))?
            .into_inner();

        // `rate` duplicates `resources.core` and is deprecated
        if let Some(object) = body.as_object_mut() {
            object.remove("rate");
        }

        let response: RateLimitResponse = serde_json::from_value(body)?;
        let snapshot = RateLimitSnapshot {
            core: response.resources.core,
            search: response.resources.search,
            fetched_at: self.inner.context().now(),
        };
        debug!(
            "rate limit: core {}/{}, search {}/{}",
            snapshot.core.remaining,
            snapshot.core.limit,
            snapshot.search.remaining,
            snapshot.search.limit
        );

        Ok(snapshot)
    }

    pub fn core_limit(&self) -> Result<u64> {
        Ok(self.snapshot()?.core.limit)
    }

    pub fn core_remaining(&self) -> Result<u64> {
        Ok(self.snapshot()?.core.remaining)
    }

    pub fn core_percent_used(&self) -> Result<u64> {
        Ok(self.snapshot()?.core.percent_used())
    }

    pub fn core_seconds_until_reset(&self) -> Result<i64> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.core.seconds_until_reset(self.inner.context().now()))
    }

    pub fn search_limit(&self) -> Result<u64> {
        Ok(self.snapshot()?.search.limit)
    }

    pub fn search_remaining(&self) -> Result<u64> {
        Ok(self.snapshot()?.search.remaining)
    }

    pub fn search_percent_used(&self) -> Result<u64> {
        Ok(self.snapshot()?.search.percent_used())
    }

    pub fn search_seconds_until_reset(&self) -> Result<i64> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.search.seconds_until_reset(self.inner.context().now()))
    }

    /// Whether the core limit looks like the unauthenticated one
    pub fn is_anonymous_quota(&self) -> Result<bool> {
        Ok(self.snapshot()?.core.limit < ANONYMOUS_CORE_CEILING)
    }

    pub fn is_authenticated_quota(&self) -> Result<bool> {
        Ok(self.snapshot()?.core.limit == AUTHENTICATED_CORE_LIMIT)
    }
}
