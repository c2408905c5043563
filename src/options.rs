use std::{fmt, sync::Arc, time::Duration};

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{LinkHeader, ResilientError, Result};

/// Custom retry predicate: `(status, standard_retryable) -> retry`.
///
/// When installed, its result replaces the built-in status classification.
#[derive(Clone)]
pub struct RetryCondition(Arc<dyn Fn(u16, bool) -> bool + Send + Sync>);

impl RetryCondition {
    pub fn new(condition: impl Fn(u16, bool) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(condition))
    }

    pub(crate) fn evaluate(&self, status: u16, standard: bool) -> bool {
        (self.0)(status, standard)
    }
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryCondition(<fn>)")
    }
}

/// Custom next-page lookup: `(current_url, links) -> next_url`.
#[derive(Clone)]
pub struct NextPageResolver(Arc<dyn Fn(&Url, Option<&LinkHeader>) -> Option<Url> + Send + Sync>);

impl NextPageResolver {
    pub fn new(
        resolver: impl Fn(&Url, Option<&LinkHeader>) -> Option<Url> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(resolver))
    }

    pub(crate) fn resolve(&self, current: &Url, links: Option<&LinkHeader>) -> Option<Url> {
        (self.0)(current, links)
    }
}

impl fmt::Debug for NextPageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NextPageResolver(<fn>)")
    }
}

/// Configures retry behavior for a single logical request.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Exponential growth factor between retries, at least `1.0`.
    pub backoff_multiplier: f64,
    /// Base delay in milliseconds; must be below `delay_max_ms`.
    pub delay_min_ms: u64,
    /// Upper bound on computed backoff delays in milliseconds.
    pub delay_max_ms: u64,
    /// `0.0` disables jitter, `1.0` draws from the full `[0, delay]` range.
    pub jitter_factor: f64,
    /// Give up instead of waiting when the server asks for a longer delay.
    pub max_retry_after_ms: Option<u64>,
    /// Overrides the standard retryable-status classification.
    #[serde(skip)]
    pub condition: Option<RetryCondition>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_multiplier: 2.0,
            delay_min_ms: 1_000,
            delay_max_ms: 60_000,
            jitter_factor: 1.0,
            max_retry_after_ms: None,
            condition: None,
        }
    }
}

impl RetryPolicy {
    /// Policy that sends exactly one request.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Installs a custom retry predicate.
    pub fn with_condition(
        mut self,
        condition: impl Fn(u16, bool) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(RetryCondition::new(condition));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ResilientError::config(
                "retry.backoff_multiplier",
                format!("must be a finite number >= 1, got {}", self.backoff_multiplier),
            ));
        }
        if self.delay_min_ms == 0 {
            return Err(ResilientError::config("retry.delay_min_ms", "must be positive"));
        }
        if self.delay_max_ms == 0 {
            return Err(ResilientError::config("retry.delay_max_ms", "must be positive"));
        }
        if self.delay_min_ms >= self.delay_max_ms {
            return Err(ResilientError::config(
                "retry.delay_min_ms",
                format!(
                    "must be less than retry.delay_max_ms ({} >= {})",
                    self.delay_min_ms, self.delay_max_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ResilientError::config(
                "retry.jitter_factor",
                format!("must be within [0, 1], got {}", self.jitter_factor),
            ));
        }
        if self.max_retry_after_ms == Some(0) {
            return Err(ResilientError::config(
                "retry.max_retry_after_ms",
                "must be positive when set",
            ));
        }
        Ok(())
    }

    pub(crate) fn delay_min(&self) -> Duration {
        Duration::from_millis(self.delay_min_ms)
    }

    pub(crate) fn delay_max(&self) -> Duration {
        Duration::from_millis(self.delay_max_ms)
    }
}

/// Configures how Link-header pagination discovers and bounds pages.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationPolicy {
    /// Maximum number of pages to fetch; `None` follows links until exhausted.
    pub max_pages: Option<u32>,
    /// Pause between consecutive page requests in milliseconds.
    pub inter_page_pause_ms: u64,
    /// Fail the whole operation on a malformed `Link` header instead of
    /// stopping with the pages fetched so far.
    pub fail_on_bad_link_header: bool,
    /// Replaces the default `rel="next"` lookup.
    #[serde(skip)]
    pub next_page: Option<NextPageResolver>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            max_pages: None,
            inter_page_pause_ms: 0,
            fail_on_bad_link_header: true,
            next_page: None,
        }
    }
}

impl PaginationPolicy {
    /// Installs a custom next-page resolver.
    pub fn with_next_page(
        mut self,
        resolver: impl Fn(&Url, Option<&LinkHeader>) -> Option<Url> + Send + Sync + 'static,
    ) -> Self {
        self.next_page = Some(NextPageResolver::new(resolver));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_pages == Some(0) {
            return Err(ResilientError::config(
                "pagination.max_pages",
                "must be positive when set",
            ));
        }
        Ok(())
    }

    pub(crate) fn inter_page_pause(&self) -> Duration {
        Duration::from_millis(self.inter_page_pause_ms)
    }
}

/// Configures retry, pagination and overall timeout behavior.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    pub retry: RetryPolicy,
    pub pagination: PaginationPolicy,
    /// Overall timeout for one operation (all attempts, waits and pages),
    /// in milliseconds. Ignored when the caller supplies a cancellation
    /// token.
    pub timeout_ms: Option<u64>,
}

impl ClientOptions {
    /// Parses options from JSON, rejecting unknown fields.
    ///
    /// ```
    /// use resilient_http::ClientOptions;
    ///
    /// let opts = ClientOptions::from_json(r#"{"retry": {"max_retries": 2}}"#).unwrap();
    /// assert_eq!(opts.retry.max_retries, 2);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|err| ResilientError::config("options", err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        self.pagination.validate()?;
        validate_timeout(self.timeout_ms)
    }
}

/// Per-call overrides. Unset fields fall back to the client's options.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub retry: Option<RetryPolicy>,
    pub pagination: Option<PaginationPolicy>,
    pub timeout_ms: Option<u64>,
    /// Caller-owned cancellation signal. When present the overall timeout
    /// is not applied.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn pagination(mut self, policy: PaginationPolicy) -> Self {
        self.pagination = Some(policy);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(pagination) = &self.pagination {
            pagination.validate()?;
        }
        validate_timeout(self.timeout_ms)
    }
}

fn validate_timeout(timeout_ms: Option<u64>) -> Result<()> {
    if timeout_ms == Some(0) {
        return Err(ResilientError::config("timeout_ms", "must be positive when set"));
    }
    Ok(())
}
