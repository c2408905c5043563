use url::Url;

/// Boxed error produced by a [`Transport`](crate::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
///
/// HTTP error statuses are never reported here: once retries are exhausted
/// (or the status is not retryable) the response is returned as-is.
#[derive(Debug, thiserror::Error)]
pub enum ResilientError {
    /// Network or request execution error from the transport.
    #[error("transport error: {0}")]
    Transport(BoxError),
    /// Invalid option value, rejected before any request is sent.
    #[error("invalid option `{field}`: {reason}")]
    Config {
        /// Canonical option name, e.g. `retry.delay_min_ms`.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A start URL or a next-page link could not be parsed.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Malformed `Link` header on a page, raised only when
    /// `fail_on_bad_link_header` is enabled.
    #[error("malformed link header on {url}: {reason}")]
    BadLinkHeader {
        /// URL of the page that carried the header.
        url: Url,
        reason: String,
    },
    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
    /// The operation's overall timeout expired.
    #[error("operation timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl ResilientError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the underlying `reqwest` error for transport failures raised
    /// by the default transport.
    pub fn as_reqwest(&self) -> Option<&reqwest::Error> {
        match self {
            Self::Transport(inner) => inner.downcast_ref::<reqwest::Error>(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ResilientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
