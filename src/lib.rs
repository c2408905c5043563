//! `resilient-http` adds retry with backoff and Link-header pagination on top
//! of an HTTP transport (a `reqwest::Client` by default).
//!
//! - [`ResilientClient::send`] retries transient statuses (408, 429, 5xx)
//!   using server hints (`Retry-After`) or jittered exponential backoff.
//! - [`ResilientClient::paginate`] follows `rel="next"` links page by page,
//!   retrying each page independently.
//! - [`ResilientClient::pages`] streams the same pages as they arrive.
//!
//! HTTP error statuses are returned as ordinary responses; only transport
//! failures, cancellation, timeouts and invalid configuration are errors.
//!
//! ```no_run
//! use resilient_http::{ClientOptions, RequestTemplate, ResilientClient};
//!
//! # async fn run() -> resilient_http::Result<()> {
//! let client = ResilientClient::new().with_options(ClientOptions::default())?;
//! let pages = client
//!     .paginate("https://api.example.com/items", RequestTemplate::get())
//!     .await?;
//! println!("fetched {} pages", pages.len());
//! # Ok(())
//! # }
//! ```

pub mod backoff;
mod client;
mod error;
mod event;
pub mod hint;
mod link;
mod options;
mod pagination;
pub mod retry;
mod scope;
mod transport;

#[cfg(test)]
mod testing;

pub use client::ResilientClient;
pub use error::{BoxError, ResilientError};
pub use event::{RetryEvent, RetryListener};
pub use link::{LinkEntry, LinkHeader, LinkParseError};
pub use options::{
    CallOptions, ClientOptions, NextPageResolver, PaginationPolicy, RetryCondition, RetryPolicy,
};
pub use retry::AttemptOutcome;
pub use transport::{HttpResponse, RequestTemplate, Transport};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ResilientError>;
