use std::{fmt, sync::Arc};

use futures::{Stream, StreamExt};
use url::Url;

use crate::{
    pagination::PageCursor, retry::execute_with_retry, scope::OperationScope, CallOptions,
    ClientOptions, RequestTemplate, ResilientError, Result, RetryListener, Transport,
};

/// Retrying, paginating wrapper around a [`Transport`].
///
/// Options are validated when installed and never change while an operation
/// runs, so one client can serve many concurrent calls. All per-call state
/// (attempt counters, collected pages) lives inside the call.
#[derive(Clone)]
pub struct ResilientClient<T = reqwest::Client> {
    transport: T,
    options: ClientOptions,
    listener: Option<Arc<dyn RetryListener>>,
}

impl<T> fmt::Debug for ResilientClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("options", &self.options)
            .field("listener", &self.listener.as_ref().map(|_| "<listener>"))
            .finish()
    }
}

impl ResilientClient {
    /// Creates a client backed by a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::with_transport(reqwest::Client::new())
    }
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ResilientClient<T> {
    /// Creates a client around any transport, with default options.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            options: ClientOptions::default(),
            listener: None,
        }
    }

    /// Applies retry, pagination and timeout options.
    ///
    /// Fails fast on out-of-range values instead of clamping them.
    pub fn with_options(mut self, opts: ClientOptions) -> Result<Self> {
        opts.validate()?;
        self.options = opts;
        Ok(self)
    }

    /// Installs a listener notified before every retry wait.
    ///
    /// ```
    /// use resilient_http::{ResilientClient, RetryEvent};
    ///
    /// let client = ResilientClient::new().with_retry_listener(|event: &RetryEvent| {
    ///     eprintln!("retry {} in {:?}", event.attempt, event.delay);
    /// });
    /// ```
    pub fn with_retry_listener(mut self, listener: impl RetryListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a `GET` request with retries.
    pub async fn get(&self, url: &str) -> Result<T::Response> {
        self.send(url, RequestTemplate::get()).await
    }

    /// Sends a request with retries using the client's options.
    ///
    /// Non-success statuses are returned, not raised, once they are not
    /// retryable or the retry budget is spent.
    pub async fn send(&self, url: &str, request: RequestTemplate) -> Result<T::Response> {
        self.send_with(url, request, CallOptions::default()).await
    }

    /// Sends a request with retries, applying per-call overrides.
    pub async fn send_with(
        &self,
        url: &str,
        request: RequestTemplate,
        call: CallOptions,
    ) -> Result<T::Response> {
        call.validate()?;
        let url = parse_url(url)?;
        let retry = call.retry.as_ref().unwrap_or(&self.options.retry);
        let scope = self.scope(&call);

        execute_with_retry(
            &self.transport,
            &url,
            &request,
            retry,
            self.listener.as_deref(),
            &scope,
        )
        .await
    }

    /// Fetches every page of a Link-header paginated resource, in order.
    pub async fn paginate(&self, url: &str, request: RequestTemplate) -> Result<Vec<T::Response>> {
        self.paginate_with(url, request, CallOptions::default()).await
    }

    /// Like [`paginate`](Self::paginate), applying per-call overrides.
    ///
    /// Cancellation, timeout, transport errors and (when configured)
    /// malformed link headers fail the whole call; pages fetched before the
    /// failure are dropped.
    pub async fn paginate_with(
        &self,
        url: &str,
        request: RequestTemplate,
        call: CallOptions,
    ) -> Result<Vec<T::Response>> {
        self.cursor(url, request, call)?.collect().await
    }

    /// Streams pages as they are fetched.
    ///
    /// The stream ends after the last page or after yielding one error. The
    /// overall timeout starts when the stream is first polled.
    pub fn pages(
        &self,
        url: &str,
        request: RequestTemplate,
        call: CallOptions,
    ) -> impl Stream<Item = Result<T::Response>> + '_ {
        match self.cursor(url, request, call) {
            Ok(cursor) => cursor.into_stream().left_stream(),
            Err(err) => futures::stream::once(async move { Err(err) }).right_stream(),
        }
    }

    fn cursor(
        &self,
        url: &str,
        request: RequestTemplate,
        call: CallOptions,
    ) -> Result<PageCursor<'_, T>> {
        call.validate()?;
        let url = parse_url(url)?;
        let scope = OperationScope::deferred(
            call.cancellation.clone(),
            call.timeout_ms.or(self.options.timeout_ms),
        );
        let CallOptions {
            retry, pagination, ..
        } = call;

        Ok(PageCursor::new(
            &self.transport,
            self.listener.as_deref(),
            url,
            request,
            retry.unwrap_or_else(|| self.options.retry.clone()),
            pagination.unwrap_or_else(|| self.options.pagination.clone()),
            scope,
        ))
    }

    fn scope(&self, call: &CallOptions) -> OperationScope {
        OperationScope::new(
            call.cancellation.clone(),
            call.timeout_ms.or(self.options.timeout_ms),
        )
    }
}

fn parse_url(input: &str) -> Result<Url> {
    Url::parse(input).map_err(|source| ResilientError::InvalidUrl {
        url: input.to_owned(),
        source,
    })
}
