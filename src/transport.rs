use std::{future::Future, time::Duration};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::Result;

/// Request description replayed for every attempt and every page.
///
/// Only the URL changes between pages; method, headers and body are reused.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Per-attempt timeout enforced by the transport.
    pub timeout: Option<Duration>,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestTemplate {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response metadata the retry and pagination engines look at.
/// Bodies are never read.
pub trait HttpResponse {
    fn status(&self) -> StatusCode;

    fn headers(&self) -> &HeaderMap;

    fn status_text(&self) -> &str {
        self.status().canonical_reason().unwrap_or("")
    }
}

impl HttpResponse for reqwest::Response {
    fn status(&self) -> StatusCode {
        reqwest::Response::status(self)
    }

    fn headers(&self) -> &HeaderMap {
        reqwest::Response::headers(self)
    }
}

impl<B> HttpResponse for http::Response<B> {
    fn status(&self) -> StatusCode {
        http::Response::status(self)
    }

    fn headers(&self) -> &HeaderMap {
        http::Response::headers(self)
    }
}

/// Sends one attempt of a request.
///
/// Implementations must not retry on their own; errors they return abort
/// the whole operation. Dropping the returned future cancels the attempt.
pub trait Transport: Send + Sync {
    type Response: HttpResponse + Send;

    fn send(
        &self,
        url: &Url,
        request: &RequestTemplate,
    ) -> impl Future<Output = Result<Self::Response>> + Send;
}

impl Transport for reqwest::Client {
    type Response = reqwest::Response;

    fn send(
        &self,
        url: &Url,
        request: &RequestTemplate,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        let mut builder = self
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        async move { builder.send().await.map_err(Into::into) }
    }
}
