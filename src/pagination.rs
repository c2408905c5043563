use futures::Stream;
use url::Url;

use crate::{
    retry::execute_with_retry, scope::OperationScope, HttpResponse, LinkHeader, PaginationPolicy,
    RequestTemplate, ResilientError, Result, RetryListener, RetryPolicy, Transport,
};

/// Walks a Link-header paginated resource one page at a time.
///
/// Pages are fetched strictly in order since each page's URL comes from the
/// previous response. Every page goes through the retry engine.
pub(crate) struct PageCursor<'a, T: Transport> {
    transport: &'a T,
    listener: Option<&'a dyn RetryListener>,
    request: RequestTemplate,
    retry: RetryPolicy,
    pagination: PaginationPolicy,
    scope: OperationScope,
    next_url: Option<Url>,
    fetched: u32,
}

impl<'a, T: Transport> PageCursor<'a, T> {
    pub(crate) fn new(
        transport: &'a T,
        listener: Option<&'a dyn RetryListener>,
        first_url: Url,
        request: RequestTemplate,
        retry: RetryPolicy,
        pagination: PaginationPolicy,
        scope: OperationScope,
    ) -> Self {
        Self {
            transport,
            listener,
            request,
            retry,
            pagination,
            scope,
            next_url: Some(first_url),
            fetched: 0,
        }
    }

    /// Fetches the next page, or returns `Ok(None)` once pagination is over.
    pub(crate) async fn next_page(&mut self) -> Result<Option<T::Response>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        self.scope.arm();

        let pause = self.pagination.inter_page_pause();
        if self.fetched > 0 && !pause.is_zero() {
            self.scope.sleep(pause).await?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, page = self.fetched + 1, "fetching page");

        let response = execute_with_retry(
            self.transport,
            &url,
            &self.request,
            &self.retry,
            self.listener,
            &self.scope,
        )
        .await?;
        self.fetched += 1;

        if self.pagination.max_pages.is_some_and(|max| self.fetched >= max) {
            return Ok(Some(response));
        }
        if !response.status().is_success() {
            #[cfg(feature = "tracing")]
            tracing::debug!(%url, status = response.status().as_u16(), "stopping pagination");
            return Ok(Some(response));
        }

        self.next_url = self.discover_next(&url, response.headers())?;
        Ok(Some(response))
    }

    pub(crate) async fn collect(mut self) -> Result<Vec<T::Response>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }

    pub(crate) fn into_stream(self) -> impl Stream<Item = Result<T::Response>> + 'a {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await?;
            Ok::<_, ResilientError>(page.map(|page| (page, cursor)))
        })
    }

    fn discover_next(&self, url: &Url, headers: &http::HeaderMap) -> Result<Option<Url>> {
        let links = match LinkHeader::from_headers(headers) {
            Ok(links) => links,
            Err(err) => return self.bad_link(url, err.to_string()),
        };

        if let Some(resolver) = &self.pagination.next_page {
            return Ok(resolver.resolve(url, links.as_ref()));
        }

        let Some(target) = links.as_ref().and_then(|links| links.get("next")) else {
            return Ok(None);
        };
        match url.join(target) {
            Ok(next) => Ok(Some(next)),
            Err(err) => self.bad_link(url, format!("cannot resolve next link '{target}': {err}")),
        }
    }

    fn bad_link(&self, url: &Url, reason: String) -> Result<Option<Url>> {
        if self.pagination.fail_on_bad_link_header {
            return Err(ResilientError::BadLinkHeader {
                url: url.clone(),
                reason,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(%url, %reason, "malformed link header, stopping pagination");
        Ok(None)
    }
}
