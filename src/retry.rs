use std::time::Duration;

use http::StatusCode;
use url::Url;

use crate::{
    backoff::{compute_delay, DELAY_FLOOR},
    hint::read_retry_hint,
    scope::OperationScope,
    HttpResponse, RequestTemplate, Result, RetryEvent, RetryListener, RetryPolicy, Transport,
};

/// Classification of one attempt's response.
#[derive(Debug)]
pub enum AttemptOutcome<R> {
    Success(R),
    /// Worth retrying; carries the server's suggested delay, if any.
    RetryableFailure(R, Option<Duration>),
    TerminalFailure(R),
}

/// Statuses conventionally treated as transient.
pub fn is_standard_retryable(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        408 | 429 | 500 | 502 | 503 | 504 | 506 | 507 | 508
    )
}

/// Classifies a response. A custom condition replaces the standard
/// classification entirely.
pub fn classify<R: HttpResponse>(response: R, policy: &RetryPolicy) -> AttemptOutcome<R> {
    let status = response.status();
    let standard = is_standard_retryable(status);
    let retryable = match &policy.condition {
        Some(condition) => condition.evaluate(status.as_u16(), standard),
        None => standard,
    };

    if retryable {
        let hint = read_retry_hint(response.headers());
        AttemptOutcome::RetryableFailure(response, hint)
    } else if status.is_success() {
        AttemptOutcome::Success(response)
    } else {
        AttemptOutcome::TerminalFailure(response)
    }
}

/// Sends `request` to `url` until it succeeds, fails terminally or the retry
/// budget is spent, returning the last response. Only transport errors,
/// cancellation and timeout are reported as errors.
pub(crate) async fn execute_with_retry<T: Transport>(
    transport: &T,
    url: &Url,
    request: &RequestTemplate,
    policy: &RetryPolicy,
    listener: Option<&dyn RetryListener>,
    scope: &OperationScope,
) -> Result<T::Response> {
    let mut attempt = 0u32;
    loop {
        let response = scope.run(transport.send(url, request)).await?;

        let (response, hint) = match classify(response, policy) {
            AttemptOutcome::Success(response) | AttemptOutcome::TerminalFailure(response) => {
                return Ok(response)
            }
            AttemptOutcome::RetryableFailure(response, hint) => (response, hint),
        };

        if attempt >= policy.max_retries {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                %url,
                status = response.status().as_u16(),
                retries = attempt,
                "retry budget exhausted"
            );
            return Ok(response);
        }

        if let (Some(hint), Some(max_ms)) = (hint, policy.max_retry_after_ms) {
            if hint > Duration::from_millis(max_ms) {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    %url,
                    hint_ms = hint.as_millis() as u64,
                    max_ms,
                    "server retry hint exceeds limit, not retrying"
                );
                return Ok(response);
            }
        }

        let delay = match hint {
            Some(hint) => hint.max(DELAY_FLOOR),
            None => compute_delay(
                attempt,
                policy.delay_min(),
                policy.delay_max(),
                policy.backoff_multiplier,
                policy.jitter_factor,
                &mut rand::thread_rng(),
            ),
        };

        let event = RetryEvent {
            attempt: attempt + 1,
            max_retries: policy.max_retries,
            delay,
            status: response.status().as_u16(),
            status_text: response.status_text().to_owned(),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            %url,
            status = event.status,
            attempt = event.attempt,
            max_retries = event.max_retries,
            delay_ms = delay.as_millis() as u64,
            "retrying request"
        );

        if let Some(listener) = listener {
            listener.on_retry(&event);
        }

        drop(response);
        scope.sleep(delay).await?;
        attempt += 1;
    }
}
