use std::{future::Future, time::Duration};

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::{ResilientError, Result};

/// Cancellation signal and deadline shared by every suspension point of one
/// top-level operation.
#[derive(Clone, Debug)]
pub(crate) struct OperationScope {
    token: CancellationToken,
    timeout_ms: Option<u64>,
    deadline: Option<Instant>,
}

impl OperationScope {
    /// A caller-supplied token takes precedence: the timeout is then ignored.
    /// The deadline starts counting immediately.
    pub(crate) fn new(caller: Option<CancellationToken>, timeout_ms: Option<u64>) -> Self {
        let mut scope = Self::deferred(caller, timeout_ms);
        scope.arm();
        scope
    }

    /// Like [`new`](Self::new), but the deadline only starts at [`arm`](Self::arm).
    pub(crate) fn deferred(caller: Option<CancellationToken>, timeout_ms: Option<u64>) -> Self {
        match caller {
            Some(token) => Self {
                token,
                timeout_ms: None,
                deadline: None,
            },
            None => Self {
                token: CancellationToken::new(),
                timeout_ms,
                deadline: None,
            },
        }
    }

    /// Starts the timeout clock. Later calls keep the first deadline.
    pub(crate) fn arm(&mut self) {
        if self.deadline.is_none() {
            self.deadline = self
                .timeout_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms));
        }
    }

    /// Drives `fut` unless the operation is cancelled or out of time first,
    /// in which case `fut` is dropped.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("operation cancelled");
                Err(ResilientError::Cancelled)
            }
            _ = deadline => {
                let timeout_ms = self.timeout_ms.unwrap_or_default();
                #[cfg(feature = "tracing")]
                tracing::debug!(timeout_ms, "operation timed out");
                Err(ResilientError::Timeout { timeout_ms })
            }
            result = fut => result,
        }
    }

    pub(crate) async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_signal() {
        let scope = OperationScope::new(None, None);
        scope
            .sleep(Duration::from_secs(30))
            .await
            .expect("sleep must finish");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_sleep() {
        let scope = OperationScope::new(None, Some(1_500));
        let err = scope
            .sleep(Duration::from_secs(30))
            .await
            .expect_err("deadline must fire first");
        assert!(matches!(err, ResilientError::Timeout { timeout_ms: 1_500 }));
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_deadline_starts_when_armed() {
        let mut scope = OperationScope::deferred(None, Some(1_500));
        tokio::time::sleep(Duration::from_secs(10)).await;
        scope
            .sleep(Duration::from_secs(5))
            .await
            .expect("unarmed scope has no deadline");

        scope.arm();
        scope
            .sleep(Duration::from_secs(1))
            .await
            .expect("deadline is 1.5s after arming");
        scope.arm();
        let err = scope
            .sleep(Duration::from_secs(1))
            .await
            .expect_err("re-arming must not extend the deadline");
        assert!(matches!(err, ResilientError::Timeout { timeout_ms: 1_500 }));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_token_overrides_timeout() {
        let token = CancellationToken::new();
        let scope = OperationScope::new(Some(token.clone()), Some(10));
        scope
            .sleep(Duration::from_secs(5))
            .await
            .expect("timeout must be ignored when a token is supplied");

        token.cancel();
        let err = scope
            .sleep(Duration::from_secs(5))
            .await
            .expect_err("cancelled token must abort");
        assert!(matches!(err, ResilientError::Cancelled));
    }
}
