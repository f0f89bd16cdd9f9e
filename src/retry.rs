//! Client-side retry policy.
//!
//! Wraps a fallible async call and re-invokes it on transport errors, up
//! to a bounded number of times, sleeping between attempts. A streaming
//! call only retries before its first element reaches the consumer: once
//! values have flowed, a failure propagates rather than silently
//! re-running the command and risking duplicate delivery.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use tracing::warn;

use crate::error::Error;
use crate::value::Value;

/// `count` of `-1` means unlimited retries; `0` means none.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub count: i64,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy { count: 0, interval: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(count: i64, interval: Duration) -> RetryPolicy {
        RetryPolicy { count, interval }
    }

    fn exhausted(&self, retries: i64) -> bool {
        self.count >= 0 && retries >= self.count
    }

    /// A retryable error is a transport error; anything else (a
    /// `RemoteError`, a parameter mistake) is not retried.
    fn retryable(err: &Error) -> bool {
        err.is_transport()
    }

    /// Retry a unary call.
    pub async fn call<F, Fut, T>(&self, mut attempt: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut retries = 0i64;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if Self::retryable(&err) && !self.exhausted(retries) => {
                    retries += 1;
                    warn!(%err, retries, "retrying");
                    tokio::time::sleep(self.interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Retry a streaming call. Each attempt produces a fresh stream;
    /// retries happen only while no item has been pulled from it yet. The
    /// first successfully produced item is peeked and spliced back onto
    /// the front of the returned stream so the caller never loses it.
    pub async fn call_stream<F, Fut, S>(&self, mut attempt: F) -> Result<Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, Error>>,
        S: Stream<Item = Result<Value, Error>> + Send + 'static,
    {
        let mut retries = 0i64;
        loop {
            match attempt().await {
                Ok(stream) => {
                    let mut stream = Box::pin(stream);
                    match stream.next().await {
                        None => return Ok(Box::pin(futures_util::stream::empty())),
                        Some(Ok(first)) => {
                            let prefix = futures_util::stream::once(async move { Ok(first) });
                            return Ok(Box::pin(prefix.chain(stream)));
                        }
                        Some(Err(err)) if Self::retryable(&err) && !self.exhausted(retries) => {
                            retries += 1;
                            warn!(%err, retries, "retrying");
                            tokio::time::sleep(self.interval).await;
                        }
                        Some(Err(err)) => return Err(err),
                    }
                }
                Err(err) if Self::retryable(&err) && !self.exhausted(retries) => {
                    retries += 1;
                    warn!(%err, retries, "retrying");
                    tokio::time::sleep(self.interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn call_returns_immediately_on_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<i32, Error> = policy.call(|| async { Ok(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }

    #[tokio::test]
    async fn call_retries_transport_errors_up_to_count() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let attempts = AtomicI64::new(0);
        let result: Result<i32, Error> = policy
            .call(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TransportError::ReceiveInterrupted.into())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn call_gives_up_after_exhausting_retries() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let result: Result<i32, Error> = policy
            .call(|| async { Err::<i32, Error>(TransportError::ReceiveInterrupted.into()) })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn call_never_retries_non_transport_errors() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let attempts = AtomicI64::new(0);
        let result: Result<i32, Error> = policy
            .call(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Parameter("nope".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
