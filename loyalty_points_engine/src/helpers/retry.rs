use std::{fmt::Display, future::Future, time::Duration};

use log::warn;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Retries an operation while a predicate classifies its error as transient.
///
/// The delay starts at the base delay and doubles up to the cap. Errors the
/// predicate rejects are surfaced immediately, as is the error of the final
/// attempt.
#[derive(Debug, Clone)]
pub struct Retrier {
    retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for Retrier {
    fn default() -> Self {
        Self { retries: DEFAULT_RETRIES, base_delay: DEFAULT_BASE_DELAY, max_delay: DEFAULT_MAX_DELAY }
    }
}

impl Retrier {
    pub fn new(retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { retries, base_delay, max_delay }
    }

    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut delay = self.base_delay;
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!("Transient failure (attempt {attempt}/{}), retrying in {delay:?}: {e}", self.retries);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use super::Retrier;

    fn fast_retrier() -> Retrier {
        Retrier::new(3, Duration::from_millis(1), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_retrier()
            .run(
                || async {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = fast_retrier()
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal")
                },
                |_| false,
            )
            .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = fast_retrier()
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("transient")
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("transient"));
        // initial attempt plus three retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
