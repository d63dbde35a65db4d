//! Flood-wait handling: wrap any API call, sleep out server-demanded pauses,
//! retry with a capped policy.
//!
//! Installed at the gateway boundary so every outbound call is covered; the
//! direct `run` form is available to call sites that want explicit retries.

use crate::domain::{emit, DomainError, EngineEvent, EventSender};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Maximum retries after consecutive flood waits on one operation.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Added on top of every server-demanded wait.
const JITTER_FLOOR: Duration = Duration::from_millis(500);

/// Waits of at least this many seconds surface per-second progress events.
const PROGRESS_THRESHOLD_SECS: u64 = 10;

#[derive(Clone)]
pub struct RateLimiter {
    max_retries: u32,
    events: EventSender,
    cancel: CancellationToken,
}

impl RateLimiter {
    pub fn new(events: EventSender, cancel: CancellationToken) -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            events,
            cancel,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Run `f`, absorbing flood waits. Any other error is re-raised
    /// immediately; cancellation interrupts a pending wait.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            match f().await {
                Ok(value) => return Ok(value),
                Err(DomainError::FloodWait { seconds }) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(operation, attempt, "flood wait retries exhausted");
                        return Err(DomainError::FloodWait { seconds });
                    }
                    emit(
                        &self.events,
                        EngineEvent::FloodWaitDetected {
                            seconds,
                            operation: operation.to_string(),
                        },
                    );
                    warn!(operation, seconds, attempt, "flood wait, sleeping");
                    self.wait(seconds, operation).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep `seconds` plus the jitter floor, cancellable. Long waits emit a
    /// countdown event every second.
    async fn wait(&self, seconds: u64, operation: &str) -> Result<(), DomainError> {
        let total = Duration::from_secs(seconds) + JITTER_FLOOR;
        let deadline = tokio::time::Instant::now() + total;

        if seconds < PROGRESS_THRESHOLD_SECS {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DomainError::Cancelled),
                _ = tokio::time::sleep(total) => return Ok(()),
            }
        }

        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let remaining = deadline - now;
            emit(
                &self.events,
                EngineEvent::Progress {
                    op: "flood_wait".to_string(),
                    current: (total - remaining).as_secs(),
                    total: total.as_secs(),
                    description: format!(
                        "{}: waiting {}s for rate limit",
                        operation,
                        remaining.as_secs()
                    ),
                },
            );
            let step = remaining.min(Duration::from_secs(1));
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DomainError::Cancelled),
                _ = tokio::time::sleep(step) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_channel;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn limiter() -> (RateLimiter, crate::domain::EventReceiver, CancellationToken) {
        let (tx, rx) = event_channel();
        let cancel = CancellationToken::new();
        (RateLimiter::new(tx, cancel.clone()), rx, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_flood_wait_and_waits_long_enough() {
        let (limiter, mut rx, _cancel) = limiter();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let started = tokio::time::Instant::now();
        let out = limiter
            .run("send_media_group", move || {
                let calls = Arc::clone(&calls2);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(DomainError::FloodWait { seconds: 12 })
                    } else {
                        Ok(7u32)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(12));

        match rx.recv().await.unwrap() {
            EngineEvent::FloodWaitDetected { seconds, operation } => {
                assert_eq!(seconds, 12);
                assert_eq!(operation, "send_media_group");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // 12s wait crosses the progress threshold: countdown events follow.
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::Progress { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn short_wait_is_silent() {
        let (limiter, mut rx, _cancel) = limiter();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        limiter
            .run("forward_messages", move || {
                let calls = Arc::clone(&calls2);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(DomainError::FloodWait { seconds: 3 })
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        // Exactly one flood event, no countdown.
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::FloodWaitDetected { seconds: 3, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let (limiter, _rx, _cancel) = limiter();
        let limiter = limiter.with_max_retries(2);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let err = limiter
            .run("get_history", move || {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(DomainError::FloodWait { seconds: 1 })
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_flood_wait());
        // initial call + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_flood_errors_are_raised_immediately() {
        let (limiter, _rx, _cancel) = limiter();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let err = limiter
            .run("resolve", move || {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(DomainError::NotAccessible("kicked".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotAccessible(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let (limiter, _rx, cancel) = limiter();

        let task = tokio::spawn(async move {
            limiter
                .run("download_media", || async {
                    Err::<(), _>(DomainError::FloodWait { seconds: 600 })
                })
                .await
        });

        // Let the task enter its wait, then cancel.
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
    }
}
