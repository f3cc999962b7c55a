use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::env::ENV_CONFIG;

/// A wrapper around a Future which logs how long it took to resolve when `LOG_PERF` is set.
#[pin_project]
pub struct Timed<Fut>
where
    Fut: Future,
{
    #[pin]
    inner: Fut,
    name: &'static str,
    start: Option<Instant>,
}

impl<Fut> Future for Timed<Fut>
where
    Fut: Future,
{
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let this = self.project();
        // The clock starts on first poll, not on construction.
        let start = this.start.get_or_insert_with(Instant::now);

        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(v) => {
                if ENV_CONFIG.log_perf {
                    let elapsed = start.elapsed();
                    tracing::debug!(
                        name = *this.name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "timed future resolved"
                    );
                }
                Poll::Ready(v)
            }
        }
    }
}

pub trait TimedExt: Sized + Future {
    fn timed(self, name: &'static str) -> Timed<Self> {
        Timed {
            inner: self,
            name,
            start: None,
        }
    }
}

impl<F: Future> TimedExt for F {}
