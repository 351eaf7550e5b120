//! Bounded-parallelism batch runner.
//!
//! Inputs are processed in chunks of `limit`; every member of a chunk runs
//! concurrently and the whole chunk settles before the next one starts.
//! The output keeps input order and length, with `None` in the slot of any
//! item that failed or panicked.

use anyhow::Result;
use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Runs a per-item async operation with at most `limit` in flight.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    limit: usize,
}

impl BatchExecutor {
    /// A window of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Execute `op` over `inputs`.
    ///
    /// A failing item never cancels its siblings or aborts the batch.
    pub async fn run<I, T, F, Fut>(&self, inputs: Vec<I>, op: F) -> Vec<Option<T>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = inputs.len();
        let mut results = Vec::with_capacity(total);
        let mut inputs = inputs.into_iter().enumerate().peekable();

        while inputs.peek().is_some() {
            let chunk: Vec<_> = inputs
                .by_ref()
                .take(self.limit)
                .map(|(index, input)| {
                    let fut = op(input);
                    async move { (index, AssertUnwindSafe(fut).catch_unwind().await) }
                })
                .collect();

            for (index, outcome) in join_all(chunk).await {
                let slot = match outcome {
                    Ok(Ok(value)) => Some(value),
                    Ok(Err(e)) => {
                        warn!(item = index, error = %e, "Batch item failed");
                        None
                    }
                    Err(_) => {
                        warn!(item = index, "Batch item panicked");
                        None
                    }
                };
                results.push(slot);
            }
        }

        debug!(
            total,
            succeeded = results.iter().filter(|r| r.is_some()).count(),
            limit = self.limit,
            "Batch complete"
        );

        results
    }
}
