//! Bounded fan-out over independent units of work.
//!
//! At most `limit` units run at once. Results come back in input order no
//! matter which unit finishes first. A failing unit is logged and recorded
//! in its slot; a cancellation aborts the whole batch and drops every unit
//! still in flight.

use std::fmt::Display;
use std::future::Future;

use creel_jobs::Cancellable;
use futures::stream::{FuturesUnordered, StreamExt};

/// Concurrency limiter for one pipeline phase.
#[derive(Debug, Clone, Copy)]
pub struct BoundedPool {
    limit: usize,
}

impl BoundedPool {
    /// Create a pool running at most `limit` units (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Maximum number of concurrent units.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `work` over every item.
    ///
    /// Returns one outcome per item, positionally aligned with the input.
    /// The first cancellation error seen is returned instead, and nothing
    /// else is awaited.
    pub async fn run<I, F, Fut, T, E>(
        &self,
        items: I,
        mut work: F,
    ) -> std::result::Result<Vec<std::result::Result<T, E>>, E>
    where
        I: IntoIterator,
        F: FnMut(usize, I::Item) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Cancellable + Display,
    {
        let mut running = FuturesUnordered::new();
        let mut finished = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            while running.len() >= self.limit {
                if let Some((done, outcome)) = running.next().await {
                    finished.push(Self::record(done, outcome)?);
                }
            }

            let unit = work(index, item);
            running.push(async move { (index, unit.await) });
        }

        while let Some((done, outcome)) = running.next().await {
            finished.push(Self::record(done, outcome)?);
        }

        finished.sort_by_key(|(index, _)| *index);
        Ok(finished.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Like [`run`](Self::run), substituting `fallback` for failed units.
    pub async fn run_or<I, F, Fut, T, E, D>(
        &self,
        items: I,
        work: F,
        fallback: D,
    ) -> std::result::Result<Vec<T>, E>
    where
        I: IntoIterator,
        F: FnMut(usize, I::Item) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Cancellable + Display,
        D: Fn(usize, &E) -> T,
    {
        let outcomes = self.run(items, work).await?;
        Ok(outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| outcome.unwrap_or_else(|e| fallback(index, &e)))
            .collect())
    }

    #[allow(clippy::type_complexity)]
    fn record<T, E>(
        index: usize,
        outcome: std::result::Result<T, E>,
    ) -> std::result::Result<(usize, std::result::Result<T, E>), E>
    where
        E: Cancellable + Display,
    {
        match outcome {
            Err(e) if e.is_cancellation() => {
                tracing::info!("Batch aborted at unit {}: {}", index, e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Unit {} failed: {}", index, e);
                Ok((index, Err(e)))
            }
            Ok(value) => Ok((index, Ok(value))),
        }
    }
}
