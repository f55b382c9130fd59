use std::future::Future;

use crawl_core::WorkUnit;
use engine_logging::engine_debug;
use futures_util::stream::{self, StreamExt};

/// Maps an operation over work units with at most `concurrency` in flight.
///
/// Results come back in the order the units were given, no matter which
/// finished first, and there is exactly one result per unit.
/// Operations return plain values; anything that can fail should encode the
/// failure in its output so one unit never affects another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRunner {
    concurrency: usize,
}

impl PhaseRunner {
    /// A `concurrency` of zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run<T, R, F, Fut>(&self, units: Vec<WorkUnit<T>>, operation: F) -> Vec<R>
    where
        F: FnMut(WorkUnit<T>) -> Fut,
        Fut: Future<Output = R>,
    {
        self.run_observed(units, operation, |_, _| {}).await
    }

    /// Like [`PhaseRunner::run`], calling `observe` with the unit's position in
    /// `units` and its result as each unit completes.
    pub async fn run_observed<T, R, F, Fut, O>(
        &self,
        units: Vec<WorkUnit<T>>,
        mut operation: F,
        mut observe: O,
    ) -> Vec<R>
    where
        F: FnMut(WorkUnit<T>) -> Fut,
        Fut: Future<Output = R>,
        O: FnMut(usize, &R),
    {
        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(units.len()).collect();
        engine_debug!(
            "running {} units with concurrency {}",
            units.len(),
            self.concurrency
        );

        let completions = stream::iter(units.into_iter().enumerate().map(|(position, unit)| {
            let pending = operation(unit);
            async move { (position, pending.await) }
        }))
        .buffer_unordered(self.concurrency);
        let mut completions = std::pin::pin!(completions);

        while let Some((position, result)) = completions.next().await {
            observe(position, &result);
            slots[position] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }
}
