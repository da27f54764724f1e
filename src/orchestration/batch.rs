//! Bounded-concurrency work pool for operator-triggered batches.
//!
//! A fixed set of workers pull from a shared cursor rather than a static
//! partition, so one slow item never leaves other workers idle.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// An item whose operation panicked. The batch records it as that item's
/// failure and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch item panicked: {message}")]
pub struct ItemPanicked {
    pub message: String,
}

impl ItemPanicked {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }
}

impl From<ItemPanicked> for String {
    fn from(panic: ItemPanicked) -> Self {
        panic.to_string()
    }
}

/// Snapshot of batch progress passed to the progress callback after every
/// completed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct BatchReport<I, T, E> {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per input item, in input order.
    pub results: Vec<(I, Result<T, E>)>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: usize,
}

impl BatchRunner {
    /// Concurrency below 1 is raised to 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `op` over every item with at most `concurrency` in flight.
    ///
    /// A failing or panicking item is recorded and the batch carries on. `on_progress` is
    /// called once per completed item with a strictly increasing `completed`;
    /// the final call has `completed == total`.
    pub async fn run<I, T, E, F, Fut, P>(&self, items: Vec<I>, op: F, on_progress: P) -> BatchReport<I, T, E>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ItemPanicked>,
        P: Fn(BatchProgress),
    {
        let total = items.len();
        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<Result<T, E>>>> =
            Mutex::new((0..total).map(|_| None).collect());
        let progress = Mutex::new(BatchProgress {
            completed: 0,
            total,
            succeeded: 0,
            failed: 0,
        });

        let (items_ref, cursor, slots_ref, progress_ref, op, on_progress) =
            (&items, &cursor, &slots, &progress, &op, &on_progress);
        let worker = || async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items_ref.get(index) else {
                    break;
                };
                let outcome = match AssertUnwindSafe(async { op(item.clone()).await })
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let panic = ItemPanicked::from_payload(payload.as_ref());
                        warn!(index, error = %panic, "Batch item panicked");
                        Err(E::from(panic))
                    }
                };
                let ok = outcome.is_ok();

                if let Ok(mut slots) = slots_ref.lock() {
                    slots[index] = Some(outcome);
                }
                // Callback under the lock keeps `completed` monotonic.
                if let Ok(mut p) = progress_ref.lock() {
                    p.completed += 1;
                    if ok {
                        p.succeeded += 1;
                    } else {
                        p.failed += 1;
                    }
                    on_progress(*p);
                }
            }
        };

        let workers = self.concurrency.min(total);
        futures::future::join_all((0..workers).map(|_| worker())).await;

        let slots = slots.into_inner().unwrap_or_else(|e| e.into_inner());
        let mut succeeded = 0;
        let mut failed = 0;
        let results = items
            .into_iter()
            .zip(slots)
            .filter_map(|(item, slot)| slot.map(|outcome| (item, outcome)))
            .inspect(|(_, outcome)| {
                if outcome.is_ok() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
            })
            .collect();

        BatchReport {
            total,
            succeeded,
            failed,
            results,
        }
    }
}
