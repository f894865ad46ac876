//! Bounded worker pool with failure containment.
//!
//! [`WorkerPool::run_n`] is the fan-out primitive every stage of a run goes
//! through. It submits `count` invocations of a task, runs at most `width` of
//! them at once, and collects the values of those that succeed.
//!
//! # Contract
//!
//! - Results arrive in **completion order**. `results[i]` is not the output of
//!   invocation `i`.
//! - A failing invocation (an `Err` or a panic) is logged and contributes
//!   nothing. It never cancels its siblings.
//! - Every invocation settles before `run_n` returns. There is no cancellation.
//! - Zero successes is `Ok(vec![])`. `Err` is reserved for the pool itself
//!   being unusable.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Failure of the pool itself, as opposed to one of its tasks.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was closed; some invocations could not be scheduled.
    #[error("Worker pool closed: {unscheduled} of {submitted} `{task}` invocations never ran")]
    Closed {
        task: &'static str,
        submitted: usize,
        unscheduled: usize,
    },
}

/// Outcome of a single invocation.
enum Invocation<T, E> {
    Done(T),
    Failed { index: usize, error: E },
    Unscheduled,
}

/// A fixed-width pool shared by every stage of a run.
#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    width: usize,
}

impl WorkerPool {
    /// Create a pool running at most `width` invocations at once.
    ///
    /// A width of zero is raised to one.
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            permits: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    /// Maximum number of concurrently running invocations.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Stop scheduling. Invocations submitted afterwards never run.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Run `count` invocations of `task` and return the successful values.
    ///
    /// `task` is called once per invocation, in submission order, with the
    /// invocation index. It builds the future synchronously, so it may draw
    /// per-invocation arguments from state it borrows mutably (an RNG, for
    /// instance). The future only starts once a worker slot is free.
    pub async fn run_n<F, Fut, T, E>(
        &self,
        name: &'static str,
        count: usize,
        mut task: F,
    ) -> Result<Vec<T>, PoolError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let mut set = JoinSet::new();

        for index in 0..count {
            let permits = Arc::clone(&self.permits);
            let invocation = task(index);
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Invocation::Unscheduled;
                };
                match invocation.await {
                    Ok(value) => Invocation::Done(value),
                    Err(error) => Invocation::Failed { index, error },
                }
            });
        }

        let mut results = Vec::new();
        let mut failed = 0usize;
        let mut unscheduled = 0usize;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Invocation::Done(value)) => results.push(value),
                Ok(Invocation::Failed { index, error }) => {
                    failed += 1;
                    warn!(task = name, index, %error, "Task invocation failed");
                }
                Ok(Invocation::Unscheduled) => unscheduled += 1,
                Err(e) => {
                    failed += 1;
                    warn!(task = name, error = %e, "Task invocation panicked");
                }
            }
        }

        debug!(
            task = name,
            submitted = count,
            succeeded = results.len(),
            failed,
            "Batch drained"
        );

        if unscheduled > 0 {
            return Err(PoolError::Closed {
                task: name,
                submitted: count,
                unscheduled,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_all_invocations_succeed() {
        let pool = WorkerPool::new(4);
        let results = pool
            .run_n("square", 10, |i| async move { Ok::<_, String>(i * i) })
            .await
            .unwrap();

        let got: HashSet<usize> = results.into_iter().collect();
        let expected: HashSet<usize> = (0..10).map(|i| i * i).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_always_failing_task_yields_empty() {
        let pool = WorkerPool::new(3);
        let results: Vec<()> = pool
            .run_n("doomed", 5, |i| async move { Err(format!("boom {}", i)) })
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(logs_contain("Task invocation failed"));
    }

    #[tokio::test]
    async fn test_mixed_outcomes_keep_only_successes() {
        let pool = WorkerPool::new(2);
        let mut results = pool
            .run_n("odd_only", 9, |i| async move {
                if i % 2 == 1 {
                    Ok(i)
                } else {
                    Err("even")
                }
            })
            .await
            .unwrap();

        results.sort_unstable();
        assert_eq!(results, vec![1, 3, 5, 7]);
    }

    #[tokio::test]
    async fn test_panicking_invocation_is_contained() {
        let pool = WorkerPool::new(2);
        let results = pool
            .run_n("panicky", 4, |i| async move {
                if i == 2 {
                    panic!("invocation {} exploded", i);
                }
                Ok::<_, String>(i)
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(!results.contains(&2));
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let pool = WorkerPool::new(3);
        let results = pool
            .run_n("staggered", 3, |i| async move {
                // First submitted finishes last
                tokio::time::sleep(Duration::from_millis(150 - 70 * i as u64)).await;
                Ok::<_, String>(i)
            })
            .await
            .unwrap();

        assert_eq!(results, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_width_bounds_concurrency() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = pool
            .run_n("bounded", 8, |_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 8);
        // Saturated but never exceeded
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(pool.width(), 2);
    }

    #[tokio::test]
    async fn test_zero_count_is_empty() {
        let pool = WorkerPool::new(1);
        let results = pool
            .run_n("nothing", 0, |_| async { Ok::<u8, String>(1) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_width_is_raised_to_one() {
        assert_eq!(WorkerPool::new(0).width(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_is_a_pool_error() {
        let pool = WorkerPool::new(2);
        pool.close();
        let err = pool
            .run_n("late", 3, |i| async move { Ok::<_, String>(i) })
            .await
            .unwrap_err();

        match err {
            PoolError::Closed {
                task,
                submitted,
                unscheduled,
            } => {
                assert_eq!(task, "late");
                assert_eq!(submitted, 3);
                assert_eq!(unscheduled, 3);
            }
        }
    }

    #[tokio::test]
    async fn test_pool_is_reusable_across_batches() {
        let pool = WorkerPool::new(2);
        let first = pool
            .run_n("first", 3, |i| async move { Ok::<_, String>(i) })
            .await
            .unwrap();
        let second = pool
            .run_n("second", 2, |i| async move { Ok::<_, String>(i + 10) })
            .await
            .unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
    }
}
