//! Bounded executor: run N independent work units with at most K in flight.
//!
//! Every pipeline stage reuses this primitive with a different per-unit
//! function. A semaphore permit is acquired in the dispatch loop before each
//! unit is spawned, so at most `concurrency` units are ever active; permits
//! are released automatically when a unit finishes (RAII). Join handles are
//! awaited in dispatch order, so the returned results correspond 1:1 to the
//! input sequence even though completion order is unconstrained.
//!
//! A unit's failure is its *result value* - the work function returns
//! whatever success-or-error type the stage defines, and one unit erroring
//! never aborts or blocks its peers. There is no global timeout here; each
//! unit carries its own deadline where one applies.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

/// Default admission bound per stage.
pub const DEFAULT_CONCURRENCY: usize = 128;

/// Error type for bounded execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be at least 1")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,

    /// A worker task panicked or was cancelled. Per-unit *errors* are result
    /// values and never surface here; this indicates a bug in the work fn.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Executes all `items` with at most `concurrency` in flight at any instant.
///
/// Returns one result per input item, in input order. Completion order may
/// differ; the result collection never loses or duplicates items.
///
/// # Errors
///
/// Returns [`ExecutorError::InvalidConcurrency`] if `concurrency` is zero,
/// [`ExecutorError::SemaphoreClosed`] if the admission semaphore is closed,
/// or [`ExecutorError::Join`] if a worker task panics.
pub async fn run_bounded<T, R, F, Fut>(
    concurrency: usize,
    items: Vec<T>,
    work: F,
) -> Result<Vec<R>, ExecutorError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    if concurrency == 0 {
        return Err(ExecutorError::InvalidConcurrency { value: 0 });
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let work = Arc::new(work);
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        // Acquire a permit before spawning; dispatch blocks at the bound.
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutorError::SemaphoreClosed)?;
        let work = Arc::clone(&work);

        handles.push(tokio::spawn(async move {
            // Permit is dropped when this block exits (RAII)
            let _permit = permit;
            work(item).await
        }));
    }

    debug!(task_count = handles.len(), "waiting for bounded work units");

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }
    Ok(results)
}
