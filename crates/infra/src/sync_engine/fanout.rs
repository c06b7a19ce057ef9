//! Bounded fan-out/fan-in over independent units of work.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stocksync_observability::Logger;

/// What became of one input.
#[derive(Debug)]
pub(crate) enum Slot<T> {
    Completed(T),
    /// Cancellation arrived before a worker was free for this input.
    NotStarted,
    /// The worker panicked or was aborted.
    Failed(String),
}

/// Run `work` over `inputs` with at most `limit` running at once.
///
/// Workers are spawned tasks, so a worker that has started always runs to
/// completion even if this future is dropped. Once `cancel` fires no new
/// worker is started. Results come back in input order.
pub(crate) async fn fan_out<I, T, F, Fut>(
    inputs: Vec<I>,
    limit: usize,
    cancel: &CancellationToken,
    logger: &Logger,
    work: F,
) -> Vec<Slot<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let total = inputs.len();
    let mut handles: Vec<JoinHandle<T>> = Vec::with_capacity(total);

    for input in inputs {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        let fut = work(input);
        handles.push(tokio::spawn(logger.scope(async move {
            let _permit = permit;
            fut.await
        })));
    }

    let mut slots = Vec::with_capacity(total);
    for handle in handles {
        slots.push(match handle.await {
            Ok(out) => Slot::Completed(out),
            Err(e) => Slot::Failed(e.to_string()),
        });
    }
    slots.resize_with(total, || Slot::NotStarted);
    slots
}
