//! Bounded concurrent execution of per-sample tasks.

use std::future::{Future, ready};

use futures::stream::{self, StreamExt};

use super::cancel::CancelToken;

/// Run `task` over `items` with at most `concurrency` tasks in flight.
///
/// No task is started once `cancel` fires; tasks already running finish.
/// Results come back in input order, for the tasks that were started.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    cancel: &CancelToken,
    task: F,
) -> Vec<(usize, R)>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let task = &task;
    let mut results: Vec<(usize, R)> = stream::iter(items.into_iter().enumerate())
        .take_while(|_| ready(!cancel.is_cancelled()))
        .map(|(i, item)| async move { (i, task(i, item).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(i, _)| *i);
    results
}
