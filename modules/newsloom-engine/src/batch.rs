//! Cooperative batching against the AI provider: units within a batch
//! run concurrently, batches run sequentially with a fixed pause between
//! them to bound request rate.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

/// Apply `work` to every item, `batch_size` at a time. Results come back
/// in input order.
pub async fn run_batched<T, F, Fut, R>(
    items: Vec<T>,
    batch_size: usize,
    delay: Duration,
    work: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut iter = items.into_iter();
    let mut processed = 0;

    while processed < total {
        let batch: Vec<T> = iter.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        processed += batch.len();
        results.extend(join_all(batch.into_iter().map(&work)).await);
        if processed < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preserves_input_order() {
        let results = run_batched(vec![1, 2, 3, 4, 5], 2, Duration::ZERO, |n| async move {
            n * 10
        })
        .await;
        assert_eq!(results, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn handles_empty_input() {
        let results: Vec<i32> =
            run_batched(Vec::<i32>::new(), 3, Duration::ZERO, |n| async move { n }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_batch_size_is_clamped() {
        let results = run_batched(vec![1, 2], 0, Duration::ZERO, |n| async move { n }).await;
        assert_eq!(results, vec![1, 2]);
    }
}
