//! A minimal `join_all`: drives a set of futures to completion concurrently
//! on the current task, polling each one as it's woken rather than
//! awaiting them one at a time. Kept local instead of pulling in the
//! `futures` crate for a single call site.

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

pub async fn join_all<T>(
    futures: Vec<Pin<Box<dyn Future<Output = T> + Send + '_>>>,
) -> Vec<T> {
    let mut futures = futures;
    let mut results: Vec<Option<T>> = futures.iter().map(|_| None).collect();

    std::future::poll_fn(move |cx| {
        let mut all_ready = true;
        for (slot, result) in futures.iter_mut().zip(results.iter_mut()) {
            if result.is_none() {
                match slot.as_mut().poll(cx) {
                    Poll::Ready(value) => *result = Some(value),
                    Poll::Pending => all_ready = false,
                }
            }
        }

        if all_ready {
            Poll::Ready(results.iter_mut().map(|r| r.take().unwrap()).collect())
        } else {
            Poll::Pending
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_all_preserves_input_order() {
        let futures: Vec<Pin<Box<dyn Future<Output = u32> + Send>>> = vec![
            Box::pin(async { 1u32 }),
            Box::pin(async {
                tokio::task::yield_now().await;
                2u32
            }),
            Box::pin(async { 3u32 }),
        ];
        let results = join_all(futures).await;
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn join_all_runs_concurrently_not_sequentially() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let concurrent = std::sync::Arc::new(AtomicUsize::new(0));
        let peak = std::sync::Arc::new(AtomicUsize::new(0));

        let make = |concurrent: std::sync::Arc<AtomicUsize>, peak: std::sync::Arc<AtomicUsize>| {
            Box::pin(async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        };

        let futures = vec![
            make(concurrent.clone(), peak.clone()),
            make(concurrent.clone(), peak.clone()),
            make(concurrent.clone(), peak.clone()),
        ];
        join_all(futures).await;
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }
}
