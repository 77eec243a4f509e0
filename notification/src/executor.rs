// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use tokio::{sync::Semaphore, task::JoinHandle};

use std::{future::Future, sync::Arc};

/// Runs notification work off the caller's task, at most `pool_size` jobs at a time.
#[derive(Clone)]
pub struct NotificationExecutor {
    permits: Arc<Semaphore>,
}

impl NotificationExecutor {
    pub fn new(pool_size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
        }
    }

    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[tokio::test]
    async fn test_jobs_bounded_by_pool_size() {
        let executor = NotificationExecutor::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<JoinHandle<()>> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                executor.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
