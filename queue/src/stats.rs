// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::QueueError;

use common::{QueueStats, QueueStatsId, TenantId};
use store::QueueStatsStore;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use std::sync::Arc;

/// Lazily populated (tenant, queue) to queue stats id lookup.
pub struct QueueStatsCache {
    store: Arc<dyn QueueStatsStore>,
    service_id: String,
    ids: DashMap<(TenantId, String), QueueStatsId>,
    lock: Mutex<()>,
}

impl QueueStatsCache {
    pub fn new(store: Arc<dyn QueueStatsStore>, service_id: &str) -> Self {
        Self {
            store,
            service_id: service_id.to_owned(),
            ids: DashMap::new(),
            lock: Mutex::new(()),
        }
    }

    /// Id of the stats record of the queue, created in the store on first use.
    pub async fn get_or_create(
        &self,
        tenant_id: TenantId,
        queue_name: &str,
    ) -> Result<QueueStatsId, QueueError> {
        let key = (tenant_id, queue_name.to_owned());
        if let Some(id) = self.ids.get(&key) {
            return Ok(*id);
        }

        let _guard = self.lock.lock().await;
        if let Some(id) = self.ids.get(&key) {
            return Ok(*id);
        }
        let stats = match self
            .store
            .find_queue_stats(tenant_id, queue_name, &self.service_id)
            .await?
        {
            Some(stats) => stats,
            None => {
                debug!("[{}] Creating queue stats for {}.", tenant_id, queue_name);
                self.store
                    .save_queue_stats(QueueStats {
                        id: QueueStatsId::random(),
                        tenant_id,
                        queue_name: queue_name.to_owned(),
                        service_id: self.service_id.clone(),
                    })
                    .await?
            }
        };
        self.ids.insert(key, stats.id);
        Ok(stats.id)
    }

    pub fn evict_tenant(&self, tenant_id: TenantId) {
        self.ids.retain(|(tenant, _), _| *tenant != tenant_id);
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::QueueName;
    use store::MemoryStore;

    #[tokio::test]
    async fn test_concurrent_lookups_create_once() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(QueueStatsCache::new(store.clone(), "node-a"));
        let tenant_id = TenantId::random();

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_create(tenant_id, QueueName::MAIN).await.unwrap()
            }));
        }
        let mut ids = vec![];
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        assert!(ids.iter().all(|id| *id == ids[0]));

        let stored = store
            .find_queue_stats(tenant_id, QueueName::MAIN, "node-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, ids[0]);

        cache.evict_tenant(tenant_id);
        assert_eq!(
            cache.get_or_create(tenant_id, QueueName::MAIN).await.unwrap(),
            ids[0]
        );
    }
}
