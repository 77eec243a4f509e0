// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::NotificationError;

use common::{
    notification::{NotificationRule, NotificationRuleTriggerType},
    ComponentLifecycleMsg, EntityType, TenantId,
};
use store::NotificationRuleStore;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use std::sync::Arc;

/// Enabled notification rules by (tenant, trigger type), loaded on first use and evicted on
/// rule lifecycle events.
///
/// Every eviction bumps the tenant's generation. A fill whose generation changed while it read
/// the store returns its rules without caching them.
pub struct NotificationRulesCache {
    store: Arc<dyn NotificationRuleStore>,
    rules: DashMap<(TenantId, NotificationRuleTriggerType), Arc<Vec<NotificationRule>>>,
    generations: DashMap<TenantId, u64>,
    lock: Mutex<()>,
}

impl NotificationRulesCache {
    pub fn new(store: Arc<dyn NotificationRuleStore>) -> Self {
        Self {
            store,
            rules: DashMap::new(),
            generations: DashMap::new(),
            lock: Mutex::new(()),
        }
    }

    pub async fn get_enabled(
        &self,
        tenant_id: TenantId,
        trigger_type: NotificationRuleTriggerType,
    ) -> Result<Arc<Vec<NotificationRule>>, NotificationError> {
        let key = (tenant_id, trigger_type);
        if let Some(rules) = self.rules.get(&key) {
            return Ok(rules.clone());
        }

        let _guard = self.lock.lock().await;
        if let Some(rules) = self.rules.get(&key) {
            return Ok(rules.clone());
        }
        let generation = self.generation(tenant_id);
        let rules = Arc::new(self.store.find_enabled_rules(tenant_id, trigger_type).await?);
        debug!(
            "[{}] Loaded {} enabled rules for {:?}.",
            tenant_id,
            rules.len(),
            trigger_type
        );
        let current = self.generations.entry(tenant_id).or_default();
        if *current == generation {
            self.rules.insert(key, rules.clone());
        } else {
            debug!("[{}] Rules changed while loading, not cached.", tenant_id);
        }
        Ok(rules)
    }

    fn generation(&self, tenant_id: TenantId) -> u64 {
        self.generations
            .get(&tenant_id)
            .map(|generation| *generation)
            .unwrap_or_default()
    }

    pub fn evict(&self, tenant_id: TenantId) {
        *self.generations.entry(tenant_id).or_default() += 1;
        self.rules.retain(|(tenant, _), _| *tenant != tenant_id);
    }

    /// Evicts the tenant's rules when one of its notification rules changed or the tenant was
    /// deleted.
    pub fn on_component_lifecycle(&self, msg: &ComponentLifecycleMsg) {
        if msg.entity_id.entity_type() == EntityType::NotificationRule || msg.is_tenant_deleted()
        {
            self.evict(msg.tenant_id);
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{
        notification::{EntityActionTriggerConfig, RecipientsConfig, TriggerConfig},
        ComponentLifecycleEvent, NotificationRuleId,
    };
    use async_trait::async_trait;
    use store::MemoryStore;
    use uuid::Uuid;

    use std::time::Duration;

    // Answers with the rules stored before a slow read.
    struct SlowRuleStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl NotificationRuleStore for SlowRuleStore {
        async fn find_enabled_rules(
            &self,
            tenant_id: TenantId,
            trigger_type: NotificationRuleTriggerType,
        ) -> Result<Vec<NotificationRule>, store::Error> {
            let rules = self.inner.find_enabled_rules(tenant_id, trigger_type).await?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(rules)
        }

        async fn save_rule(&self, rule: NotificationRule) -> Result<(), store::Error> {
            self.inner.save_rule(rule).await
        }

        async fn delete_rule(
            &self,
            tenant_id: TenantId,
            rule_id: NotificationRuleId,
        ) -> Result<(), store::Error> {
            self.inner.delete_rule(tenant_id, rule_id).await
        }
    }

    fn rule(tenant_id: TenantId) -> NotificationRule {
        NotificationRule {
            id: NotificationRuleId::random(),
            tenant_id,
            name: "Device created".to_owned(),
            enabled: true,
            template_id: Uuid::new_v4(),
            trigger_config: TriggerConfig::EntityAction(EntityActionTriggerConfig {
                created: true,
                ..Default::default()
            }),
            recipients_config: RecipientsConfig::Targets(vec![Uuid::new_v4()]),
        }
    }

    #[tokio::test]
    async fn test_evicted_on_rule_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let cache = NotificationRulesCache::new(store.clone());
        let tenant_id = TenantId::random();
        let first = rule(tenant_id);
        store.save_rule(first.clone()).await.unwrap();

        let rules = cache
            .get_enabled(tenant_id, NotificationRuleTriggerType::EntityAction)
            .await
            .unwrap();
        assert_eq!(*rules, vec![first.clone()]);

        let second = rule(tenant_id);
        store.save_rule(second.clone()).await.unwrap();
        let cached = cache
            .get_enabled(tenant_id, NotificationRuleTriggerType::EntityAction)
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);

        cache.on_component_lifecycle(&ComponentLifecycleMsg::new(
            tenant_id,
            second.id.into(),
            ComponentLifecycleEvent::Created,
        ));
        let reloaded = cache
            .get_enabled(tenant_id, NotificationRuleTriggerType::EntityAction)
            .await
            .unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn test_eviction_during_load_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(NotificationRulesCache::new(Arc::new(SlowRuleStore {
            inner: store.clone(),
        })));
        let tenant_id = TenantId::random();

        let loading = tokio::spawn({
            let cache = cache.clone();
            async move {
                cache
                    .get_enabled(tenant_id, NotificationRuleTriggerType::EntityAction)
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let created = rule(tenant_id);
        store.save_rule(created.clone()).await.unwrap();
        cache.on_component_lifecycle(&ComponentLifecycleMsg::new(
            tenant_id,
            created.id.into(),
            ComponentLifecycleEvent::Created,
        ));
        assert!(loading.await.unwrap().unwrap().is_empty());

        let rules = cache
            .get_enabled(tenant_id, NotificationRuleTriggerType::EntityAction)
            .await
            .unwrap();
        assert_eq!(*rules, vec![created]);
    }
}
