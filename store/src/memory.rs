// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Memory store implementation.
//!

use crate::{
    database::{
        ComponentStats, ComponentStatsStore, NotificationRequestStore,
        NotificationRuleStore, QueueStatsStore, RuleChainStore, TenantStore,
    },
    error::Error,
};

use common::{
    notification::{
        NotificationRequest, NotificationRequestStatus, NotificationRule,
        NotificationRuleTriggerType,
    },
    EntityId, NotificationRequestId, NotificationRuleId, QueueStats, RuleChain,
    RuleChainId, Tenant, TenantId,
};

use async_trait::async_trait;
use tracing::debug;

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

#[derive(Default)]
struct MemoryData {
    tenants: HashMap<TenantId, Tenant>,
    rule_chains: BTreeMap<RuleChainId, RuleChain>,
    rules: BTreeMap<NotificationRuleId, NotificationRule>,
    requests: BTreeMap<NotificationRequestId, NotificationRequest>,
    queue_stats: Vec<QueueStats>,
    component_stats: HashMap<EntityId, Vec<ComponentStats>>,
}

/// A store implementation that keeps every record in memory. Cloning shares the data.
///
#[derive(Default, Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryData>, Error> {
        self.data
            .read()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryData>, Error> {
        self.data
            .write()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))
    }

    pub fn save_tenant(&self, tenant: Tenant) -> Result<(), Error> {
        self.write()?.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    pub fn delete_tenant(&self, tenant_id: TenantId) -> Result<(), Error> {
        self.write()?.tenants.remove(&tenant_id);
        Ok(())
    }

    /// Every stored notification request.
    pub fn requests(&self) -> Result<Vec<NotificationRequest>, Error> {
        Ok(self.read()?.requests.values().cloned().collect())
    }

    /// Stats snapshots persisted for a component, oldest first.
    pub fn component_stats(
        &self,
        component_id: EntityId,
    ) -> Result<Vec<ComponentStats>, Error> {
        Ok(self
            .read()?
            .component_stats
            .get(&component_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_tenant_by_id(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Tenant>, Error> {
        Ok(self.read()?.tenants.get(&tenant_id).cloned())
    }
}

#[async_trait]
impl RuleChainStore for MemoryStore {
    async fn find_rule_chain_by_id(
        &self,
        tenant_id: TenantId,
        rule_chain_id: RuleChainId,
    ) -> Result<Option<RuleChain>, Error> {
        Ok(self
            .read()?
            .rule_chains
            .get(&rule_chain_id)
            .filter(|chain| chain.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_root_rule_chain(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<RuleChain>, Error> {
        Ok(self
            .read()?
            .rule_chains
            .values()
            .find(|chain| chain.tenant_id == tenant_id && chain.root)
            .cloned())
    }

    async fn save_rule_chain(&self, rule_chain: RuleChain) -> Result<(), Error> {
        debug!("Saving rule chain {}.", rule_chain.id);
        self.write()?.rule_chains.insert(rule_chain.id, rule_chain);
        Ok(())
    }

    async fn delete_rule_chain(
        &self,
        tenant_id: TenantId,
        rule_chain_id: RuleChainId,
    ) -> Result<(), Error> {
        let mut data = self.write()?;
        match data.rule_chains.get(&rule_chain_id) {
            Some(chain) if chain.tenant_id == tenant_id => {
                data.rule_chains.remove(&rule_chain_id);
                Ok(())
            }
            _ => Err(Error::EntryNotFound(format!(
                "Rule chain {} of tenant {}",
                rule_chain_id, tenant_id
            ))),
        }
    }
}

#[async_trait]
impl NotificationRuleStore for MemoryStore {
    async fn find_enabled_rules(
        &self,
        tenant_id: TenantId,
        trigger_type: NotificationRuleTriggerType,
    ) -> Result<Vec<NotificationRule>, Error> {
        Ok(self
            .read()?
            .rules
            .values()
            .filter(|rule| {
                rule.enabled
                    && rule.tenant_id == tenant_id
                    && rule.trigger_type() == trigger_type
            })
            .cloned()
            .collect())
    }

    async fn save_rule(&self, rule: NotificationRule) -> Result<(), Error> {
        self.write()?.rules.insert(rule.id, rule);
        Ok(())
    }

    async fn delete_rule(
        &self,
        tenant_id: TenantId,
        rule_id: NotificationRuleId,
    ) -> Result<(), Error> {
        let mut data = self.write()?;
        match data.rules.get(&rule_id) {
            Some(rule) if rule.tenant_id == tenant_id => {
                data.rules.remove(&rule_id);
                Ok(())
            }
            _ => Err(Error::EntryNotFound(format!(
                "Notification rule {} of tenant {}",
                rule_id, tenant_id
            ))),
        }
    }
}

#[async_trait]
impl NotificationRequestStore for MemoryStore {
    async fn find_requests_by_rule_and_originator(
        &self,
        tenant_id: TenantId,
        rule_id: NotificationRuleId,
        originator: EntityId,
    ) -> Result<Vec<NotificationRequest>, Error> {
        let mut requests: Vec<NotificationRequest> = self
            .read()?
            .requests
            .values()
            .filter(|request| {
                request.tenant_id == tenant_id
                    && request.rule_id == Some(rule_id)
                    && request.originator_entity_id == Some(originator)
            })
            .cloned()
            .collect();
        requests.sort_by_key(|request| request.created_time);
        Ok(requests)
    }

    async fn find_request_ids_by_status_and_rule(
        &self,
        tenant_id: TenantId,
        status: NotificationRequestStatus,
        rule_id: NotificationRuleId,
    ) -> Result<Vec<NotificationRequestId>, Error> {
        Ok(self
            .read()?
            .requests
            .iter()
            .filter(|(_, request)| {
                request.tenant_id == tenant_id
                    && request.status == status
                    && request.rule_id == Some(rule_id)
            })
            .map(|(id, _)| *id)
            .collect())
    }

    async fn save_request(
        &self,
        mut request: NotificationRequest,
    ) -> Result<NotificationRequest, Error> {
        let id = *request.id.get_or_insert_with(NotificationRequestId::random);
        self.write()?.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn delete_request(
        &self,
        tenant_id: TenantId,
        request_id: NotificationRequestId,
    ) -> Result<(), Error> {
        let mut data = self.write()?;
        match data.requests.get(&request_id) {
            Some(request) if request.tenant_id == tenant_id => {
                data.requests.remove(&request_id);
                Ok(())
            }
            _ => Err(Error::EntryNotFound(format!(
                "Notification request {} of tenant {}",
                request_id, tenant_id
            ))),
        }
    }
}

#[async_trait]
impl QueueStatsStore for MemoryStore {
    async fn find_queue_stats(
        &self,
        tenant_id: TenantId,
        queue_name: &str,
        service_id: &str,
    ) -> Result<Option<QueueStats>, Error> {
        Ok(self
            .read()?
            .queue_stats
            .iter()
            .find(|stats| {
                stats.tenant_id == tenant_id
                    && stats.queue_name == queue_name
                    && stats.service_id == service_id
            })
            .cloned())
    }

    async fn save_queue_stats(&self, stats: QueueStats) -> Result<QueueStats, Error> {
        let mut data = self.write()?;
        data.queue_stats.retain(|existing| existing.id != stats.id);
        data.queue_stats.push(stats.clone());
        Ok(stats)
    }
}

#[async_trait]
impl ComponentStatsStore for MemoryStore {
    async fn save_component_stats(
        &self,
        _tenant_id: TenantId,
        component_id: EntityId,
        stats: ComponentStats,
    ) -> Result<(), Error> {
        self.write()?
            .component_stats
            .entry(component_id)
            .or_default()
            .push(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{
        notification::{NotificationRequestConfig, RecipientsConfig, TriggerConfig},
        EntityType,
    };
    use tracing_test::traced_test;
    use uuid::Uuid;

    fn request(
        tenant_id: TenantId,
        rule_id: NotificationRuleId,
        originator: EntityId,
        status: NotificationRequestStatus,
    ) -> NotificationRequest {
        NotificationRequest {
            id: None,
            tenant_id,
            targets: vec![Uuid::new_v4()],
            template_id: Uuid::new_v4(),
            info: None,
            additional_config: NotificationRequestConfig::default(),
            rule_id: Some(rule_id),
            originator_entity_id: Some(originator),
            status,
            created_time: common::now_millis(),
        }
    }

    #[tokio::test]
    async fn test_requests_by_rule_and_status() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::random();
        let rule_id = NotificationRuleId::random();
        let originator = EntityId::random(EntityType::Alarm);

        let sent = store
            .save_request(request(
                tenant_id,
                rule_id,
                originator,
                NotificationRequestStatus::Sent,
            ))
            .await
            .unwrap();
        let scheduled = store
            .save_request(request(
                tenant_id,
                rule_id,
                originator,
                NotificationRequestStatus::Scheduled,
            ))
            .await
            .unwrap();
        assert!(sent.id.is_some());

        let found = store
            .find_requests_by_rule_and_originator(tenant_id, rule_id, originator)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let ids = store
            .find_request_ids_by_status_and_rule(
                tenant_id,
                NotificationRequestStatus::Scheduled,
                rule_id,
            )
            .await
            .unwrap();
        assert_eq!(ids, vec![scheduled.id.unwrap()]);

        store
            .delete_request(tenant_id, scheduled.id.unwrap())
            .await
            .unwrap();
        assert_eq!(store.requests().unwrap().len(), 1);
        assert!(store
            .delete_request(TenantId::random(), sent.id.unwrap())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_enabled_rules_filter() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::random();
        let rule = NotificationRule {
            id: NotificationRuleId::random(),
            tenant_id,
            name: "Entity created".to_owned(),
            enabled: true,
            template_id: Uuid::new_v4(),
            trigger_config: TriggerConfig::EntityAction(Default::default()),
            recipients_config: RecipientsConfig::Targets(vec![]),
        };
        let disabled = NotificationRule {
            id: NotificationRuleId::random(),
            enabled: false,
            ..rule.clone()
        };
        store.save_rule(rule.clone()).await.unwrap();
        store.save_rule(disabled).await.unwrap();

        let found = store
            .find_enabled_rules(tenant_id, NotificationRuleTriggerType::EntityAction)
            .await
            .unwrap();
        assert_eq!(found, vec![rule]);
        assert!(store
            .find_enabled_rules(tenant_id, NotificationRuleTriggerType::Alarm)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_root_rule_chain_lookup() {
        let store = MemoryStore::new();
        let tenant_id = TenantId::random();
        let root = RuleChain {
            id: RuleChainId::random(),
            tenant_id,
            name: "Root".to_owned(),
            root: true,
            first_rule_node_id: None,
            nodes: vec![],
            relations: vec![],
        };
        let nested = RuleChain {
            id: RuleChainId::random(),
            name: "Nested".to_owned(),
            root: false,
            ..root.clone()
        };
        store.save_rule_chain(root.clone()).await.unwrap();
        store.save_rule_chain(nested.clone()).await.unwrap();
        assert!(logs_contain(&format!("Saving rule chain {}.", root.id)));

        assert_eq!(
            store.find_root_rule_chain(tenant_id).await.unwrap(),
            Some(root.clone())
        );
        assert_eq!(
            store
                .find_rule_chain_by_id(TenantId::random(), nested.id)
                .await
                .unwrap(),
            None
        );

        store.delete_rule_chain(tenant_id, root.id).await.unwrap();
        assert_eq!(store.find_root_rule_chain(tenant_id).await.unwrap(), None);
        assert!(matches!(
            store.delete_rule_chain(tenant_id, root.id).await,
            Err(Error::EntryNotFound(_))
        ));
    }
}
