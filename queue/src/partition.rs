// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Partition resolver
//!
//! Maps (service type, queue, tenant, entity) onto topic partitions and decides which partitions
//! this node owns. The routing table holds the registered queues, shared or isolated to one
//! tenant; ownership is recomputed whenever the service topology changes and the partitions now
//! owned are broadcast as a [`PartitionChangeEvent`].
//!

use crate::{QueueError, TopicService};

use common::{EntityId, QueueName, ServiceType, TenantId, TopicPartitionInfo};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a hash used for partition and ownership assignment.
pub fn hash_partition_key(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Logical queue registered in the routing table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub partitions: u32,
    /// Every message is copied to all partitions of the queue.
    pub duplicate_msg_to_all_partitions: bool,
}

impl QueueConfig {
    pub fn new(name: &str, partitions: u32) -> Self {
        Self {
            name: name.to_owned(),
            partitions: partitions.max(1),
            duplicate_msg_to_all_partitions: false,
        }
    }

    pub fn with_duplicate_msg_to_all_partitions(mut self) -> Self {
        self.duplicate_msg_to_all_partitions = true;
        self
    }
}

/// Partitions owned by this node after a topology change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionChangeEvent {
    pub service_type: ServiceType,
    pub partitions: Vec<TopicPartitionInfo>,
}

/// Partition and topology contract consumed by the router, the actors and the notification
/// processor.
pub trait PartitionService: Send + Sync + 'static {
    /// Single partition an entity's messages go to.
    fn resolve(
        &self,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<TopicPartitionInfo, QueueError>;

    /// Every partition a message for the entity must be delivered to.
    fn resolve_all(
        &self,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<Vec<TopicPartitionInfo>, QueueError>;

    /// Whether the entity's partition of the service's main queue is owned by this node.
    fn is_my_partition(
        &self,
        service_type: ServiceType,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> bool;

    /// Partitions of the service's queues owned by this node.
    fn my_partitions(&self, service_type: ServiceType) -> Vec<TopicPartitionInfo>;

    fn subscribe(&self) -> broadcast::Receiver<PartitionChangeEvent>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct QueueKey {
    service_type: ServiceType,
    queue_name: String,
    /// `SYS_TENANT_ID` for shared queues.
    tenant_id: TenantId,
}

struct RoutingTable {
    queues: HashMap<QueueKey, QueueConfig>,
    services: Vec<String>,
}

/// Hash based [`PartitionService`].
pub struct HashPartitionService {
    service_id: String,
    topic_service: TopicService,
    table: RwLock<RoutingTable>,
    sender: broadcast::Sender<PartitionChangeEvent>,
}

impl HashPartitionService {
    /// A resolver for a single node cluster made of `service_id`.
    pub fn new(service_id: &str, topic_service: TopicService) -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            service_id: service_id.to_owned(),
            topic_service,
            table: RwLock::new(RoutingTable {
                queues: HashMap::new(),
                services: vec![service_id.to_owned()],
            }),
            sender,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RoutingTable>, QueueError> {
        self.table
            .read()
            .map_err(|e| QueueError::Lock(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RoutingTable>, QueueError> {
        self.table
            .write()
            .map_err(|e| QueueError::Lock(e.to_string()))
    }

    /// Registers a queue, shared when `tenant_id` is `None`, isolated to the tenant otherwise.
    pub fn add_queue(
        &self,
        service_type: ServiceType,
        tenant_id: Option<TenantId>,
        config: QueueConfig,
    ) -> Result<(), QueueError> {
        if config.partitions == 0 {
            return Err(QueueError::InvalidQueue(format!(
                "queue {} has no partitions",
                config.name
            )));
        }
        debug!(
            "Registering queue {} for {:?} ({} partitions).",
            config.name, service_type, config.partitions
        );
        let key = QueueKey {
            service_type,
            queue_name: config.name.clone(),
            tenant_id: tenant_id.unwrap_or(TenantId::SYS_TENANT_ID),
        };
        self.write()?.queues.insert(key, config);
        Ok(())
    }

    /// Drops the queues isolated to a deleted tenant.
    pub fn remove_tenant(&self, tenant_id: TenantId) -> Result<(), QueueError> {
        if tenant_id.is_sys_tenant() {
            return Ok(());
        }
        self.write()?
            .queues
            .retain(|key, _| key.tenant_id != tenant_id);
        Ok(())
    }

    /// Applies a new cluster topology and broadcasts the partitions now owned by this node.
    pub fn recalculate_partitions(&self, services: Vec<String>) -> Result<(), QueueError> {
        let mut services = services;
        if !services.contains(&self.service_id) {
            services.push(self.service_id.clone());
        }
        services.sort();
        services.dedup();
        info!("Recalculating partitions for services {:?}.", services);
        self.write()?.services = services;

        for service_type in [ServiceType::Core, ServiceType::RuleEngine] {
            let event = PartitionChangeEvent {
                service_type,
                partitions: self.my_partitions(service_type),
            };
            let _ = self.sender.send(event);
        }
        Ok(())
    }

    fn lookup<'a>(
        table: &'a RoutingTable,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: TenantId,
    ) -> Option<(&'a QueueKey, &'a QueueConfig)> {
        let candidates = [
            (queue_name, tenant_id),
            (queue_name, TenantId::SYS_TENANT_ID),
            (QueueName::MAIN, tenant_id),
            (QueueName::MAIN, TenantId::SYS_TENANT_ID),
        ];
        candidates.iter().find_map(|(name, tenant_id)| {
            let key = QueueKey {
                service_type,
                queue_name: (*name).to_owned(),
                tenant_id: *tenant_id,
            };
            table.queues.get_key_value(&key)
        })
    }

    fn topic(&self, key: &QueueKey) -> String {
        let isolated = if key.tenant_id.is_sys_tenant() {
            None
        } else {
            Some(key.tenant_id)
        };
        self.topic_service
            .queue_topic(key.service_type, &key.queue_name, isolated)
    }

    fn is_mine(&self, services: &[String], topic: &str, partition: u32) -> bool {
        if services.is_empty() {
            return false;
        }
        let hash = hash_partition_key(format!("{}:{}", topic, partition).as_bytes());
        services[(hash % services.len() as u64) as usize] == self.service_id
    }

    fn partition_info(
        &self,
        table: &RoutingTable,
        key: &QueueKey,
        partition: u32,
    ) -> TopicPartitionInfo {
        let topic = self.topic(key);
        let my_partition = self.is_mine(&table.services, &topic, partition);
        let tenant_id = if key.tenant_id.is_sys_tenant() {
            None
        } else {
            Some(key.tenant_id)
        };
        TopicPartitionInfo::new(
            key.service_type,
            &key.queue_name,
            tenant_id,
            &topic,
            Some(partition as i32),
            my_partition,
        )
    }

    fn entity_partition(config: &QueueConfig, entity_id: EntityId) -> u32 {
        (hash_partition_key(entity_id.id().as_bytes()) % config.partitions as u64) as u32
    }
}

impl PartitionService for HashPartitionService {
    fn resolve(
        &self,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<TopicPartitionInfo, QueueError> {
        let table = self.read()?;
        let (key, config) = Self::lookup(&table, service_type, queue_name, tenant_id)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_owned()))?;
        let partition = Self::entity_partition(config, entity_id);
        Ok(self.partition_info(&table, key, partition))
    }

    fn resolve_all(
        &self,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<Vec<TopicPartitionInfo>, QueueError> {
        let table = self.read()?;
        let (key, config) = Self::lookup(&table, service_type, queue_name, tenant_id)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_owned()))?;
        if config.duplicate_msg_to_all_partitions {
            Ok((0..config.partitions)
                .map(|partition| self.partition_info(&table, key, partition))
                .collect())
        } else {
            let partition = Self::entity_partition(config, entity_id);
            Ok(vec![self.partition_info(&table, key, partition)])
        }
    }

    fn is_my_partition(
        &self,
        service_type: ServiceType,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> bool {
        self.resolve(service_type, QueueName::MAIN, tenant_id, entity_id)
            .map(|tpi| tpi.is_my_partition())
            .unwrap_or(false)
    }

    fn my_partitions(&self, service_type: ServiceType) -> Vec<TopicPartitionInfo> {
        let Ok(table) = self.read() else {
            return vec![];
        };
        let mut partitions: Vec<TopicPartitionInfo> = table
            .queues
            .iter()
            .filter(|(key, _)| key.service_type == service_type)
            .flat_map(|(key, config)| {
                (0..config.partitions)
                    .map(|partition| self.partition_info(&table, key, partition))
                    .collect::<Vec<_>>()
            })
            .filter(|tpi| tpi.is_my_partition())
            .collect();
        partitions.sort_by_key(|tpi| tpi.full_topic_name());
        partitions
    }

    fn subscribe(&self) -> broadcast::Receiver<PartitionChangeEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::EntityType;

    fn service() -> HashPartitionService {
        let service = HashPartitionService::new("node-a", TopicService::default());
        service
            .add_queue(
                ServiceType::RuleEngine,
                None,
                QueueConfig::new(QueueName::MAIN, 10),
            )
            .unwrap();
        service
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(hash_partition_key(b""), 0xcbf29ce484222325);
        assert_eq!(hash_partition_key(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let service = service();
        let tenant_id = TenantId::random();
        let device = EntityId::random(EntityType::Device);
        let first = service
            .resolve(ServiceType::RuleEngine, QueueName::MAIN, tenant_id, device)
            .unwrap();
        let second = service
            .resolve(ServiceType::RuleEngine, QueueName::MAIN, tenant_id, device)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.topic(), "tb_rule_engine.main");
        assert!(first.partition().unwrap() < 10);
        // Single node owns everything.
        assert!(first.is_my_partition());
    }

    #[test]
    fn test_queue_without_partitions_rejected() {
        let service = HashPartitionService::new("node-a", TopicService::default());
        let config = QueueConfig {
            partitions: 0,
            ..QueueConfig::new(QueueName::MAIN, 1)
        };
        assert!(matches!(
            service.add_queue(ServiceType::RuleEngine, None, config),
            Err(QueueError::InvalidQueue(_))
        ));
        assert!(matches!(
            service.resolve(
                ServiceType::RuleEngine,
                QueueName::MAIN,
                TenantId::random(),
                EntityId::random(EntityType::Device),
            ),
            Err(QueueError::QueueNotFound(_))
        ));
        assert!(service.my_partitions(ServiceType::RuleEngine).is_empty());
    }

    #[test]
    fn test_unknown_queue_falls_back_to_main() {
        let service = service();
        let tpi = service
            .resolve(
                ServiceType::RuleEngine,
                "Unknown",
                TenantId::random(),
                EntityId::random(EntityType::Device),
            )
            .unwrap();
        assert_eq!(tpi.queue_name(), QueueName::MAIN);

        let result = service.resolve(
            ServiceType::Core,
            QueueName::MAIN,
            TenantId::random(),
            EntityId::random(EntityType::Device),
        );
        assert_eq!(
            result.unwrap_err(),
            QueueError::QueueNotFound(QueueName::MAIN.to_owned())
        );
    }

    #[test]
    fn test_isolated_tenant_duplicates_to_all_partitions() {
        let service = service();
        let tenant_id = TenantId::random();
        service
            .add_queue(
                ServiceType::RuleEngine,
                Some(tenant_id),
                QueueConfig::new(QueueName::MAIN, 3).with_duplicate_msg_to_all_partitions(),
            )
            .unwrap();

        let tpis = service
            .resolve_all(
                ServiceType::RuleEngine,
                QueueName::MAIN,
                tenant_id,
                EntityId::random(EntityType::Device),
            )
            .unwrap();
        let partitions: Vec<Option<i32>> = tpis.iter().map(|tpi| tpi.partition()).collect();
        assert_eq!(partitions, vec![Some(0), Some(1), Some(2)]);
        assert!(tpis.iter().all(|tpi| tpi.tenant_id() == Some(tenant_id)));
        assert_eq!(
            tpis[0].topic(),
            format!("tb_rule_engine.main.{}", tenant_id)
        );

        service.remove_tenant(tenant_id).unwrap();
        let tpis = service
            .resolve_all(
                ServiceType::RuleEngine,
                QueueName::MAIN,
                tenant_id,
                EntityId::random(EntityType::Device),
            )
            .unwrap();
        assert_eq!(tpis.len(), 1);
        assert_eq!(tpis[0].tenant_id(), None);
    }

    #[tokio::test]
    async fn test_topology_change_splits_ownership() {
        let service = service();
        let mut events = service.subscribe();
        assert_eq!(service.my_partitions(ServiceType::RuleEngine).len(), 10);

        let services: Vec<String> = (0..4).map(|i| format!("node-{}", i)).collect();
        service.recalculate_partitions(services).unwrap();

        let mine = service.my_partitions(ServiceType::RuleEngine);
        assert!(mine.len() < 10);
        assert!(mine.iter().all(|tpi| tpi.is_my_partition()));

        let mut received = None;
        while let Ok(event) = events.try_recv() {
            if event.service_type == ServiceType::RuleEngine {
                received = Some(event);
            }
        }
        assert_eq!(received.unwrap().partitions, mine);
    }
}
