// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Queue routing descriptors
//!

use crate::{QueueStatsId, TenantId};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Kind of service consuming a queue.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ServiceType {
    Core,
    RuleEngine,
}

impl ServiceType {
    /// Topic prefix of the service's queues.
    pub fn topic_prefix(&self) -> &'static str {
        match self {
            ServiceType::Core => "tb_core",
            ServiceType::RuleEngine => "tb_rule_engine",
        }
    }
}

/// Names of the queues every installation provides.
pub struct QueueName;

impl QueueName {
    pub const MAIN: &'static str = "Main";
    pub const HIGH_PRIORITY: &'static str = "HighPriority";
    pub const SEQUENTIAL_BY_ORIGINATOR: &'static str = "SequentialByOriginator";
}

/// One physical consumption unit: a topic partition of a logical queue, optionally isolated to a
/// tenant. Computed by the partition resolver, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicPartitionInfo {
    service_type: ServiceType,
    queue_name: String,
    tenant_id: Option<TenantId>,
    topic: String,
    partition: Option<i32>,
    my_partition: bool,
}

impl TopicPartitionInfo {
    pub fn new(
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: Option<TenantId>,
        topic: &str,
        partition: Option<i32>,
        my_partition: bool,
    ) -> Self {
        Self {
            service_type,
            queue_name: queue_name.to_owned(),
            tenant_id,
            topic: topic.to_owned(),
            partition,
            my_partition,
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> Option<i32> {
        self.partition
    }

    /// True when the partition is assigned to this node.
    pub fn is_my_partition(&self) -> bool {
        self.my_partition
    }

    /// Topic name including the partition suffix, e.g. `tb_rule_engine.main.3`.
    pub fn full_topic_name(&self) -> String {
        match self.partition {
            Some(partition) => format!("{}.{}", self.topic, partition),
            None => self.topic.clone(),
        }
    }
}

impl fmt::Display for TopicPartitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_topic_name())
    }
}

/// Queue statistics record of one (tenant, queue) pair on one service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub id: QueueStatsId,
    pub tenant_id: TenantId,
    pub queue_name: String,
    pub service_id: String,
}
