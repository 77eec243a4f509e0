// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Partitioned queue routing
//!
//! Resolves rule-engine messages onto topic partitions, fans a message out when its tenant
//! spans several partitions and consumes partitions in packs with a bounded completion wait.
//!
//! ```ignore
//! let router = RuleEngineProducerService::new(partition_service.clone());
//! router.send_to_rule_engine(&producer, tenant_id, msg, Some(callback))?;
//! ```
//!

mod consumer;
mod error;
mod msg;
mod pack;
mod partition;
mod producer;
mod settings;
mod stats;
mod topic;
mod transport;

pub use consumer::QueueConsumerManager;
pub use error::QueueError;
pub use msg::{QueueMsg, ToRuleEngineMsg};
pub use pack::{
    process_pack, MsgPackHandler, PackCallback, PackOutcome, PackProcessingContext,
};
pub use partition::{
    hash_partition_key, HashPartitionService, PartitionChangeEvent, PartitionService,
    QueueConfig,
};
pub use producer::RuleEngineProducerService;
pub use settings::QueueSettings;
pub use stats::QueueStatsCache;
pub use topic::TopicService;
pub use transport::{
    InMemoryConsumer, InMemoryProducer, InMemoryStorage, QueueConsumer, QueueProducer,
};
