// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Core of an IoT platform node.
//! Routes rule-engine messages onto partitioned queues, dispatches consumed messages through
//! supervised rule-chain actors, and turns platform events into notification requests.
//! The members are re-exported here together with the node configuration and logging setup.

pub mod config;
pub mod logging;

pub use config::{ConfigError, CoreConfig};

pub use actor::{
    Actor, ActorContext, ActorId, ActorRef, ActorSettings, ActorSystem, Error as ActorError,
    ExponentialBackoffStrategy, FixedIntervalStrategy, NoIntervalStrategy, ProcessFailureStrategy,
    QueueToRuleEngineMsg, RetryStrategy, Sink, StopReason, Subscriber, SupervisionStrategy,
    SystemEvent, SystemRef, SystemRunner, TbActorMsg,
};

pub use common::{
    ComponentLifecycleEvent, ComponentLifecycleMsg, EntityId, EntityType, MsgCallback,
    MsgError, QueueName, RuleChain, RuleChainId, RuleNode, RuleNodeId, ServiceType, TbMsg,
    Tenant, TenantId, TopicPartitionInfo,
};

pub use notification::{
    DefaultNotificationCenter, DefaultNotificationRuleProcessor, DefaultRateLimitService,
    NotificationCenter, NotificationError, NotificationRuleProcessor, NotificationSettings,
};

pub use queue::{
    HashPartitionService, InMemoryConsumer, InMemoryProducer, InMemoryStorage,
    PartitionService, QueueConfig, QueueConsumer, QueueConsumerManager, QueueError,
    QueueProducer, QueueSettings, QueueStatsCache, RuleEngineProducerService, TopicService,
};

pub use rule_engine::{
    ActorSystemContext, AppActor, NodeFactory, RuleEngineConsumerService, RuleEngineError,
    RuleNodeCtx, TbNode,
};

pub use store::{Error as StoreError, MemoryStore};
