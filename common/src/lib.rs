// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Common data model
//!
//! Identifiers, the rule-engine message envelope, component lifecycle messages, queue routing
//! descriptors and the notification data model shared by every crate of the workspace.
//!

mod error;
mod id;
mod lifecycle;
mod msg;
pub mod notification;
mod queue;
mod rule_chain;

pub use error::MsgError;
pub use id::{
    EntityId, EntityType, NotificationRequestId, NotificationRuleId,
    QueueStatsId, RuleChainId, RuleNodeId, TenantId,
};
pub use lifecycle::{ComponentLifecycleEvent, ComponentLifecycleMsg};
pub use msg::{
    msg_type, relation, EmptyMsgCallback, MsgCallback, MultipleMsgCallback,
    TbMsg,
};
pub use queue::{QueueName, QueueStats, ServiceType, TopicPartitionInfo};
pub use rule_chain::{NodeRelation, RuleChain, RuleNode, Tenant};

/// Current wall-clock time in milliseconds, used for record timestamps.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
