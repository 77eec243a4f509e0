// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor messages
//!
//! The rule-engine actors exchange a closed set of messages. Every actor matches the kinds it
//! understands and reports the rest as unhandled.
//!

use common::{
    ComponentLifecycleMsg, MsgError, RuleChainId, RuleNodeId, ServiceType, TbMsg,
    TenantId, TopicPartitionInfo,
};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Kind of an actor message, used for logging and system events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    ComponentLifecycle,
    QueueToRuleEngine,
    RuleChainToRuleNode,
    RuleNodeToRuleChainTellNext,
    RuleChainToRuleChain,
    RuleChainInput,
    RuleChainOutput,
    PartitionChange,
    StatsPersistTick,
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Message consumed from a rule-engine queue, addressed to the tenant's rule engine.
#[derive(Clone, Debug)]
pub struct QueueToRuleEngineMsg {
    pub tenant_id: TenantId,
    pub msg: TbMsg,
}

/// Message handed by a rule chain to one of its nodes.
#[derive(Clone, Debug)]
pub struct RuleChainToRuleNodeMsg {
    pub msg: TbMsg,
    /// Relation the message arrived through, `None` for the first node.
    pub from_relation_type: Option<String>,
}

/// Output of a rule node, to be routed by its chain along the given relations.
#[derive(Clone, Debug)]
pub struct RuleNodeToRuleChainTellNextMsg {
    pub rule_chain_id: RuleChainId,
    pub originator_node_id: RuleNodeId,
    pub relation_types: Vec<String>,
    pub msg: TbMsg,
    pub failure_message: Option<String>,
}

/// Message crossing from one rule chain into another through a chain relation.
#[derive(Clone, Debug)]
pub struct RuleChainToRuleChainMsg {
    pub target: RuleChainId,
    pub source: RuleChainId,
    pub relation_type: String,
    pub msg: TbMsg,
}

/// Message forwarded by a rule-chain input node. The caller frame is already on the message stack.
#[derive(Clone, Debug)]
pub struct RuleChainInputMsg {
    pub target: RuleChainId,
    pub msg: TbMsg,
}

/// Message returned by a rule-chain output node to the chain that called this one.
#[derive(Clone, Debug)]
pub struct RuleChainOutputMsg {
    pub target: RuleChainId,
    pub target_node: RuleNodeId,
    pub relation_type: String,
    pub msg: TbMsg,
}

/// New partition assignment of this node for a service type.
#[derive(Clone, Debug)]
pub struct PartitionChangeMsg {
    pub service_type: ServiceType,
    pub partitions: Vec<TopicPartitionInfo>,
}

/// Closed set of messages understood by the rule-engine actors.
#[derive(Clone, Debug)]
pub enum TbActorMsg {
    ComponentLifecycle(ComponentLifecycleMsg),
    QueueToRuleEngine(QueueToRuleEngineMsg),
    RuleChainToRuleNode(RuleChainToRuleNodeMsg),
    RuleNodeToRuleChainTellNext(RuleNodeToRuleChainTellNextMsg),
    RuleChainToRuleChain(RuleChainToRuleChainMsg),
    RuleChainInput(RuleChainInputMsg),
    RuleChainOutput(RuleChainOutputMsg),
    PartitionChange(PartitionChangeMsg),
    StatsPersistTick,
}

impl TbActorMsg {
    pub fn msg_type(&self) -> MsgType {
        match self {
            TbActorMsg::ComponentLifecycle(_) => MsgType::ComponentLifecycle,
            TbActorMsg::QueueToRuleEngine(_) => MsgType::QueueToRuleEngine,
            TbActorMsg::RuleChainToRuleNode(_) => MsgType::RuleChainToRuleNode,
            TbActorMsg::RuleNodeToRuleChainTellNext(_) => {
                MsgType::RuleNodeToRuleChainTellNext
            }
            TbActorMsg::RuleChainToRuleChain(_) => MsgType::RuleChainToRuleChain,
            TbActorMsg::RuleChainInput(_) => MsgType::RuleChainInput,
            TbActorMsg::RuleChainOutput(_) => MsgType::RuleChainOutput,
            TbActorMsg::PartitionChange(_) => MsgType::PartitionChange,
            TbActorMsg::StatsPersistTick => MsgType::StatsPersistTick,
        }
    }

    /// Control messages skip ahead of queued data messages.
    pub fn is_high_priority(&self) -> bool {
        matches!(
            self,
            TbActorMsg::ComponentLifecycle(_) | TbActorMsg::PartitionChange(_)
        )
    }

    /// The rule-engine message carried, if any.
    pub fn tb_msg(&self) -> Option<&TbMsg> {
        match self {
            TbActorMsg::QueueToRuleEngine(inner) => Some(&inner.msg),
            TbActorMsg::RuleChainToRuleNode(inner) => Some(&inner.msg),
            TbActorMsg::RuleNodeToRuleChainTellNext(inner) => Some(&inner.msg),
            TbActorMsg::RuleChainToRuleChain(inner) => Some(&inner.msg),
            TbActorMsg::RuleChainInput(inner) => Some(&inner.msg),
            TbActorMsg::RuleChainOutput(inner) => Some(&inner.msg),
            TbActorMsg::ComponentLifecycle(_)
            | TbActorMsg::PartitionChange(_)
            | TbActorMsg::StatsPersistTick => None,
        }
    }

    /// Fails the callback of the carried rule-engine message. Used when the message can no
    /// longer be delivered.
    pub fn fail(&self, error: MsgError) {
        if let Some(msg) = self.tb_msg() {
            msg.fail(error);
        }
    }
}
