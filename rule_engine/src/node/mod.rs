// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule nodes
//!
//! A rule node receives one message at a time from its actor and hands it on through the
//! [`RuleNodeCtx`]: to the next nodes of its chain by relation type, into another rule chain,
//! or back to the chain that called the current one. Nodes are built from their definition by
//! the [`NodeFactory`], keyed by node type.
//!

mod flow;
mod switch;

pub use flow::{RuleChainInputNode, RuleChainOutputNode};
pub use switch::MsgTypeSwitchNode;

use crate::RuleEngineError;

use actor::{
    ActorRef, RuleChainInputMsg, RuleChainOutputMsg, RuleNodeToRuleChainTellNextMsg,
    TbActorMsg,
};
use common::{relation, RuleChainId, RuleNode, RuleNodeId, TbMsg, TenantId, TopicPartitionInfo};

use async_trait::async_trait;
use tracing::debug;

use std::{collections::HashMap, fmt};

/// Node type of [`MsgTypeSwitchNode`].
pub const MSG_TYPE_SWITCH_NODE: &str = "TbMsgTypeSwitchNode";
/// Node type of [`RuleChainInputNode`].
pub const RULE_CHAIN_INPUT_NODE: &str = "TbRuleChainInputNode";
/// Node type of [`RuleChainOutputNode`].
pub const RULE_CHAIN_OUTPUT_NODE: &str = "TbRuleChainOutputNode";

/// Behaviour of a rule node.
#[async_trait]
pub trait TbNode: Send + Sync + 'static {
    /// Processes a message. An error routes the message along the `Failure` relation.
    async fn on_msg(&mut self, ctx: &RuleNodeCtx, msg: TbMsg) -> Result<(), RuleEngineError>;

    fn on_partition_change(&mut self, _partitions: &[TopicPartitionInfo]) {}

    fn destroy(&mut self) {}
}

/// What a node can do with the messages it processes.
pub struct RuleNodeCtx {
    tenant_id: TenantId,
    rule_chain_id: RuleChainId,
    node_id: RuleNodeId,
    node_name: String,
    chain: ActorRef,
}

impl RuleNodeCtx {
    pub(crate) fn new(tenant_id: TenantId, definition: &RuleNode, chain: ActorRef) -> Self {
        Self {
            tenant_id,
            rule_chain_id: definition.rule_chain_id,
            node_id: definition.id,
            node_name: definition.name.clone(),
            chain,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn rule_chain_id(&self) -> RuleChainId {
        self.rule_chain_id
    }

    pub fn self_id(&self) -> RuleNodeId {
        self.node_id
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Routes the message to the nodes connected with `relation_type`.
    pub fn tell_next(&self, msg: TbMsg, relation_type: &str) -> Result<(), RuleEngineError> {
        self.tell_next_multi(msg, vec![relation_type.to_owned()], None)
    }

    pub fn tell_success(&self, msg: TbMsg) -> Result<(), RuleEngineError> {
        self.tell_next(msg, relation::SUCCESS)
    }

    pub fn tell_failure(&self, msg: TbMsg, error: &str) -> Result<(), RuleEngineError> {
        self.tell_next_multi(
            msg,
            vec![relation::FAILURE.to_owned()],
            Some(error.to_owned()),
        )
    }

    pub(crate) fn tell_next_multi(
        &self,
        msg: TbMsg,
        relation_types: Vec<String>,
        failure_message: Option<String>,
    ) -> Result<(), RuleEngineError> {
        self.chain.tell(TbActorMsg::RuleNodeToRuleChainTellNext(
            RuleNodeToRuleChainTellNextMsg {
                rule_chain_id: self.rule_chain_id,
                originator_node_id: self.node_id,
                relation_types,
                msg,
                failure_message,
            },
        ))?;
        Ok(())
    }

    /// Sends the message into another rule chain, remembering this node as the return point.
    pub fn input(&self, mut msg: TbMsg, target: RuleChainId) -> Result<(), RuleEngineError> {
        msg.push_to_stack(self.rule_chain_id, self.node_id);
        debug!(
            "[{}][{}] Forwarding message {} to rule chain {}.",
            self.tenant_id,
            self.rule_chain_id,
            msg.id(),
            target
        );
        self.chain.tell(TbActorMsg::RuleChainInput(RuleChainInputMsg {
            target,
            msg: msg.with_rule_chain(target, None),
        }))?;
        Ok(())
    }

    /// Returns the message to the chain that called this one. A message that was not sent by
    /// another chain is done.
    pub fn output(&self, mut msg: TbMsg, relation_type: &str) -> Result<(), RuleEngineError> {
        match msg.pop_from_stack() {
            Some((caller_chain, caller_node)) => {
                self.chain.tell(TbActorMsg::RuleChainOutput(RuleChainOutputMsg {
                    target: caller_chain,
                    target_node: caller_node,
                    relation_type: relation_type.to_owned(),
                    msg: msg.with_rule_chain(caller_chain, Some(caller_node)),
                }))?;
            }
            None => msg.ack(),
        }
        Ok(())
    }
}

impl fmt::Debug for RuleNodeCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNodeCtx")
            .field("tenant_id", &self.tenant_id)
            .field("rule_chain_id", &self.rule_chain_id)
            .field("node_id", &self.node_id)
            .finish()
    }
}

type NodeCreator =
    Box<dyn Fn(&RuleNode) -> Result<Box<dyn TbNode>, RuleEngineError> + Send + Sync>;

/// Builds rule nodes from their definition.
pub struct NodeFactory {
    creators: HashMap<String, NodeCreator>,
}

impl NodeFactory {
    /// A factory without any node type.
    pub fn empty() -> Self {
        Self {
            creators: HashMap::new(),
        }
    }

    /// A factory with the built-in node types.
    pub fn new() -> Self {
        Self::empty()
            .register(MSG_TYPE_SWITCH_NODE, |_| Ok(Box::new(MsgTypeSwitchNode)))
            .register(RULE_CHAIN_INPUT_NODE, |definition| {
                Ok(Box::new(RuleChainInputNode::new(definition)?))
            })
            .register(RULE_CHAIN_OUTPUT_NODE, |_| Ok(Box::new(RuleChainOutputNode)))
    }

    /// Registers (or replaces) the creator of a node type.
    pub fn register<F>(mut self, node_type: &str, creator: F) -> Self
    where
        F: Fn(&RuleNode) -> Result<Box<dyn TbNode>, RuleEngineError> + Send + Sync + 'static,
    {
        self.creators.insert(node_type.to_owned(), Box::new(creator));
        self
    }

    pub fn create(&self, definition: &RuleNode) -> Result<Box<dyn TbNode>, RuleEngineError> {
        match self.creators.get(&definition.node_type) {
            Some(creator) => creator(definition),
            None => Err(RuleEngineError::UnknownNodeType(
                definition.node_type.clone(),
            )),
        }
    }
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use std::collections::BTreeMap;

    pub(crate) fn definition(node_type: &str, configuration: &[(&str, &str)]) -> RuleNode {
        RuleNode {
            id: RuleNodeId::random(),
            rule_chain_id: RuleChainId::random(),
            name: "node".to_owned(),
            node_type: node_type.to_owned(),
            configuration: configuration
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_factory_builtin_nodes() {
        let factory = NodeFactory::default();
        assert!(factory.create(&definition(MSG_TYPE_SWITCH_NODE, &[])).is_ok());
        assert!(factory.create(&definition(RULE_CHAIN_OUTPUT_NODE, &[])).is_ok());
        assert!(factory
            .create(&definition(
                RULE_CHAIN_INPUT_NODE,
                &[("ruleChainId", &RuleChainId::random().to_string())]
            ))
            .is_ok());
    }

    #[test]
    fn test_factory_unknown_type() {
        let result = NodeFactory::empty().create(&definition(MSG_TYPE_SWITCH_NODE, &[]));
        assert_eq!(
            result.err(),
            Some(RuleEngineError::UnknownNodeType(MSG_TYPE_SWITCH_NODE.to_owned()))
        );
    }
}
