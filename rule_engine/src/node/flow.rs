// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::{node::RuleNodeCtx, RuleEngineError, TbNode};

use common::{RuleChainId, RuleNode, TbMsg};

use async_trait::async_trait;
use uuid::Uuid;

const RULE_CHAIN_ID: &str = "ruleChainId";

/// Sends messages into the configured rule chain.
#[derive(Debug)]
pub struct RuleChainInputNode {
    target: RuleChainId,
}

impl RuleChainInputNode {
    pub fn new(definition: &RuleNode) -> Result<Self, RuleEngineError> {
        let invalid = |reason: String| RuleEngineError::InvalidConfiguration {
            node: definition.id,
            reason,
        };
        let value = definition
            .configuration
            .get(RULE_CHAIN_ID)
            .ok_or_else(|| invalid(format!("missing '{}'", RULE_CHAIN_ID)))?;
        let id = Uuid::parse_str(value)
            .map_err(|e| invalid(format!("bad '{}': {}", RULE_CHAIN_ID, e)))?;
        Ok(Self {
            target: RuleChainId::new(id),
        })
    }

    pub fn target(&self) -> RuleChainId {
        self.target
    }
}

#[async_trait]
impl TbNode for RuleChainInputNode {
    async fn on_msg(&mut self, ctx: &RuleNodeCtx, msg: TbMsg) -> Result<(), RuleEngineError> {
        ctx.input(msg, self.target)
    }
}

/// Returns messages to the calling rule chain, using the node name as relation type.
#[derive(Debug)]
pub struct RuleChainOutputNode;

#[async_trait]
impl TbNode for RuleChainOutputNode {
    async fn on_msg(&mut self, ctx: &RuleNodeCtx, msg: TbMsg) -> Result<(), RuleEngineError> {
        let relation_type = ctx.node_name().to_owned();
        ctx.output(msg, &relation_type)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::node::{tests::definition, RULE_CHAIN_INPUT_NODE};

    #[test]
    fn test_input_node_configuration() {
        let target = RuleChainId::random();
        let node = RuleChainInputNode::new(&definition(
            RULE_CHAIN_INPUT_NODE,
            &[(RULE_CHAIN_ID, &target.to_string())],
        ))
        .unwrap();
        assert_eq!(node.target(), target);

        let missing = RuleChainInputNode::new(&definition(RULE_CHAIN_INPUT_NODE, &[]));
        assert!(matches!(
            missing,
            Err(RuleEngineError::InvalidConfiguration { .. })
        ));
        let bad = RuleChainInputNode::new(&definition(
            RULE_CHAIN_INPUT_NODE,
            &[(RULE_CHAIN_ID, "not-a-uuid")],
        ));
        assert!(matches!(bad, Err(RuleEngineError::InvalidConfiguration { .. })));
    }
}
