// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::{node::RuleNodeCtx, RuleEngineError, TbNode};

use common::{msg_type, relation, TbMsg};

use async_trait::async_trait;

/// Routes each message by its type.
pub struct MsgTypeSwitchNode;

impl MsgTypeSwitchNode {
    /// Relation type of a message type.
    pub fn relation_type(message_type: &str) -> &'static str {
        match message_type {
            msg_type::POST_TELEMETRY_REQUEST => "Post telemetry",
            msg_type::POST_ATTRIBUTES_REQUEST => "Post attributes",
            msg_type::ENTITY_CREATED => "Entity Created",
            msg_type::ENTITY_DELETED => "Entity Deleted",
            msg_type::ALARM => "Alarm",
            _ => relation::OTHER,
        }
    }
}

#[async_trait]
impl TbNode for MsgTypeSwitchNode {
    async fn on_msg(&mut self, ctx: &RuleNodeCtx, msg: TbMsg) -> Result<(), RuleEngineError> {
        let relation_type = Self::relation_type(msg.msg_type());
        ctx.tell_next(msg, relation_type)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_relation_types() {
        assert_eq!(
            MsgTypeSwitchNode::relation_type(msg_type::POST_TELEMETRY_REQUEST),
            "Post telemetry"
        );
        assert_eq!(MsgTypeSwitchNode::relation_type(msg_type::ALARM), "Alarm");
        assert_eq!(MsgTypeSwitchNode::relation_type("CUSTOM"), relation::OTHER);
    }
}
