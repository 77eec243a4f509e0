// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule chain definitions
//!

use crate::{RuleChainId, RuleNodeId, TenantId};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Tenant record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

/// A rule node inside a chain. `node_type` selects the implementation through the node
/// factory; `configuration` is interpreted by that implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleNode {
    pub id: RuleNodeId,
    pub rule_chain_id: RuleChainId,
    pub name: String,
    pub node_type: String,
    pub configuration: BTreeMap<String, String>,
}

/// Directed edge between two nodes of the same chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRelation {
    pub from: RuleNodeId,
    pub to: RuleNodeId,
    pub relation_type: String,
}

/// Rule chain definition with its nodes and relations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleChain {
    pub id: RuleChainId,
    pub tenant_id: TenantId,
    pub name: String,
    /// The tenant's root chain receives messages that do not name a chain.
    pub root: bool,
    pub first_rule_node_id: Option<RuleNodeId>,
    pub nodes: Vec<RuleNode>,
    pub relations: Vec<NodeRelation>,
}

impl RuleChain {
    pub fn node(&self, id: RuleNodeId) -> Option<&RuleNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Targets of the relations leaving `from` with the given relation type.
    pub fn targets(&self, from: RuleNodeId, relation_type: &str) -> Vec<RuleNodeId> {
        self.relations
            .iter()
            .filter(|relation| {
                relation.from == from
                    && relation.relation_type.eq_ignore_ascii_case(relation_type)
            })
            .map(|relation| relation.to)
            .collect()
    }
}
