// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system context
//!
//! Services shared by every actor of the rule-engine tree. Cloning is cheap; each actor keeps
//! its own copy.
//!

use crate::NodeFactory;

use actor::ActorSettings;
use notification::NotificationRuleProcessor;
use queue::PartitionService;
use store::{ComponentStatsStore, RuleChainStore, TenantStore};

use std::sync::Arc;

#[derive(Clone)]
pub struct ActorSystemContext {
    pub tenant_store: Arc<dyn TenantStore>,
    pub rule_chain_store: Arc<dyn RuleChainStore>,
    pub stats_store: Arc<dyn ComponentStatsStore>,
    pub partition_service: Arc<dyn PartitionService>,
    pub notification_rule_processor: Arc<dyn NotificationRuleProcessor>,
    pub node_factory: Arc<NodeFactory>,
    pub settings: ActorSettings,
}
