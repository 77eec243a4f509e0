// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Entity store contracts
//!
//! The core never owns persistence. It reads and writes records through these traits, always
//! from worker tasks, never from an actor's dispatch path while it holds chain state.
//!

use crate::Error;

use common::{
    notification::{
        NotificationRequest, NotificationRequestStatus, NotificationRule,
        NotificationRuleTriggerType,
    },
    EntityId, NotificationRequestId, NotificationRuleId, QueueStats, RuleChain,
    RuleChainId, Tenant, TenantId,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    async fn find_tenant_by_id(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Tenant>, Error>;
}

#[async_trait]
pub trait RuleChainStore: Send + Sync + 'static {
    async fn find_rule_chain_by_id(
        &self,
        tenant_id: TenantId,
        rule_chain_id: RuleChainId,
    ) -> Result<Option<RuleChain>, Error>;

    /// The tenant's root chain, if it has one.
    async fn find_root_rule_chain(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<RuleChain>, Error>;

    async fn save_rule_chain(&self, rule_chain: RuleChain) -> Result<(), Error>;

    async fn delete_rule_chain(
        &self,
        tenant_id: TenantId,
        rule_chain_id: RuleChainId,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait NotificationRuleStore: Send + Sync + 'static {
    async fn find_enabled_rules(
        &self,
        tenant_id: TenantId,
        trigger_type: NotificationRuleTriggerType,
    ) -> Result<Vec<NotificationRule>, Error>;

    async fn save_rule(&self, rule: NotificationRule) -> Result<(), Error>;

    async fn delete_rule(
        &self,
        tenant_id: TenantId,
        rule_id: NotificationRuleId,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait NotificationRequestStore: Send + Sync + 'static {
    /// Requests issued by a rule for an originator, in any status.
    async fn find_requests_by_rule_and_originator(
        &self,
        tenant_id: TenantId,
        rule_id: NotificationRuleId,
        originator: EntityId,
    ) -> Result<Vec<NotificationRequest>, Error>;

    async fn find_request_ids_by_status_and_rule(
        &self,
        tenant_id: TenantId,
        status: NotificationRequestStatus,
        rule_id: NotificationRuleId,
    ) -> Result<Vec<NotificationRequestId>, Error>;

    /// Stores the request, assigning an id when it has none.
    async fn save_request(
        &self,
        request: NotificationRequest,
    ) -> Result<NotificationRequest, Error>;

    async fn delete_request(
        &self,
        tenant_id: TenantId,
        request_id: NotificationRequestId,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait QueueStatsStore: Send + Sync + 'static {
    async fn find_queue_stats(
        &self,
        tenant_id: TenantId,
        queue_name: &str,
        service_id: &str,
    ) -> Result<Option<QueueStats>, Error>;

    async fn save_queue_stats(&self, stats: QueueStats) -> Result<QueueStats, Error>;
}

/// Counters accumulated by a rule-engine component between two stats ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub processed: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

impl ComponentStats {
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.failed == 0
    }
}

#[async_trait]
pub trait ComponentStatsStore: Send + Sync + 'static {
    async fn save_component_stats(
        &self,
        tenant_id: TenantId,
        component_id: EntityId,
        stats: ComponentStats,
    ) -> Result<(), Error>;
}
