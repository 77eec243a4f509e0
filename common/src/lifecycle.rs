// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::{EntityId, EntityType, NotificationRuleId, RuleChainId, TenantId};

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a rule-engine component or platform record.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ComponentLifecycleEvent {
    Created,
    Started,
    Activated,
    Suspended,
    Updated,
    Stopped,
    Deleted,
    Failed,
}

/// Notice that a record was created, updated or deleted. Broadcast to every node so actors and
/// caches can react.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLifecycleMsg {
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub event: ComponentLifecycleEvent,
}

impl ComponentLifecycleMsg {
    pub fn new(
        tenant_id: TenantId,
        entity_id: EntityId,
        event: ComponentLifecycleEvent,
    ) -> Self {
        Self {
            tenant_id,
            entity_id,
            event,
        }
    }

    pub fn rule_chain_id(&self) -> Option<RuleChainId> {
        self.entity_id.as_rule_chain_id()
    }

    pub fn notification_rule_id(&self) -> Option<NotificationRuleId> {
        self.entity_id.as_notification_rule_id()
    }

    pub fn is_tenant_deleted(&self) -> bool {
        self.entity_id.entity_type() == EntityType::Tenant
            && self.event == ComponentLifecycleEvent::Deleted
    }
}
