// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Identifiers
//!
//! Every platform record is identified by a uuid wrapped in a typed newtype. [`EntityId`] pairs a
//! uuid with its [`EntityType`] when the type of the record is only known at runtime (message
//! originators, actor ids, notification originators).
//!

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Kind of platform record an [`EntityId`] points to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EntityType {
    Tenant,
    Customer,
    User,
    Device,
    Asset,
    Dashboard,
    Alarm,
    RuleChain,
    RuleNode,
    NotificationRule,
    NotificationRequest,
    ApiUsageState,
    Queue,
    QueueStats,
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity_type:expr) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random id.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn id(&self) -> Uuid {
                self.0
            }

            pub fn entity_type(&self) -> EntityType {
                $entity_type
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for EntityId {
            fn from(id: $name) -> Self {
                EntityId::new($entity_type, id.0)
            }
        }
    };
}

entity_id!(
    /// Tenant identifier. The nil uuid is the system tenant.
    TenantId,
    EntityType::Tenant
);
entity_id!(RuleChainId, EntityType::RuleChain);
entity_id!(RuleNodeId, EntityType::RuleNode);
entity_id!(NotificationRuleId, EntityType::NotificationRule);
entity_id!(NotificationRequestId, EntityType::NotificationRequest);
entity_id!(QueueStatsId, EntityType::QueueStats);

impl TenantId {
    /// The system tenant, owner of platform-wide records.
    pub const SYS_TENANT_ID: TenantId = TenantId(Uuid::nil());

    pub fn is_sys_tenant(&self) -> bool {
        self.0.is_nil()
    }
}

/// Uuid of a record together with its type.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId {
    entity_type: EntityType,
    id: Uuid,
}

impl EntityId {
    pub fn new(entity_type: EntityType, id: Uuid) -> Self {
        Self { entity_type, id }
    }

    pub fn random(entity_type: EntityType) -> Self {
        Self::new(entity_type, Uuid::new_v4())
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Typed view of this id when it points to a rule chain.
    pub fn as_rule_chain_id(&self) -> Option<RuleChainId> {
        (self.entity_type == EntityType::RuleChain).then(|| RuleChainId(self.id))
    }

    /// Typed view of this id when it points to a rule node.
    pub fn as_rule_node_id(&self) -> Option<RuleNodeId> {
        (self.entity_type == EntityType::RuleNode).then(|| RuleNodeId(self.id))
    }

    /// Typed view of this id when it points to a notification rule.
    pub fn as_notification_rule_id(&self) -> Option<NotificationRuleId> {
        (self.entity_type == EntityType::NotificationRule)
            .then(|| NotificationRuleId(self.id))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}]", self.entity_type, self.id)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_id_conversions() {
        let chain = RuleChainId::random();
        let entity: EntityId = chain.into();
        assert_eq!(entity.entity_type(), EntityType::RuleChain);
        assert_eq!(entity.as_rule_chain_id(), Some(chain));
        assert_eq!(entity.as_rule_node_id(), None);
    }

    #[test]
    fn test_sys_tenant() {
        assert!(TenantId::SYS_TENANT_ID.is_sys_tenant());
        assert!(!TenantId::random().is_sys_tenant());
    }
}
