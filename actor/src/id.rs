// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor identity
//!
//! Rule-engine actors are keyed by the entity they run (tenant, rule chain, rule node). A few
//! singletons, like the application root, use a fixed name instead.
//!

use common::EntityId;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Identity of an actor inside the system registry.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ActorId {
    /// Singleton actor, e.g. `app`.
    Named(String),
    /// Actor running an entity.
    Entity(EntityId),
}

impl ActorId {
    pub fn named(name: &str) -> Self {
        ActorId::Named(name.to_owned())
    }

    pub fn entity(id: impl Into<EntityId>) -> Self {
        ActorId::Entity(id.into())
    }

    /// The entity run by this actor, if any.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            ActorId::Named(_) => None,
            ActorId::Entity(id) => Some(*id),
        }
    }
}

impl From<EntityId> for ActorId {
    fn from(id: EntityId) -> Self {
        ActorId::Entity(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Named(name) => write!(f, "{}", name),
            ActorId::Entity(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{RuleChainId, TenantId};

    #[test]
    fn test_actor_id() {
        let chain_id = RuleChainId::random();
        let id = ActorId::entity(chain_id);
        assert_eq!(id.entity_id(), Some(chain_id.into()));
        assert_ne!(id, ActorId::entity(TenantId::new(chain_id.id())));
        assert_eq!(ActorId::named("app").to_string(), "app");
        assert_eq!(ActorId::named("app").entity_id(), None);
    }
}
