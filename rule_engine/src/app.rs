// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Application actor
//!
//! Root of the rule-engine tree. Dispatches queue messages to tenant actors and fans
//! lifecycle and partition changes out to them.
//!

use crate::{ActorSystemContext, TenantActor};

use actor::{Actor, ActorContext, ActorId, ActorRef, Error, StopReason, SystemRef, TbActorMsg};
use common::{ComponentLifecycleEvent, ComponentLifecycleMsg, EntityType, MsgError, TenantId};

use async_trait::async_trait;
use tracing::{debug, info};

use std::collections::HashSet;

pub const APP_ACTOR_NAME: &str = "app";

pub struct AppActor {
    system: ActorSystemContext,
    deleted_tenants: HashSet<TenantId>,
}

impl AppActor {
    pub fn new(system: ActorSystemContext) -> Self {
        Self {
            system,
            deleted_tenants: HashSet::new(),
        }
    }

    /// Creates the root actor of the rule-engine tree.
    pub async fn create(
        actor_system: &SystemRef,
        system: ActorSystemContext,
    ) -> Result<ActorRef, Error> {
        actor_system
            .create_root_actor(ActorId::named(APP_ACTOR_NAME), AppActor::new(system))
            .await
    }

    async fn on_lifecycle(&mut self, msg: ComponentLifecycleMsg, ctx: &ActorContext) {
        let tenant_actor_id = ActorId::entity(msg.tenant_id);
        if msg.entity_id.entity_type() == EntityType::Tenant {
            match msg.event {
                ComponentLifecycleEvent::Deleted => {
                    info!("[{}] Tenant deleted.", msg.tenant_id);
                    self.deleted_tenants.insert(msg.tenant_id);
                    if let Err(e) = ctx.stop_child(&tenant_actor_id, StopReason::Normal).await {
                        debug!("[{}] No tenant actor to stop: {}", msg.tenant_id, e);
                    }
                }
                ComponentLifecycleEvent::Created => {
                    self.deleted_tenants.remove(&msg.tenant_id);
                }
                event => debug!("[{}] Tenant {:?}.", msg.tenant_id, event),
            }
            return;
        }
        if let Some(tenant_actor) = ctx.get_child(&tenant_actor_id).await {
            let _ = tenant_actor.tell_with_high_priority(TbActorMsg::ComponentLifecycle(msg));
        }
    }
}

#[async_trait]
impl Actor for AppActor {
    async fn process(
        &mut self,
        msg: TbActorMsg,
        ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::QueueToRuleEngine(inner) => {
                let tenant_id = inner.tenant_id;
                if self.deleted_tenants.contains(&tenant_id) {
                    inner.msg.fail(MsgError::TenantNotFound(tenant_id));
                    return Ok(true);
                }
                let system = self.system.clone();
                let tenant_actor = ctx
                    .get_or_create_child(ActorId::entity(tenant_id), move || {
                        TenantActor::new(system, tenant_id)
                    })
                    .await;
                match tenant_actor {
                    Ok(tenant_actor) => {
                        let _ = tenant_actor.tell(TbActorMsg::QueueToRuleEngine(inner));
                    }
                    Err(e) => {
                        debug!("[{}] Can not create tenant actor: {}", tenant_id, e);
                        inner.msg.fail(MsgError::ActorStopped);
                    }
                }
            }
            TbActorMsg::ComponentLifecycle(msg) => self.on_lifecycle(msg, ctx).await,
            TbActorMsg::PartitionChange(inner) => {
                ctx.broadcast_to_children(TbActorMsg::PartitionChange(inner), true)
                    .await
            }
            TbActorMsg::RuleChainToRuleNode(_)
            | TbActorMsg::RuleNodeToRuleChainTellNext(_)
            | TbActorMsg::RuleChainToRuleChain(_)
            | TbActorMsg::RuleChainInput(_)
            | TbActorMsg::RuleChainOutput(_)
            | TbActorMsg::StatsPersistTick => return Ok(false),
        }
        Ok(true)
    }
}
