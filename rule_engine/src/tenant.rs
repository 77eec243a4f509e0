// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Tenant actor
//!
//! Parent of a tenant's rule chain actors. Chain actors are created on the first message that
//! needs them; messages without a chain go to the tenant's root chain.
//!

use crate::{ActorSystemContext, RuleChainActor};

use actor::{Actor, ActorContext, ActorId, Error, StopReason, SupervisionStrategy, TbActorMsg};
use common::{
    ComponentLifecycleMsg, EntityType, MsgError, RuleChainId, ServiceType, TenantId,
};

use async_trait::async_trait;
use tracing::{debug, info, warn};

pub struct TenantActor {
    system: ActorSystemContext,
    tenant_id: TenantId,
    missing: bool,
    root_chain_id: Option<RuleChainId>,
}

impl TenantActor {
    pub fn new(system: ActorSystemContext, tenant_id: TenantId) -> Self {
        Self {
            system,
            tenant_id,
            missing: false,
            root_chain_id: None,
        }
    }

    async fn load_root_chain(&mut self) -> Result<(), Error> {
        self.root_chain_id = self
            .system
            .rule_chain_store
            .find_root_rule_chain(self.tenant_id)
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .map(|chain| chain.id);
        Ok(())
    }

    /// Delivers a message to a chain actor of this tenant, creating it when needed. Failures
    /// are reported to the message callback.
    async fn tell_chain(&self, ctx: &ActorContext, chain_id: RuleChainId, msg: TbActorMsg) {
        let id = ActorId::entity(chain_id);
        let chain_actor = match ctx.get_child(&id).await {
            Some(chain_actor) => chain_actor,
            None => {
                let chain = match self
                    .system
                    .rule_chain_store
                    .find_rule_chain_by_id(self.tenant_id, chain_id)
                    .await
                {
                    Ok(Some(chain)) => chain,
                    Ok(None) => {
                        debug!("[{}] Rule chain {} not found.", self.tenant_id, chain_id);
                        msg.fail(MsgError::RuleChainUnavailable(format!(
                            "Rule chain with id {} not found",
                            chain_id
                        )));
                        return;
                    }
                    Err(e) => {
                        warn!(
                            "[{}] Failed to load rule chain {}: {}",
                            self.tenant_id, chain_id, e
                        );
                        msg.fail(MsgError::RuleChainUnavailable(e.to_string()));
                        return;
                    }
                };
                let system = self.system.clone();
                match ctx
                    .get_or_create_child(id, move || RuleChainActor::new(system, chain))
                    .await
                {
                    Ok(chain_actor) => chain_actor,
                    Err(e) => {
                        debug!(
                            "[{}] Can not create rule chain actor {}: {}",
                            self.tenant_id, chain_id, e
                        );
                        msg.fail(MsgError::ActorStopped);
                        return;
                    }
                }
            }
        };
        let _ = chain_actor.tell(msg);
    }

    async fn on_lifecycle(&mut self, msg: ComponentLifecycleMsg, ctx: &ActorContext) {
        if msg.entity_id.entity_type() != EntityType::RuleChain {
            debug!(
                "[{}] Ignoring lifecycle event {:?} of {}.",
                self.tenant_id, msg.event, msg.entity_id
            );
            return;
        }
        if let Err(e) = self.load_root_chain().await {
            warn!("[{}] Failed to refresh root rule chain: {}", self.tenant_id, e);
        }
        if let Some(chain_actor) = ctx.get_child(&ActorId::entity(msg.entity_id)).await {
            let _ = chain_actor.tell_with_high_priority(TbActorMsg::ComponentLifecycle(msg));
        }
    }
}

#[async_trait]
impl Actor for TenantActor {
    fn supervision_strategy(&self) -> SupervisionStrategy {
        self.system.settings.init_strategy()
    }

    async fn init(&mut self, _ctx: &mut ActorContext) -> Result<(), Error> {
        let tenant = self
            .system
            .tenant_store
            .find_tenant_by_id(self.tenant_id)
            .await
            .map_err(|e| Error::Init(e.to_string()))?;
        if tenant.is_none() {
            self.missing = true;
            info!("[{}] Started tenant actor for missing tenant.", self.tenant_id);
            return Ok(());
        }
        self.load_root_chain()
            .await
            .map_err(|e| Error::Init(e.to_string()))?;
        debug!(
            "[{}] Tenant actor started, root rule chain {:?}.",
            self.tenant_id, self.root_chain_id
        );
        Ok(())
    }

    async fn process(
        &mut self,
        msg: TbActorMsg,
        ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::QueueToRuleEngine(inner) => {
                if self.missing {
                    inner.msg.fail(MsgError::TenantNotFound(self.tenant_id));
                    return Ok(true);
                }
                match inner.msg.rule_chain_id().or(self.root_chain_id) {
                    Some(chain_id) => {
                        self.tell_chain(ctx, chain_id, TbActorMsg::QueueToRuleEngine(inner))
                            .await
                    }
                    None => inner.msg.fail(MsgError::RuleChainUnavailable(
                        "No root rule chain available".to_owned(),
                    )),
                }
            }
            TbActorMsg::RuleChainToRuleChain(inner) => {
                self.tell_chain(ctx, inner.target, TbActorMsg::RuleChainToRuleChain(inner))
                    .await
            }
            TbActorMsg::RuleChainInput(inner) => {
                self.tell_chain(ctx, inner.target, TbActorMsg::RuleChainInput(inner))
                    .await
            }
            TbActorMsg::RuleChainOutput(inner) => {
                self.tell_chain(ctx, inner.target, TbActorMsg::RuleChainOutput(inner))
                    .await
            }
            TbActorMsg::ComponentLifecycle(msg) => self.on_lifecycle(msg, ctx).await,
            TbActorMsg::PartitionChange(inner) => {
                if inner.service_type == ServiceType::RuleEngine
                    && !self.system.partition_service.is_my_partition(
                        ServiceType::RuleEngine,
                        self.tenant_id,
                        self.tenant_id.into(),
                    )
                {
                    info!(
                        "[{}] Tenant partition moved to another node, stopping.",
                        self.tenant_id
                    );
                    ctx.stop(StopReason::Normal, None);
                } else {
                    ctx.broadcast_to_children(TbActorMsg::PartitionChange(inner), true)
                        .await;
                }
            }
            TbActorMsg::RuleChainToRuleNode(_)
            | TbActorMsg::RuleNodeToRuleChainTellNext(_)
            | TbActorMsg::StatsPersistTick => return Ok(false),
        }
        Ok(true)
    }

    async fn destroy(
        &mut self,
        reason: StopReason,
        _cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
        debug!("[{}] Tenant actor stopped ({:?}).", self.tenant_id, reason);
    }
}
