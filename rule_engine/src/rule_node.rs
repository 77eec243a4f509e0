// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule node actor
//!
//! Runs one rule node. The node is built by the node factory during `init`, so an unknown type
//! or a bad configuration is an init failure of this actor only: its chain keeps running and
//! messages routed to the node fail.
//!

use crate::{component::ComponentState, node::RuleNodeCtx, ActorSystemContext, TbNode};

use actor::{Actor, ActorContext, Error, StopReason, SupervisionStrategy, TbActorMsg};
use common::{ComponentLifecycleEvent, MsgError, RuleNode, TbMsg, TenantId};

use async_trait::async_trait;
use tracing::{debug, warn};

struct RunningNode {
    node: Box<dyn TbNode>,
    ctx: RuleNodeCtx,
}

pub struct RuleNodeActor {
    system: ActorSystemContext,
    tenant_id: TenantId,
    definition: RuleNode,
    running: Option<RunningNode>,
    state: ComponentState,
}

impl RuleNodeActor {
    pub fn new(
        system: ActorSystemContext,
        tenant_id: TenantId,
        rule_chain_name: &str,
        definition: RuleNode,
    ) -> Self {
        let state = ComponentState::new(
            tenant_id,
            definition.rule_chain_id,
            rule_chain_name,
            definition.id.into(),
            &definition.name,
        );
        Self {
            system,
            tenant_id,
            definition,
            running: None,
            state,
        }
    }

    async fn on_msg(&mut self, msg: TbMsg) {
        let Some(running) = self.running.as_mut() else {
            msg.fail(MsgError::Processing(format!(
                "Rule node {} is not initialized",
                self.definition.id
            )));
            return;
        };
        match running.node.on_msg(&running.ctx, msg.clone()).await {
            Ok(()) => self.state.record_processed(),
            Err(e) => {
                let error = e.to_string();
                warn!(
                    "[{}][{}] Rule node '{}' failed to process message {}: {}",
                    self.tenant_id,
                    self.definition.id,
                    self.definition.name,
                    msg.id(),
                    error
                );
                self.state.record_failure(&error);
                if let Err(e) = running.ctx.tell_failure(msg, &error) {
                    debug!("Failure of message not routed: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl Actor for RuleNodeActor {
    fn supervision_strategy(&self) -> SupervisionStrategy {
        self.system.settings.init_strategy()
    }

    async fn init(&mut self, ctx: &mut ActorContext) -> Result<(), Error> {
        let chain = ctx
            .parent()
            .cloned()
            .ok_or_else(|| Error::Init("rule node without rule chain".to_owned()))?;
        match self.system.node_factory.create(&self.definition) {
            Ok(node) => {
                self.running = Some(RunningNode {
                    node,
                    ctx: RuleNodeCtx::new(self.tenant_id, &self.definition, chain),
                });
                self.state
                    .log_lifecycle_event(&self.system, ComponentLifecycleEvent::Started, None);
                Ok(())
            }
            Err(e) => {
                self.state.log_lifecycle_event(
                    &self.system,
                    ComponentLifecycleEvent::Started,
                    Some(e.to_string()),
                );
                Err(Error::Init(e.to_string()))
            }
        }
    }

    async fn process(
        &mut self,
        msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::RuleChainToRuleNode(inner) => {
                self.on_msg(inner.msg).await;
                Ok(true)
            }
            TbActorMsg::PartitionChange(inner) => {
                if let Some(running) = self.running.as_mut() {
                    running.node.on_partition_change(&inner.partitions);
                }
                Ok(true)
            }
            TbActorMsg::StatsPersistTick => {
                self.state.persist_stats(&self.system).await;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn destroy(
        &mut self,
        reason: StopReason,
        cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
        if let Some(mut running) = self.running.take() {
            running.node.destroy();
        }
        self.state.persist_stats(&self.system).await;
        match (reason, cause) {
            (StopReason::InitFailed, Some(cause)) => {
                self.state.on_init_failed(&self.system, cause.to_string())
            }
            (_, cause) => self.state.log_lifecycle_event(
                &self.system,
                ComponentLifecycleEvent::Stopped,
                cause.map(|e| e.to_string()),
            ),
        }
    }
}
