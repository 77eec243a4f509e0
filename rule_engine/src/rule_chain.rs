// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule chain actor
//!
//! Owns one rule chain: one child actor per rule node, the relations between them, and the
//! chain's counters. Messages enter at the first node (or at the node they resume from) and
//! move on each time a node tells the chain which relations its output follows.
//!
//! Messages addressed to another chain are handed to the tenant actor.
//!

use crate::{component::ComponentState, ActorSystemContext, RuleNodeActor};

use actor::{
    Actor, ActorContext, ActorId, ActorRef, Error, RuleChainToRuleNodeMsg,
    RuleNodeToRuleChainTellNextMsg, StopReason, SupervisionStrategy, TbActorMsg,
};
use common::{
    relation, ComponentLifecycleEvent, ComponentLifecycleMsg, MsgCallback, MsgError,
    MultipleMsgCallback, RuleChain, RuleNodeId, ServiceType, TbMsg, TenantId,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use std::{collections::HashMap, sync::Arc};

pub struct RuleChainActor {
    system: ActorSystemContext,
    tenant_id: TenantId,
    chain: RuleChain,
    nodes: HashMap<RuleNodeId, ActorRef>,
    state: ComponentState,
    stats_job: Option<CancellationToken>,
}

impl RuleChainActor {
    pub fn new(system: ActorSystemContext, chain: RuleChain) -> Self {
        let state = ComponentState::new(
            chain.tenant_id,
            chain.id,
            &chain.name,
            chain.id.into(),
            &chain.name,
        );
        Self {
            system,
            tenant_id: chain.tenant_id,
            chain,
            nodes: HashMap::new(),
            state,
            stats_job: None,
        }
    }

    async fn start_nodes(&mut self, ctx: &ActorContext) -> Result<(), Error> {
        for definition in &self.chain.nodes {
            if self.nodes.contains_key(&definition.id) {
                continue;
            }
            let system = self.system.clone();
            let tenant_id = self.tenant_id;
            let chain_name = self.chain.name.clone();
            let node_definition = definition.clone();
            let node = ctx
                .get_or_create_child(ActorId::entity(definition.id), move || {
                    RuleNodeActor::new(system, tenant_id, &chain_name, node_definition)
                })
                .await?;
            self.nodes.insert(definition.id, node);
        }
        Ok(())
    }

    /// Hands a message arriving from outside the chain to its first node.
    fn on_chain_entry(&self, msg: TbMsg, from_relation_type: Option<String>) {
        let target = msg.rule_node_id().or(self.chain.first_rule_node_id);
        match target {
            Some(node_id) if self.nodes.contains_key(&node_id) => {
                self.push_to_node(node_id, msg, from_relation_type)
            }
            _ => {
                debug!(
                    "[{}][{}] No rule node to process message {}.",
                    self.tenant_id,
                    self.chain.id,
                    msg.id()
                );
                msg.ack();
            }
        }
    }

    fn on_tell_next(&mut self, inner: RuleNodeToRuleChainTellNextMsg) {
        let RuleNodeToRuleChainTellNextMsg {
            originator_node_id,
            relation_types,
            msg,
            failure_message,
            ..
        } = inner;
        match &failure_message {
            Some(error) => self.state.record_failure(error),
            None => self.state.record_processed(),
        }

        let mut targets: Vec<(RuleNodeId, String)> = vec![];
        for relation_type in &relation_types {
            for node_id in self.chain.targets(originator_node_id, relation_type) {
                if !targets.iter().any(|(target, _)| *target == node_id) {
                    targets.push((node_id, relation_type.clone()));
                }
            }
        }

        match targets.len() {
            0 => {
                let failed = relation_types
                    .iter()
                    .any(|relation_type| relation_type.eq_ignore_ascii_case(relation::FAILURE));
                if failed {
                    let error = failure_message.unwrap_or_else(|| {
                        format!("Rule node {} failed", originator_node_id)
                    });
                    debug!(
                        "[{}][{}] Message {} failed at rule node {}: {}",
                        self.tenant_id,
                        self.chain.id,
                        msg.id(),
                        originator_node_id,
                        error
                    );
                    msg.fail(MsgError::Processing(error));
                } else {
                    debug!(
                        "[{}][{}] No relations {:?} from rule node {}, message {} done.",
                        self.tenant_id,
                        self.chain.id,
                        relation_types,
                        originator_node_id,
                        msg.id()
                    );
                    msg.ack();
                }
            }
            1 => {
                let (node_id, relation_type) = targets.remove(0);
                self.push_to_node(node_id, msg, Some(relation_type));
            }
            count => {
                let callback: Arc<dyn MsgCallback> =
                    Arc::new(MultipleMsgCallback::new(count, msg.callback()));
                for (node_id, relation_type) in targets {
                    self.push_to_node(
                        node_id,
                        msg.clone().with_callback(callback.clone()),
                        Some(relation_type),
                    );
                }
            }
        }
    }

    fn push_to_node(&self, node_id: RuleNodeId, msg: TbMsg, from_relation_type: Option<String>) {
        match self.nodes.get(&node_id) {
            Some(node) => {
                let msg = msg.with_rule_chain(self.chain.id, Some(node_id));
                if let Err(e) = node.tell(TbActorMsg::RuleChainToRuleNode(
                    RuleChainToRuleNodeMsg {
                        msg,
                        from_relation_type,
                    },
                )) {
                    debug!(
                        "[{}][{}] Rule node {} is not available: {}",
                        self.tenant_id, self.chain.id, node_id, e
                    );
                }
            }
            None => msg.fail(MsgError::RuleChainUnavailable(format!(
                "Rule node {} is not part of rule chain {}",
                node_id, self.chain.id
            ))),
        }
    }

    async fn on_lifecycle(&mut self, msg: ComponentLifecycleMsg, ctx: &mut ActorContext) {
        match msg.event {
            ComponentLifecycleEvent::Updated => self.reload(ctx).await,
            ComponentLifecycleEvent::Deleted
            | ComponentLifecycleEvent::Stopped
            | ComponentLifecycleEvent::Suspended => {
                info!(
                    "[{}][{}] Stopping rule chain ({:?}).",
                    self.tenant_id, self.chain.id, msg.event
                );
                ctx.stop(StopReason::Normal, None);
            }
            event => debug!(
                "[{}][{}] Ignoring lifecycle event {:?}.",
                self.tenant_id, self.chain.id, event
            ),
        }
    }

    /// Applies the stored definition. Nodes that changed are restarted, removed ones stopped.
    async fn reload(&mut self, ctx: &mut ActorContext) {
        let chain = match self
            .system
            .rule_chain_store
            .find_rule_chain_by_id(self.tenant_id, self.chain.id)
            .await
        {
            Ok(Some(chain)) => chain,
            Ok(None) => {
                info!(
                    "[{}][{}] Rule chain no longer exists, stopping.",
                    self.tenant_id, self.chain.id
                );
                ctx.stop(StopReason::Normal, None);
                return;
            }
            Err(e) => {
                self.state.log_lifecycle_event(
                    &self.system,
                    ComponentLifecycleEvent::Updated,
                    Some(e.to_string()),
                );
                return;
            }
        };

        let stale: Vec<RuleNodeId> = self
            .chain
            .nodes
            .iter()
            .filter(|old| chain.node(old.id) != Some(*old))
            .map(|old| old.id)
            .collect();
        for node_id in stale {
            if let Some(node) = self.nodes.remove(&node_id) {
                let _ = node.stop(StopReason::Normal).await;
            }
        }

        self.chain = chain;
        self.state.rename(&self.chain.name, &self.chain.name);
        match self.start_nodes(ctx).await {
            Ok(()) => self.state.log_lifecycle_event(
                &self.system,
                ComponentLifecycleEvent::Updated,
                None,
            ),
            Err(e) => self.state.log_lifecycle_event(
                &self.system,
                ComponentLifecycleEvent::Updated,
                Some(e.to_string()),
            ),
        }
    }

    fn broadcast_to_nodes(&self, msg: TbActorMsg, high_priority: bool) {
        for node in self.nodes.values() {
            let result = if high_priority {
                node.tell_with_high_priority(msg.clone())
            } else {
                node.tell(msg.clone())
            };
            if let Err(e) = result {
                debug!("Broadcast to rule node {} failed: {}", node.id(), e);
            }
        }
    }
}

#[async_trait]
impl Actor for RuleChainActor {
    fn supervision_strategy(&self) -> SupervisionStrategy {
        self.system.settings.init_strategy()
    }

    async fn init(&mut self, ctx: &mut ActorContext) -> Result<(), Error> {
        self.start_nodes(ctx).await?;
        self.stats_job = Some(ctx.system().schedule_periodically(
            ctx.myself(),
            self.system.settings.stats_persist_frequency,
            || TbActorMsg::StatsPersistTick,
        ));
        self.state
            .log_lifecycle_event(&self.system, ComponentLifecycleEvent::Started, None);
        Ok(())
    }

    async fn process(
        &mut self,
        msg: TbActorMsg,
        ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::ComponentLifecycle(msg) => self.on_lifecycle(msg, ctx).await,
            TbActorMsg::QueueToRuleEngine(inner) => self.on_chain_entry(inner.msg, None),
            TbActorMsg::RuleNodeToRuleChainTellNext(inner) => self.on_tell_next(inner),
            TbActorMsg::RuleChainToRuleChain(inner) => {
                if inner.target == self.chain.id {
                    let msg = inner.msg.with_rule_chain(self.chain.id, None);
                    self.on_chain_entry(msg, Some(inner.relation_type));
                } else {
                    let _ = ctx.tell_parent(TbActorMsg::RuleChainToRuleChain(inner));
                }
            }
            TbActorMsg::RuleChainInput(inner) => {
                if inner.target == self.chain.id {
                    self.on_chain_entry(inner.msg, None);
                } else {
                    let _ = ctx.tell_parent(TbActorMsg::RuleChainInput(inner));
                }
            }
            TbActorMsg::RuleChainOutput(inner) => {
                if inner.target == self.chain.id {
                    self.on_tell_next(RuleNodeToRuleChainTellNextMsg {
                        rule_chain_id: self.chain.id,
                        originator_node_id: inner.target_node,
                        relation_types: vec![inner.relation_type],
                        msg: inner.msg,
                        failure_message: None,
                    });
                } else {
                    let _ = ctx.tell_parent(TbActorMsg::RuleChainOutput(inner));
                }
            }
            TbActorMsg::PartitionChange(inner) => {
                if inner.service_type == ServiceType::RuleEngine
                    && !self.system.partition_service.is_my_partition(
                        ServiceType::RuleEngine,
                        self.tenant_id,
                        self.tenant_id.into(),
                    )
                {
                    info!(
                        "[{}][{}] Tenant partition moved to another node, stopping.",
                        self.tenant_id, self.chain.id
                    );
                    ctx.stop(StopReason::Normal, None);
                } else {
                    self.broadcast_to_nodes(TbActorMsg::PartitionChange(inner), true);
                }
            }
            TbActorMsg::StatsPersistTick => {
                self.state.persist_stats(&self.system).await;
                self.broadcast_to_nodes(TbActorMsg::StatsPersistTick, false);
            }
            TbActorMsg::RuleChainToRuleNode(_) => return Ok(false),
        }
        Ok(true)
    }

    async fn destroy(
        &mut self,
        reason: StopReason,
        cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
        if let Some(job) = self.stats_job.take() {
            job.cancel();
        }
        self.state.persist_stats(&self.system).await;
        match (reason, cause) {
            (StopReason::InitFailed, Some(cause)) => {
                self.state.on_init_failed(&self.system, cause.to_string())
            }
            (_, cause) => {
                if let Some(cause) = &cause {
                    warn!(
                        "[{}][{}] Rule chain stopped with error: {}",
                        self.tenant_id, self.chain.id, cause
                    );
                }
                self.state.log_lifecycle_event(
                    &self.system,
                    ComponentLifecycleEvent::Stopped,
                    cause.map(|e| e.to_string()),
                )
            }
        }
    }
}
