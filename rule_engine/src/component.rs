// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule-engine component
//!
//! State shared by rule chain and rule node actors: their identity for lifecycle
//! notifications, and the processing counters flushed on every stats tick.
//!
//! Lifecycle events are turned into `ComponentLifecycle` notification triggers. Update failures
//! never are, and neither are start failures carrying an error: a start that keeps failing ends
//! in an init-failed stop, which [`ComponentState::on_init_failed`] reports once.
//!

use crate::ActorSystemContext;

use common::{
    notification::{ComponentLifecycleTrigger, NotificationRuleTrigger},
    ComponentLifecycleEvent, EntityId, RuleChainId, TenantId,
};
use store::ComponentStats;

use tracing::{debug, error, warn};

pub(crate) struct ComponentState {
    tenant_id: TenantId,
    rule_chain_id: RuleChainId,
    rule_chain_name: String,
    component_id: EntityId,
    component_name: String,
    stats: ComponentStats,
}

impl ComponentState {
    pub(crate) fn new(
        tenant_id: TenantId,
        rule_chain_id: RuleChainId,
        rule_chain_name: &str,
        component_id: EntityId,
        component_name: &str,
    ) -> Self {
        Self {
            tenant_id,
            rule_chain_id,
            rule_chain_name: rule_chain_name.to_owned(),
            component_id,
            component_name: component_name.to_owned(),
            stats: ComponentStats::default(),
        }
    }

    pub(crate) fn rename(&mut self, rule_chain_name: &str, component_name: &str) {
        self.rule_chain_name = rule_chain_name.to_owned();
        self.component_name = component_name.to_owned();
    }

    /// Records a lifecycle event of the component and notifies the notification rules about it.
    pub(crate) fn log_lifecycle_event(
        &self,
        ctx: &ActorSystemContext,
        event: ComponentLifecycleEvent,
        error: Option<String>,
    ) {
        match &error {
            Some(error) => warn!(
                "[{}][{}] Component {} {:?} with error: {}",
                self.tenant_id, self.component_id, self.component_name, event, error
            ),
            None => debug!(
                "[{}][{}] Component {} {:?}.",
                self.tenant_id, self.component_id, self.component_name, event
            ),
        }
        if is_reported(event, error.is_some()) {
            self.notify(ctx, event, error);
        }
    }

    /// Reports a start that failed for good.
    pub(crate) fn on_init_failed(&self, ctx: &ActorSystemContext, cause: String) {
        error!(
            "[{}][{}] Failed to start component {}: {}",
            self.tenant_id, self.component_id, self.component_name, cause
        );
        self.notify(ctx, ComponentLifecycleEvent::Started, Some(cause));
    }

    fn notify(
        &self,
        ctx: &ActorSystemContext,
        event: ComponentLifecycleEvent,
        error: Option<String>,
    ) {
        ctx.notification_rule_processor
            .process(NotificationRuleTrigger::ComponentLifecycle(
                ComponentLifecycleTrigger {
                    tenant_id: self.tenant_id,
                    rule_chain_id: self.rule_chain_id,
                    rule_chain_name: self.rule_chain_name.clone(),
                    component_id: self.component_id,
                    component_name: self.component_name.clone(),
                    event_type: event,
                    error,
                },
            ));
    }

    pub(crate) fn record_processed(&mut self) {
        self.stats.processed += 1;
    }

    pub(crate) fn record_failure(&mut self, error: &str) {
        self.stats.processed += 1;
        self.stats.failed += 1;
        self.stats.last_error = Some(error.to_owned());
    }

    /// Persists and resets the counters. Nothing is written when nothing happened.
    pub(crate) async fn persist_stats(&mut self, ctx: &ActorSystemContext) {
        if self.stats.is_empty() {
            return;
        }
        let stats = std::mem::take(&mut self.stats);
        if let Err(e) = ctx
            .stats_store
            .save_component_stats(self.tenant_id, self.component_id, stats)
            .await
        {
            warn!(
                "[{}][{}] Failed to persist stats: {}",
                self.tenant_id, self.component_id, e
            );
        }
    }
}

fn is_reported(event: ComponentLifecycleEvent, failed: bool) -> bool {
    match event {
        ComponentLifecycleEvent::Updated | ComponentLifecycleEvent::Started => !failed,
        _ => true,
    }
}
