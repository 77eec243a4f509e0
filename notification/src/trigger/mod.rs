// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Trigger processors
//!
//! One processor per trigger type decides whether a trigger matches a rule's filter or its
//! clear rule, and builds the info payload of the resulting notification.
//!

mod alarm;
mod api_usage;
mod component_lifecycle;
mod entity_action;
mod task_failure;

pub use alarm::AlarmTriggerProcessor;
pub use api_usage::ApiUsageLimitTriggerProcessor;
pub use component_lifecycle::ComponentLifecycleTriggerProcessor;
pub use entity_action::EntityActionTriggerProcessor;
pub use task_failure::TaskProcessingFailureTriggerProcessor;

use crate::NotificationError;

use common::notification::{
    NotificationInfo, NotificationRuleTrigger, NotificationRuleTriggerType, TriggerConfig,
};
use store::TenantStore;

use async_trait::async_trait;

use std::{collections::BTreeSet, sync::Arc};

#[async_trait]
pub trait TriggerProcessor: Send + Sync + 'static {
    fn trigger_type(&self) -> NotificationRuleTriggerType;

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, config: &TriggerConfig) -> bool;

    /// Whether the trigger withdraws the notifications previously issued by the rule.
    fn matches_clear_rule(
        &self,
        _trigger: &NotificationRuleTrigger,
        _config: &TriggerConfig,
    ) -> bool {
        false
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError>;
}

/// The processors of every trigger type.
pub fn default_trigger_processors(
    tenant_store: Arc<dyn TenantStore>,
) -> Vec<Arc<dyn TriggerProcessor>> {
    vec![
        Arc::new(EntityActionTriggerProcessor),
        Arc::new(AlarmTriggerProcessor),
        Arc::new(ComponentLifecycleTriggerProcessor),
        Arc::new(ApiUsageLimitTriggerProcessor::new(tenant_store)),
        Arc::new(TaskProcessingFailureTriggerProcessor),
    ]
}

pub(crate) fn empty_or_contains<T: Ord>(set: &BTreeSet<T>, value: &T) -> bool {
    set.is_empty() || set.contains(value)
}
