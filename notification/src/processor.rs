// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification rule processor
//!
//! Turns triggers into notification requests. Evaluation always runs on the
//! [`NotificationExecutor`]; callers are never blocked. For every enabled rule of the trigger's
//! scope, the trigger either withdraws what the rule already issued (clear rule) or, when it
//! matches the rule's filter and the rule is within its rate limit, issues one request per entry
//! of the rule's escalation table.
//!

use crate::{
    trigger::TriggerProcessor, LimitedApi, NotificationCenter, NotificationDeduplicationService,
    NotificationError, NotificationExecutor, NotificationRulesCache, RateLimitService,
};

use common::{
    notification::{
        NotificationInfo, NotificationRequest, NotificationRequestConfig,
        NotificationRequestStatus, NotificationRule, NotificationRuleTrigger,
        NotificationRuleTriggerType,
    },
    ComponentLifecycleEvent, ComponentLifecycleMsg, EntityId, ServiceType, TenantId,
};
use queue::PartitionService;
use store::NotificationRequestStore;

use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use std::{collections::HashMap, sync::Arc};

/// Intake of notification rule triggers.
pub trait NotificationRuleProcessor: Send + Sync + 'static {
    /// Evaluates the trigger in the background.
    fn process(&self, trigger: NotificationRuleTrigger);
}

struct ProcessorContext {
    rules_cache: Arc<NotificationRulesCache>,
    request_store: Arc<dyn NotificationRequestStore>,
    deduplication: Arc<NotificationDeduplicationService>,
    rate_limits: Arc<dyn RateLimitService>,
    center: Arc<dyn NotificationCenter>,
    processors: HashMap<NotificationRuleTriggerType, Arc<dyn TriggerProcessor>>,
}

/// Default [`NotificationRuleProcessor`].
#[derive(Clone)]
pub struct DefaultNotificationRuleProcessor {
    ctx: Arc<ProcessorContext>,
    partition_service: Arc<dyn PartitionService>,
    executor: NotificationExecutor,
}

impl DefaultNotificationRuleProcessor {
    /// # Errors
    ///
    /// Returns `NotificationError::DuplicateProcessor` when two processors handle the same
    /// trigger type.
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules_cache: Arc<NotificationRulesCache>,
        request_store: Arc<dyn NotificationRequestStore>,
        deduplication: Arc<NotificationDeduplicationService>,
        partition_service: Arc<dyn PartitionService>,
        rate_limits: Arc<dyn RateLimitService>,
        center: Arc<dyn NotificationCenter>,
        executor: NotificationExecutor,
        processors: Vec<Arc<dyn TriggerProcessor>>,
    ) -> Result<Self, NotificationError> {
        let mut by_type = HashMap::new();
        for processor in processors {
            let trigger_type = processor.trigger_type();
            if by_type.insert(trigger_type, processor).is_some() {
                return Err(NotificationError::DuplicateProcessor(trigger_type));
            }
        }
        Ok(Self {
            ctx: Arc::new(ProcessorContext {
                rules_cache,
                request_store,
                deduplication,
                rate_limits,
                center,
                processors: by_type,
            }),
            partition_service,
            executor,
        })
    }

    /// Like [`NotificationRuleProcessor::process`], returning the evaluation task.
    pub fn submit(&self, trigger: NotificationRuleTrigger) -> JoinHandle<()> {
        let trigger_type = trigger.trigger_type();
        let tenant_id = if trigger_type.is_tenant_level() {
            trigger.tenant_id()
        } else {
            TenantId::SYS_TENANT_ID
        };
        let ctx = self.ctx.clone();
        self.executor.submit(async move {
            if let Err(e) = ctx.process_trigger(tenant_id, &trigger).await {
                error!(
                    "Failed to process notification rules for trigger {:?}: {}",
                    trigger, e
                );
            }
        })
    }

    /// Reacts to notification rule changes: evicts the cached rules and, when a rule was
    /// deleted, drops its rate limit and cancels its scheduled requests if this node owns the
    /// rule's partition.
    pub fn on_component_lifecycle(&self, msg: &ComponentLifecycleMsg) -> Option<JoinHandle<()>> {
        self.ctx.rules_cache.on_component_lifecycle(msg);
        if msg.event != ComponentLifecycleEvent::Deleted {
            return None;
        }
        let rule_id = msg.notification_rule_id()?;
        self.ctx.rate_limits.clean_up(
            LimitedApi::NotificationRequestsPerRule,
            &rule_id.to_string(),
        );

        let tenant_id = msg.tenant_id;
        if !self
            .partition_service
            .is_my_partition(ServiceType::Core, tenant_id, rule_id.into())
        {
            return None;
        }
        let ctx = self.ctx.clone();
        Some(self.executor.submit(async move {
            let scheduled = match ctx
                .request_store
                .find_request_ids_by_status_and_rule(
                    tenant_id,
                    NotificationRequestStatus::Scheduled,
                    rule_id,
                )
                .await
            {
                Ok(scheduled) => scheduled,
                Err(e) => {
                    error!("[{}] Failed to find requests of rule {}: {}", tenant_id, rule_id, e);
                    return;
                }
            };
            for request_id in scheduled {
                if let Err(e) = ctx
                    .center
                    .delete_notification_request(tenant_id, request_id)
                    .await
                {
                    error!(
                        "[{}] Failed to delete notification request {}: {}",
                        tenant_id, request_id, e
                    );
                }
            }
        }))
    }
}

impl NotificationRuleProcessor for DefaultNotificationRuleProcessor {
    fn process(&self, trigger: NotificationRuleTrigger) {
        self.submit(trigger);
    }
}

impl ProcessorContext {
    fn processor(
        &self,
        trigger_type: NotificationRuleTriggerType,
    ) -> Result<&Arc<dyn TriggerProcessor>, NotificationError> {
        self.processors
            .get(&trigger_type)
            .ok_or(NotificationError::ProcessorNotFound(trigger_type))
    }

    async fn process_trigger(
        &self,
        tenant_id: TenantId,
        trigger: &NotificationRuleTrigger,
    ) -> Result<(), NotificationError> {
        let trigger_type = trigger.trigger_type();
        let enabled = self.rules_cache.get_enabled(tenant_id, trigger_type).await?;
        if enabled.is_empty() {
            return Ok(());
        }
        let rules: Vec<&NotificationRule> = enabled
            .iter()
            .filter(|rule| {
                !(trigger.deduplicate() && self.deduplication.already_processed(trigger, rule))
            })
            .collect();

        for rule in rules {
            if let Err(e) = self.process_rule(rule, trigger).await {
                error!(
                    "Failed to process notification rule {} for {:?} trigger {:?}: {}",
                    rule.id, trigger_type, trigger, e
                );
            }
        }
        Ok(())
    }

    async fn process_rule(
        &self,
        rule: &NotificationRule,
        trigger: &NotificationRuleTrigger,
    ) -> Result<(), NotificationError> {
        debug!(
            "Processing notification rule '{}' for trigger type {:?}",
            rule.name,
            rule.trigger_type()
        );
        let processor = self.processor(rule.trigger_type())?;
        let originator = trigger.originator_entity_id();

        if processor.matches_clear_rule(trigger, &rule.trigger_config) {
            let issued: Vec<NotificationRequest> = self
                .request_store
                .find_requests_by_rule_and_originator(rule.tenant_id, rule.id, originator)
                .await?
                .into_iter()
                .filter(|request| request.is_sent() || request.is_scheduled())
                .collect();
            if issued.is_empty() {
                return Ok(());
            }

            let mut targets: Vec<Uuid> = vec![];
            for request in issued.iter().filter(|request| request.is_sent()) {
                for target in &request.targets {
                    if !targets.contains(target) {
                        targets.push(*target);
                    }
                }
            }
            if !targets.is_empty() {
                let info = processor.construct_notification_info(trigger).await?;
                self.submit_request(targets, rule, originator, info, 0).await;
            }

            for request in issued.iter().filter(|request| request.is_scheduled()) {
                if let Some(request_id) = request.id {
                    self.center
                        .delete_notification_request(rule.tenant_id, request_id)
                        .await?;
                }
            }
            return Ok(());
        }

        if processor.matches_filter(trigger, &rule.trigger_config) {
            if !self.rate_limits.check_rate_limit(
                LimitedApi::NotificationRequestsPerRule,
                rule.tenant_id,
                &rule.id.to_string(),
            ) {
                debug!(
                    "[{}] Rate limit for notification requests per rule was exceeded (rule '{}')",
                    rule.tenant_id, rule.name
                );
                return Ok(());
            }
            let info = processor.construct_notification_info(trigger).await?;
            for (delay, targets) in rule.recipients_config.targets_table() {
                self.submit_request(targets, rule, originator, info.clone(), delay)
                    .await;
            }
        }
        Ok(())
    }

    async fn submit_request(
        &self,
        targets: Vec<Uuid>,
        rule: &NotificationRule,
        originator: EntityId,
        info: NotificationInfo,
        delay_in_sec: u32,
    ) {
        let request = NotificationRequest {
            id: None,
            tenant_id: rule.tenant_id,
            targets,
            template_id: rule.template_id,
            info: Some(info),
            additional_config: NotificationRequestConfig {
                sending_delay_in_sec: (delay_in_sec > 0).then_some(delay_in_sec),
            },
            rule_id: Some(rule.id),
            originator_entity_id: Some(originator),
            status: NotificationRequestStatus::Processing,
            created_time: common::now_millis(),
        };
        debug!(
            "Submitting notification request for rule '{}' with delay of {} sec to targets {:?}",
            rule.name, delay_in_sec, request.targets
        );
        if let Err(e) = self
            .center
            .process_notification_request(rule.tenant_id, request, None)
            .await
        {
            error!(
                "Failed to process notification request for tenant {} for rule {}: {}",
                rule.tenant_id, rule.id, e
            );
        }
    }
}
