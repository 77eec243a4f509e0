// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{empty_or_contains, TriggerProcessor};
use crate::NotificationError;

use common::notification::{
    NotificationInfo, NotificationRuleTrigger, NotificationRuleTriggerType, TriggerConfig,
};
use store::TenantStore;

use async_trait::async_trait;

use std::sync::Arc;

/// Api usage state changes. The tenant name of the payload comes from the tenant store.
pub struct ApiUsageLimitTriggerProcessor {
    tenant_store: Arc<dyn TenantStore>,
}

impl ApiUsageLimitTriggerProcessor {
    pub fn new(tenant_store: Arc<dyn TenantStore>) -> Self {
        Self { tenant_store }
    }
}

#[async_trait]
impl TriggerProcessor for ApiUsageLimitTriggerProcessor {
    fn trigger_type(&self) -> NotificationRuleTriggerType {
        NotificationRuleTriggerType::ApiUsageLimit
    }

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, config: &TriggerConfig) -> bool {
        match (trigger, config) {
            (
                NotificationRuleTrigger::ApiUsageLimit(trigger),
                TriggerConfig::ApiUsageLimit(config),
            ) => {
                empty_or_contains(&config.api_features, &trigger.api_feature)
                    && empty_or_contains(&config.notify_on, &trigger.status)
            }
            _ => false,
        }
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError> {
        let NotificationRuleTrigger::ApiUsageLimit(trigger) = trigger else {
            return Err(NotificationError::UnexpectedTrigger(self.trigger_type()));
        };
        let tenant = self
            .tenant_store
            .find_tenant_by_id(trigger.tenant_id)
            .await?
            .ok_or_else(|| NotificationError::TenantNotFound(trigger.tenant_id.to_string()))?;
        Ok(NotificationInfo::ApiUsageLimit {
            feature: trigger.api_feature,
            record_key: trigger.key.clone(),
            status: trigger.status,
            limit: trigger.threshold.to_string(),
            current_value: trigger.value.to_string(),
            tenant_id: trigger.tenant_id,
            tenant_name: tenant.name,
        })
    }
}
