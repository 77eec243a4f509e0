// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{
    ActionType, AlarmSeverity, AlarmStatus, ApiFeature, ApiUsageStateValue,
};
use crate::{ComponentLifecycleEvent, EntityId, RuleChainId, TenantId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload rendered into a notification template, built by the trigger processor that matched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NotificationInfo {
    EntityAction {
        entity_id: EntityId,
        entity_name: String,
        action_type: ActionType,
        user_id: Uuid,
        user_email: String,
        user_first_name: Option<String>,
        user_last_name: Option<String>,
        entity_customer_id: Option<Uuid>,
    },
    Alarm {
        alarm_id: Uuid,
        alarm_type: String,
        alarm_originator: EntityId,
        alarm_severity: AlarmSeverity,
        alarm_status: AlarmStatus,
        deleted: bool,
    },
    ComponentLifecycle {
        rule_chain_id: RuleChainId,
        rule_chain_name: String,
        component_id: EntityId,
        component_name: String,
        action: String,
        event_type: ComponentLifecycleEvent,
        error: Option<String>,
    },
    ApiUsageLimit {
        feature: ApiFeature,
        record_key: String,
        status: ApiUsageStateValue,
        limit: String,
        current_value: String,
        tenant_id: TenantId,
        tenant_name: String,
    },
    TaskProcessingFailure {
        tenant_id: TenantId,
        entity_id: EntityId,
        task_type: String,
        task_description: String,
        error: String,
        attempt: u32,
    },
}
