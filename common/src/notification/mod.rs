// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification data model
//!
//! Rules describe which trigger to watch and whom to notify; triggers are the system events
//! matched against them; requests are what the notification center delivers.
//!

mod info;
mod request;
mod rule;
mod trigger;

pub use info::NotificationInfo;
pub use request::{
    NotificationRequest, NotificationRequestConfig, NotificationRequestStatus,
};
pub use rule::{
    AlarmClearRule, AlarmNotifyOn, AlarmTriggerConfig, ApiUsageLimitTriggerConfig,
    ComponentLifecycleTriggerConfig, EntityActionTriggerConfig, NotificationRule,
    RecipientsConfig, TaskProcessingFailureTriggerConfig, TriggerConfig,
};
pub use trigger::{
    ActionType, AlarmInfo, AlarmSeverity, AlarmStatus, AlarmTrigger, ApiFeature,
    ApiUsageLimitTrigger, ApiUsageStateValue, ComponentLifecycleTrigger,
    EntityActionTrigger, NotificationRuleTrigger, NotificationRuleTriggerType,
    TaskProcessingFailureTrigger, UserInfo,
};
