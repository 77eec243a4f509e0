// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification errors
//!

use common::notification::NotificationRuleTriggerType;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum NotificationError {
    /// A second processor was registered for a trigger type.
    #[error("A trigger processor for {0:?} is already registered.")]
    DuplicateProcessor(NotificationRuleTriggerType),
    #[error("No trigger processor registered for {0:?}.")]
    ProcessorNotFound(NotificationRuleTriggerType),
    /// The processor was handed a trigger of another type.
    #[error("Unexpected trigger for the {0:?} processor.")]
    UnexpectedTrigger(NotificationRuleTriggerType),
    #[error("Invalid rate limit '{0}'.")]
    InvalidRateLimit(String),
    #[error("Tenant {0} not found.")]
    TenantNotFound(String),
    #[error(transparent)]
    Store(#[from] store::Error),
}
