// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::TenantId;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported to the callback of a rule-engine message.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum MsgError {
    /// The tenant of the message does not exist (or was deleted).
    #[error("Tenant {0} not found.")]
    TenantNotFound(TenantId),
    /// The target rule chain is missing or its actor could not be initialized.
    #[error("Rule chain is not available: {0}")]
    RuleChainUnavailable(String),
    /// A rule node routed the message through the failure relation.
    #[error("Message processing failed: {0}")]
    Processing(String),
    /// The actor that owned the message stopped before processing it.
    #[error("Actor stopped before the message was processed.")]
    ActorStopped,
    /// The queue transport rejected the message.
    #[error("Failed to send message to queue: {0}")]
    Send(String),
}
