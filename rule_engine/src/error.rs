// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use common::{RuleChainId, RuleNodeId};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuleEngineError {
    #[error("Unknown rule node type: {0}")]
    UnknownNodeType(String),
    #[error("Invalid configuration of rule node {node}: {reason}")]
    InvalidConfiguration { node: RuleNodeId, reason: String },
    #[error("Rule chain {0} not found.")]
    RuleChainNotFound(RuleChainId),
    #[error("Rule node {0} failed: {1}")]
    NodeFailure(RuleNodeId, String),
    #[error("Actor error: {0}")]
    Actor(#[from] actor::Error),
    #[error("Store error: {0}")]
    Store(#[from] store::Error),
    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),
}
