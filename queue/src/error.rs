// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Queue errors
//!

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum QueueError {
    /// No queue is registered under the name (and no default queue either).
    #[error("Queue {0} is not configured.")]
    QueueNotFound(String),
    /// A queue registration was rejected.
    #[error("Invalid queue configuration: {0}")]
    InvalidQueue(String),
    /// A queue envelope could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
    /// The transport rejected a message.
    #[error("Failed to send message: {0}")]
    Send(String),
    /// Polling or committing failed.
    #[error("Consumer error: {0}")]
    Consumer(String),
    #[error("Can not lock data: {0}")]
    Lock(String),
    #[error(transparent)]
    Store(#[from] store::Error),
}
