// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorId;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor system.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An error occurred while sending a message to an actor.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// The actor already exists.
    #[error("Actor {0} exist.")]
    Exists(ActorId),
    /// The actor is not registered in the system.
    #[error("Actor {0} not found.")]
    NotFound(ActorId),
    /// The actor could not set itself up.
    #[error("Initialization failed: {0}")]
    Init(String),
    /// An error occurred while stopping an actor.
    #[error("An error occurred while stopping an actor.")]
    Stop,
    /// A message could not be applied.
    #[error("Processing error: {0}")]
    Process(String),
    /// Store  Error.
    #[error("Store error: {0}")]
    Store(String),
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}
