// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Store errors
//!
//! Missing records are reported as `Ok(None)` by lookups; `EntryNotFound` is reserved for
//! operations that need an existing record (updates, deletes).
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum Error {
    #[error("Get error: {0}")]
    Get(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Store error: {0}")]
    Store(String),
}
