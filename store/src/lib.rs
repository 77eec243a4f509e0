// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Store module.
//!
//! Narrow contracts to the entity stores the routing and notification core reads from, plus an
//! in-memory implementation of all of them.
//!

pub mod database;
pub mod error;
pub mod memory;

pub use database::{
    ComponentStats, ComponentStatsStore, NotificationRequestStore,
    NotificationRuleStore, QueueStatsStore, RuleChainStore, TenantStore,
};
pub use error::Error;
pub use memory::MemoryStore;
