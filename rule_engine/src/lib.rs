// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule engine
//!
//! The actor tree that executes rule chains, and the consumer service that feeds it from the
//! rule-engine queues.
//!
//! ```text
//! AppActor
//! └── TenantActor (one per tenant)
//!     └── RuleChainActor (one per rule chain)
//!         └── RuleNodeActor (one per rule node)
//! ```
//!
//! A queue message is told to the [`AppActor`], which creates the tenant actor on demand. The
//! tenant actor resolves the target chain (the tenant's root chain when the message names
//! none) and the chain actor pushes the message to its first node. From there each node tells
//! its chain which relations its output follows, and the chain routes the message to the
//! connected nodes. A message whose last node has no outgoing relation of the produced type is
//! acknowledged; one routed along an unconnected `Failure` relation is failed.
//!
//! Rule chain and rule node actors report their lifecycle to the notification rule processor
//! as `ComponentLifecycle` triggers and persist processing counters on every stats tick.
//!

mod app;
mod component;
mod consumer;
mod context;
mod error;
pub mod node;
mod rule_chain;
mod rule_node;
mod tenant;

pub use app::{AppActor, APP_ACTOR_NAME};
pub use consumer::{ConsumerFactory, RuleEngineConsumerService, RuleEngineMsgHandler};
pub use context::ActorSystemContext;
pub use error::RuleEngineError;
pub use node::{NodeFactory, RuleNodeCtx, TbNode};
pub use rule_chain::RuleChainActor;
pub use rule_node::RuleNodeActor;
pub use tenant::TenantActor;
