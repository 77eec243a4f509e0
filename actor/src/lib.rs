// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule-engine actor runtime
//!
//! A supervised actor runtime for the components of the rule engine. Each actor is an
//! independent task that owns its state and consumes a two-lane mailbox one message at a time,
//! so chain-local state is mutated without locks and the effects of the messages sent to one
//! actor are observed in delivery order.
//!
//! ## Messages
//!
//! Actors receive the closed [`TbActorMsg`] set. An actor matches the kinds it understands and
//! returns `Ok(false)` for the rest; the runner then logs the message, fails its callback and
//! publishes [`SystemEvent::UnhandledMessage`]. Lifecycle and partition-change messages travel
//! on a high-priority lane and are taken before queued data messages.
//!
//! ## Lifecycle
//!
//! Every actor instance moves once through `Uninitialized → Running → Stopped`. A failed `init`
//! is retried according to the actor's [`SupervisionStrategy`] and ends in a stop with reason
//! [`StopReason::InitFailed`] when retries are exhausted. Stopping an actor stops its children
//! first, then calls `destroy` with the reason and the optional cause, then fails the callbacks
//! of whatever was still queued.
//!
//! ## Registry
//!
//! The [`SystemRef`] maps [`ActorId`]s to [`ActorRef`]s and keeps the parent/child tree.
//! Cancelling the system token stops every root actor, and through them the whole tree.
//!
//! ```ignore
//! let (system, mut runner) = ActorSystem::create(token.clone());
//! let app = system.create_root_actor(ActorId::named("app"), AppActor::new(..)).await?;
//! app.tell(TbActorMsg::QueueToRuleEngine(msg))?;
//! ```
//!

mod actor;
mod error;
mod handler;
mod id;
mod msg;
mod runner;
mod scheduler;
mod sink;
mod supervision;
mod system;

pub use actor::{Actor, ActorContext, ActorLifecycle, ActorRef, StopReason};
pub use error::Error;
pub use id::ActorId;
pub use msg::{
    MsgType, PartitionChangeMsg, QueueToRuleEngineMsg, RuleChainInputMsg,
    RuleChainOutputMsg, RuleChainToRuleChainMsg, RuleChainToRuleNodeMsg,
    RuleNodeToRuleChainTellNextMsg, TbActorMsg,
};
pub use scheduler::MIN_SCHEDULE_PERIOD;
pub use sink::{Sink, Subscriber, SystemEvent};
pub use supervision::{
    ActorSettings, ExponentialBackoffStrategy, FixedIntervalStrategy,
    NoIntervalStrategy, ProcessFailureStrategy, RetryStrategy, SupervisionStrategy,
};
pub use system::{ActorSystem, SystemRef, SystemRunner};
