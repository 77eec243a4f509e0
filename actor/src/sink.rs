// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # System event sink
//!
//! Sinks run in their own task and forward the events of the actor system to a subscriber, the
//! hook a supervising layer uses to log or escalate stopped actors and unhandled messages.
//!

use crate::{ActorId, MsgType, StopReason};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{error::RecvError, Receiver as EventReceiver};

use tracing::debug;

/// Event published by the actor system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// The actor finished `init` and is processing its mailbox.
    ActorStarted { id: ActorId },
    /// An `init` attempt failed.
    ActorInitFailed {
        id: ActorId,
        attempt: usize,
        error: String,
    },
    /// The actor reached its terminal state.
    ActorStopped {
        id: ActorId,
        reason: StopReason,
        error: Option<String>,
    },
    /// The actor does not understand a message kind it received.
    UnhandledMessage { id: ActorId, msg_type: MsgType },
    /// Every root actor stopped after a shutdown request.
    SystemStopped,
}

/// A sink that receives system events and notifies a subscriber.
pub struct Sink {
    subscriber: Box<dyn Subscriber>,
    event_receiver: EventReceiver<SystemEvent>,
}

impl Sink {
    pub fn new(
        event_receiver: EventReceiver<SystemEvent>,
        subscriber: impl Subscriber,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Runs until the event channel is closed. Lagged events are skipped.
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!(
                        "Received event: {:?}. Notify to the subscriber.",
                        event
                    );
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Sink lagged, {} events skipped.", skipped);
                }
            }
        }
    }
}

/// Processes the system events delivered by a [`Sink`].
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    async fn notify(&self, event: SystemEvent);
}
