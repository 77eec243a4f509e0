// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type, the registry that maps actor ids to
//! their references and keeps the parent/child tree used for teardown.
//!

use crate::{
    actor::{Actor, ActorContext, ActorRef, StopReason},
    runner::ActorRunner,
    sink::{Sink, SystemEvent},
    ActorId, Error,
};

use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use tracing::{debug, error};

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

/// Actor system.
///
pub struct ActorSystem {}

impl ActorSystem {
    /// Create a new actor system. Cancelling `token` stops every root actor (and thus the whole
    /// tree), then publishes [`SystemEvent::SystemStopped`].
    ///
    /// # Returns
    ///
    /// Returns a tuple with the system reference and the system runner.
    pub fn create(token: CancellationToken) -> (SystemRef, SystemRunner) {
        let system = SystemRef::new(token);
        let runner = SystemRunner::new(system.subscribe());
        (system, runner)
    }
}

#[derive(Default)]
struct Registry {
    actors: HashMap<ActorId, ActorRef>,
    children: HashMap<ActorId, BTreeSet<ActorId>>,
    parents: HashMap<ActorId, ActorId>,
    roots: Vec<ActorId>,
}

/// System reference.
///
#[derive(Clone)]
pub struct SystemRef {
    registry: Arc<RwLock<Registry>>,
    event_sender: broadcast::Sender<SystemEvent>,
    token: CancellationToken,
}

impl SystemRef {
    fn new(token: CancellationToken) -> Self {
        let (event_sender, _) = broadcast::channel(10000);
        let system = SystemRef {
            registry: Arc::new(RwLock::new(Registry::default())),
            event_sender,
            token: token.clone(),
        };

        let system_clone = system.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            debug!("Stopping actor system...");
            let roots: Vec<ActorRef> = {
                let registry = system_clone.registry.read().await;
                registry
                    .roots
                    .iter()
                    .rev()
                    .filter_map(|id| registry.actors.get(id).cloned())
                    .collect()
            };
            for root in roots {
                let _ = root.stop(StopReason::Normal).await;
            }
            system_clone.publish(SystemEvent::SystemStopped);
        });

        system
    }

    /// Retrieves an actor running in this actor system.
    pub async fn get_actor(&self, id: &ActorId) -> Option<ActorRef> {
        self.registry.read().await.actors.get(id).cloned()
    }

    /// Launches a new top level actor.
    ///
    /// # Errors
    ///
    /// Returns `Error::Exists` if an actor with the same id is running.
    ///
    pub async fn create_root_actor<A: Actor>(
        &self,
        id: ActorId,
        actor: A,
    ) -> Result<ActorRef, Error> {
        if self.get_actor(&id).await.is_some() {
            error!("Actor '{}' already exists!", &id);
            return Err(Error::Exists(id));
        }
        self.get_or_create_actor(None, id, || actor).await
    }

    /// Returns the actor registered under `id`, or creates it as a child of `parent`.
    /// The new actor starts in the background; messages told before its `init` completes wait
    /// in its mailbox.
    pub(crate) async fn get_or_create_actor<A, F>(
        &self,
        parent: Option<&ActorRef>,
        id: ActorId,
        creator: F,
    ) -> Result<ActorRef, Error>
    where
        A: Actor,
        F: FnOnce() -> A,
    {
        let mut registry = self.registry.write().await;
        if let Some(existing) = registry.actors.get(&id) {
            return Ok(existing.clone());
        }
        if self.token.is_cancelled() {
            return Err(Error::Stop);
        }

        let (mut runner, actor_ref) = ActorRunner::create(id.clone(), creator());
        registry.actors.insert(id.clone(), actor_ref.clone());
        match parent {
            Some(parent) => {
                registry
                    .children
                    .entry(parent.id().clone())
                    .or_default()
                    .insert(id.clone());
                registry.parents.insert(id.clone(), parent.id().clone());
            }
            None => registry.roots.push(id.clone()),
        }
        drop(registry);

        debug!("Actor {} created.", id);
        let ctx = ActorContext::new(actor_ref.clone(), parent.cloned(), self.clone());
        tokio::spawn(async move {
            runner.init(ctx).await;
        });
        Ok(actor_ref)
    }

    /// Running children of an actor.
    pub async fn children(&self, id: &ActorId) -> Vec<ActorRef> {
        let registry = self.registry.read().await;
        registry
            .children
            .get(id)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| registry.actors.get(child).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes a stopped actor. A newer instance registered under the same id is kept.
    pub(crate) async fn remove_actor(&self, actor: &ActorRef) {
        let mut registry = self.registry.write().await;
        let id = actor.id().clone();
        match registry.actors.get(&id) {
            Some(current) if current.same_instance(actor) => {}
            _ => return,
        }
        registry.actors.remove(&id);
        registry.children.remove(&id);
        registry.roots.retain(|root| root != &id);
        if let Some(parent) = registry.parents.remove(&id) {
            if let Some(siblings) = registry.children.get_mut(&parent) {
                siblings.remove(&id);
            }
        }
    }

    /// Stops an actor and its subtree, waiting for them.
    pub async fn stop_actor(&self, id: &ActorId, reason: StopReason) -> Result<(), Error> {
        match self.get_actor(id).await {
            Some(actor) => actor.stop(reason).await,
            None => Err(Error::NotFound(id.clone())),
        }
    }

    /// Publishes a system event. Having no subscriber is fine.
    pub fn publish(&self, event: SystemEvent) {
        let _ = self.event_sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.event_sender.subscribe()
    }

    /// Run a sink. The sink will be run in a separate task.
    ///
    pub fn run_sink(&self, mut sink: Sink) {
        tokio::spawn(async move {
            sink.run().await;
        });
    }

    pub fn stop_system(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// System runner.
pub struct SystemRunner {
    event_receiver: broadcast::Receiver<SystemEvent>,
}

impl SystemRunner {
    pub(crate) fn new(event_receiver: broadcast::Receiver<SystemEvent>) -> Self {
        Self { event_receiver }
    }

    /// Runs until the actor system stopped.
    pub async fn run(&mut self) {
        debug!("Running actor system...");
        loop {
            match self.event_receiver.recv().await {
                Ok(SystemEvent::SystemStopped)
                | Err(broadcast::error::RecvError::Closed) => break,
                _ => {}
            }
        }
        debug!("Actor system stopped.");
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::TbActorMsg;

    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct IdleActor;

    #[async_trait]
    impl Actor for IdleActor {
        async fn process(
            &mut self,
            _msg: TbActorMsg,
            _ctx: &mut ActorContext,
        ) -> Result<bool, Error> {
            Ok(true)
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stop_actor_system() {
        let token = CancellationToken::new();
        let (system, mut runner) = ActorSystem::create(token.clone());
        let root = system
            .create_root_actor(ActorId::named("app"), IdleActor)
            .await
            .unwrap();

        let handle = tokio::spawn(async move {
            runner.run().await;
        });
        token.cancel();
        handle.await.unwrap();

        assert!(logs_contain("Running actor system..."));
        assert!(logs_contain("Stopping actor system..."));
        assert!(logs_contain("Actor system stopped."));
        assert!(root.is_closed());
        assert!(system.get_actor(&ActorId::named("app")).await.is_none());
    }

    #[tokio::test]
    async fn test_root_actor_exists() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        system
            .create_root_actor(ActorId::named("app"), IdleActor)
            .await
            .unwrap();
        let result = system
            .create_root_actor(ActorId::named("app"), IdleActor)
            .await;
        assert_eq!(result.unwrap_err(), Error::Exists(ActorId::named("app")));
    }
}
