// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

// Sink tests for the actor module

use actor::{
    Actor, ActorContext, ActorId, ActorSystem, Error, ProcessFailureStrategy, Sink,
    StopReason, Subscriber, SystemEvent, TbActorMsg,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Clone, Default)]
struct RecordingSubscriber {
    events: Arc<Mutex<Vec<SystemEvent>>>,
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn notify(&self, event: SystemEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// Fails every tick; stops on failure when `stop_on_failure` is set.
struct FailingActor {
    stop_on_failure: bool,
}

#[async_trait]
impl Actor for FailingActor {
    async fn process(
        &mut self,
        msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::StatsPersistTick => {
                Err(Error::Process("stats store unavailable".to_owned()))
            }
            _ => Ok(false),
        }
    }

    fn on_process_failure(&self, _error: &Error) -> ProcessFailureStrategy {
        if self.stop_on_failure {
            ProcessFailureStrategy::Stop
        } else {
            ProcessFailureStrategy::Resume
        }
    }
}

async fn wait_for_event<F: Fn(&SystemEvent) -> bool>(
    subscriber: &RecordingSubscriber,
    predicate: F,
) {
    for _ in 0..200 {
        if subscriber.events.lock().unwrap().iter().any(&predicate) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("event not received");
}

#[tokio::test]
async fn test_sink_receives_process_failure_stop() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let subscriber = RecordingSubscriber::default();
    system.run_sink(Sink::new(system.subscribe(), subscriber.clone()));

    let actor = system
        .create_root_actor(
            ActorId::named("failing"),
            FailingActor {
                stop_on_failure: true,
            },
        )
        .await
        .unwrap();
    actor.tell(TbActorMsg::StatsPersistTick).unwrap();

    wait_for_event(&subscriber, |event| {
        matches!(
            event,
            SystemEvent::ActorStopped {
                reason: StopReason::Other,
                ..
            }
        )
    })
    .await;
    assert!(actor.is_closed());
}

#[tokio::test]
#[traced_test]
async fn test_resume_keeps_actor_running() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let subscriber = RecordingSubscriber::default();
    system.run_sink(Sink::new(system.subscribe(), subscriber.clone()));

    let actor = system
        .create_root_actor(
            ActorId::named("resilient"),
            FailingActor {
                stop_on_failure: false,
            },
        )
        .await
        .unwrap();
    actor.tell(TbActorMsg::StatsPersistTick).unwrap();
    actor.tell(TbActorMsg::StatsPersistTick).unwrap();

    for _ in 0..200 {
        if logs_contain("stats store unavailable") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(logs_contain("failed to process StatsPersistTick message"));
    assert!(!actor.is_closed());

    system.stop_system();
    wait_for_event(&subscriber, |event| {
        matches!(event, SystemEvent::SystemStopped)
    })
    .await;
    assert!(actor.is_closed());
}
