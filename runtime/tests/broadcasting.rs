//! Integration tests for Store action broadcasting
//!
//! Controllers wait on effect-produced actions to learn how a request ended.
//! These tests cover correlation, ordering against state, debounced actions
//! and slow observers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::time::Duration;
use todoshub_core::effect::{Effect, EffectId};
use todoshub_core::{smallvec, SmallVec};
use todoshub_core::reducer::Reducer;
use todoshub_runtime::{Store, StoreConfig, StoreError};

const TYPING: EffectId = EffectId::new("typing");

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Start a three step job
    Start { id: u64 },
    /// One step of a job finished
    StepCompleted { id: u64, step: u32 },
    /// Job finished (terminal action)
    Finished { id: u64 },
    /// A keystroke, applied after a quiet period
    Typed { text: String },
    /// Debounced keystroke
    Settled { text: String },
    /// Fire `count` immediate actions
    Burst { count: u32 },
    /// One action of a burst
    Tick { n: u32 },
}

#[derive(Debug, Clone, Default)]
struct TestState {
    steps: Vec<(u64, u32)>,
    finished: Vec<u64>,
    settled: Vec<String>,
    ticks: u32,
}

#[derive(Clone)]
struct TestEnvironment;

#[derive(Clone)]
struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::Start { id } => smallvec![Effect::Future(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some(TestAction::StepCompleted { id, step: 1 })
            }))],
            TestAction::StepCompleted { id, step } => {
                state.steps.push((id, step));
                if step < 3 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(TestAction::StepCompleted { id, step: step + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(TestAction::Finished { id })
                    }))]
                }
            },
            TestAction::Finished { id } => {
                state.finished.push(id);
                SmallVec::new()
            },
            TestAction::Typed { text } => smallvec![Effect::Debounce {
                id: TYPING,
                duration: Duration::from_millis(300),
                action: Box::new(TestAction::Settled { text }),
            }],
            TestAction::Settled { text } => {
                state.settled.push(text);
                SmallVec::new()
            },
            TestAction::Burst { count } => smallvec![Effect::Parallel(
                (0..count)
                    .map(|n| Effect::Future(Box::pin(async move { Some(TestAction::Tick { n }) })))
                    .collect()
            )],
            TestAction::Tick { .. } => {
                state.ticks += 1;
                SmallVec::new()
            },
        }
    }
}

fn store() -> Store<TestState, TestAction, TestEnvironment, TestReducer> {
    Store::new(TestState::default(), TestReducer, TestEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_send_and_wait_for_multi_step_job() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Start { id: 7 },
            |a| matches!(a, TestAction::Finished { id: 7 }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(result, TestAction::Finished { id: 7 });
    let (steps, finished) = store.state(|s| (s.steps.clone(), s.finished.clone())).await;
    assert_eq!(steps, vec![(7, 1), (7, 2), (7, 3)]);
    assert_eq!(finished, vec![7]);
}

#[tokio::test]
async fn test_correlation_id_filtering() {
    let store = store();

    let (first, second) = tokio::join!(
        store.send_and_wait_for(
            TestAction::Start { id: 1 },
            |a| matches!(a, TestAction::Finished { id: 1 }),
            Duration::from_secs(1),
        ),
        store.send_and_wait_for(
            TestAction::Start { id: 2 },
            |a| matches!(a, TestAction::Finished { id: 2 }),
            Duration::from_secs(1),
        ),
    );

    assert_eq!(first.unwrap(), TestAction::Finished { id: 1 });
    assert_eq!(second.unwrap(), TestAction::Finished { id: 2 });

    let mut finished = store.state(|s| s.finished.clone()).await;
    finished.sort_unstable();
    assert_eq!(finished, vec![1, 2]);
}

#[tokio::test]
async fn test_observers_see_state_already_updated() {
    let store = store();
    let mut actions = store.subscribe_actions();

    let _ = store.send(TestAction::Start { id: 3 }).await.unwrap();

    loop {
        let action = actions.recv().await.unwrap();
        if let TestAction::StepCompleted { id, step } = action {
            let steps = store.state(|s| s.steps.clone()).await;
            assert!(steps.contains(&(id, step)));
        }
        if matches!(action, TestAction::Finished { .. }) {
            break;
        }
    }
}

#[tokio::test]
async fn test_direct_sends_are_not_broadcast() {
    let store = store();
    let mut actions = store.subscribe_actions();

    let _ = store.send(TestAction::Tick { n: 0 }).await.unwrap();

    assert!(matches!(
        actions.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_debounced_actions_broadcast_once() {
    let store = store();
    let mut actions = store.subscribe_actions();

    let _ = store.send(TestAction::Typed { text: "a".into() }).await;
    let _ = store.send(TestAction::Typed { text: "ab".into() }).await;
    let mut last = store
        .send(TestAction::Typed { text: "abc".into() })
        .await
        .unwrap();
    last.wait().await;

    assert_eq!(
        actions.recv().await.unwrap(),
        TestAction::Settled { text: "abc".into() }
    );
    assert!(actions.try_recv().is_err());
    assert_eq!(store.state(|s| s.settled.clone()).await, vec!["abc".to_string()]);
}

#[tokio::test]
async fn test_lagging_subscriber_skips_but_keeps_receiving() {
    let store = Store::with_config(
        TestState::default(),
        TestReducer,
        TestEnvironment,
        StoreConfig::default().with_broadcast_capacity(4),
    );
    let mut slow = store.subscribe_actions();

    let mut handle = store.send(TestAction::Burst { count: 16 }).await.unwrap();
    handle.wait().await;
    assert_eq!(store.state(|s| s.ticks).await, 16);

    // The oldest actions were overwritten
    assert!(matches!(
        slow.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(_))
    ));
    assert!(matches!(slow.recv().await, Ok(TestAction::Tick { .. })));
}

#[tokio::test]
async fn test_send_and_wait_for_rejected_after_shutdown() {
    let store = store();
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store
        .send_and_wait_for(
            TestAction::Start { id: 1 },
            |a| matches!(a, TestAction::Finished { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}
