use super::*;
use crate::config::ControllerConfig;
use crate::error::{LoopError, RecognitionError, SourceError};
use crate::events::{EventBus, LoopEvent};
use crate::frame::EncodedFrame;
use crate::notify::{NoticeLevel, RecordingNotifier};
use crate::person::{PersonLabel, RecognitionOutcome, RecognizedPerson, NO_FACE_DETECTED};
use crate::recognition::RecognitionClient;
use crate::source::FrameSource;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{sleep, Instant};

type Responder = Box<dyn Fn(usize) -> Result<RecognitionOutcome, RecognitionError> + Send + Sync>;

/// Recognition client answering from a script, recording call timings
struct ScriptedClient {
    latency: Duration,
    responder: Responder,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    timings: parking_lot::Mutex<Vec<(Instant, Instant)>>,
}

impl ScriptedClient {
    fn new<F>(latency: Duration, responder: F) -> Arc<Self>
    where
        F: Fn(usize) -> Result<RecognitionOutcome, RecognitionError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            latency,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            timings: parking_lot::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionClient for ScriptedClient {
    async fn recognize(&self, _frame: &EncodedFrame) -> Result<RecognitionOutcome, RecognitionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let started = Instant::now();

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.timings.lock().push((started, Instant::now()));
        (self.responder)(call)
    }
}

struct TestSource {
    available: bool,
    captures: AtomicUsize,
}

impl TestSource {
    fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            captures: AtomicUsize::new(0),
        })
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for TestSource {
    async fn capture(&self) -> Result<EncodedFrame, SourceError> {
        let id = self.captures.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(EncodedFrame::new(
                id as u64,
                SystemTime::now(),
                vec![0xFF, 0xD8, 0xFF, 0xD9],
            ))
        } else {
            Err(SourceError::Unavailable {
                details: "camera not streaming".to_string(),
            })
        }
    }

    fn describe(&self) -> String {
        "test source".to_string()
    }
}

fn empty_outcome() -> Result<RecognitionOutcome, RecognitionError> {
    Ok(RecognitionOutcome::Empty {
        message: Some(NO_FACE_DETECTED.to_string()),
    })
}

fn alice_and_stranger() -> Result<RecognitionOutcome, RecognitionError> {
    Ok(RecognitionOutcome::Persons(vec![
        RecognizedPerson::new("Alice", 0),
        RecognizedPerson::new("Stranger", 0),
    ]))
}

fn create_controller(client: Arc<ScriptedClient>) -> (LoopController, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = LoopController::builder()
        .client(client)
        .notifier(notifier.clone())
        .event_bus(EventBus::new(256))
        .config(ControllerConfig::default())
        .build()
        .unwrap();
    (controller, notifier)
}

fn source(available: bool) -> (Arc<TestSource>, Option<Arc<dyn FrameSource>>) {
    let source = TestSource::new(available);
    let handle: Arc<dyn FrameSource> = source.clone();
    (source, Some(handle))
}

#[tokio::test(start_paused = true)]
async fn test_initial_state() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, _) = create_controller(client);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, RunState::Idle);
    assert!(!snapshot.busy);
    assert_eq!(snapshot.status, STATUS_WAITING);
    assert!(snapshot.results.is_empty());
    assert!(snapshot.history.is_empty());
    assert!(controller.next_cycle_due().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_start_without_source_reports_configuration_error() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, notifier) = create_controller(client.clone());

    let result = controller.start(None);

    assert_eq!(result, Err(LoopError::MissingSource));
    assert_eq!(controller.state(), RunState::Idle);
    assert_eq!(controller.status(), STATUS_WAITING);
    assert_eq!(notifier.count(NoticeLevel::Error), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(client.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, notifier) = create_controller(client);
    let mut events = controller.subscribe();

    controller.stop();
    assert_eq!(controller.state(), RunState::Idle);
    assert_eq!(controller.status(), STATUS_WAITING);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(notifier.notices().is_empty());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;
    controller.stop();
    assert_eq!(controller.state(), RunState::Stopped);

    while events.try_recv().is_ok() {}
    let before = controller.snapshot();
    let notices_before = notifier.notices().len();

    controller.stop();

    let after = controller.snapshot();
    assert_eq!(after.state, before.state);
    assert_eq!(after.status, before.status);
    assert_eq!(after.busy, before.busy);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(notifier.notices().len(), notices_before);
}

#[tokio::test(start_paused = true)]
async fn test_start_publishes_transition_then_status() {
    let client = ScriptedClient::new(Duration::from_millis(50), |_| empty_outcome());
    let (controller, notifier) = create_controller(client);
    let mut events = controller.subscribe();

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();

    match events.try_recv().unwrap() {
        LoopEvent::StateChanged { from, to, .. } => {
            assert_eq!(from, RunState::Idle);
            assert_eq!(to, RunState::Running);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
    match events.try_recv().unwrap() {
        LoopEvent::StatusChanged { status } => assert_eq!(status, STATUS_RECOGNIZING),
        other => panic!("Unexpected event: {:?}", other),
    }
    assert_eq!(notifier.count(NoticeLevel::Success), 1);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_first_cycle_runs_immediately() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(client.calls(), 1);
    assert!(controller.next_cycle_due().is_some());
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_recognized_persons_update_results_and_history() {
    let client = ScriptedClient::new(Duration::ZERO, |_| alice_and_stranger());
    let (controller, _) = create_controller(client);

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;

    let results = controller.results();
    let identities: Vec<_> = results.iter().map(|p| p.identity.as_str()).collect();
    assert_eq!(identities, vec!["Alice", "Stranger"]);
    assert_eq!(controller.status(), STATUS_RECOGNIZING);

    let history = controller.history();
    assert_eq!(history.len(), 2);
    // Front-inserted in order: the last person of the outcome is newest
    assert_eq!(history[0].person.identity, "Stranger");
    assert_eq!(history[0].label, PersonLabel::Unknown);
    assert_eq!(history[1].person.identity, "Alice");
    assert_eq!(history[1].label, PersonLabel::Known);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_sets_status_and_keeps_history() {
    let client = ScriptedClient::new(Duration::ZERO, |call| {
        if call == 0 {
            Ok(RecognitionOutcome::Persons(vec![RecognizedPerson::new("Alice", 0)]))
        } else {
            empty_outcome()
        }
    });
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.history().len(), 1);
    assert_eq!(controller.results().len(), 1);

    // Second cycle fires 800ms after the first completed
    sleep(Duration::from_millis(800)).await;
    assert_eq!(client.calls(), 2);
    assert_eq!(controller.status(), NO_FACE_DETECTED);
    assert!(controller.results().is_empty());
    assert_eq!(controller.history().len(), 1);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_without_message_uses_default_status() {
    let client = ScriptedClient::new(Duration::ZERO, |_| {
        Ok(RecognitionOutcome::Empty { message: None })
    });
    let (controller, _) = create_controller(client);

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(controller.status(), NO_FACE_DETECTED);
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_next_cycle_waits_for_delay_after_completion() {
    let client = ScriptedClient::new(Duration::from_millis(300), |_| empty_outcome());
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_secs(5)).await;
    controller.stop();

    let timings = client.timings.lock().clone();
    assert!(timings.len() >= 4, "only {} cycles ran", timings.len());

    for pair in timings.windows(2) {
        let (_, previous_end) = pair[0];
        let (next_start, _) = pair[1];
        let gap = next_start.duration_since(previous_end);
        assert!(gap >= Duration::from_millis(800), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(850), "gap was {:?}", gap);
    }
}

#[tokio::test(start_paused = true)]
async fn test_service_failure_stops_loop() {
    let client = ScriptedClient::new(Duration::from_millis(20), |_| {
        Err(RecognitionError::Transport {
            status: Some(500),
            message: Some("worker offline".to_string()),
        })
    });
    let (controller, notifier) = create_controller(client.clone());
    let mut events = controller.subscribe();

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(100)).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, RunState::Stopped);
    assert_eq!(snapshot.status, STATUS_STOPPED);
    assert!(!snapshot.busy);
    assert!(snapshot.results.is_empty());
    assert!(controller.next_cycle_due().is_none());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(client.calls(), 1);

    let notices = notifier.notices();
    assert!(notices.contains(&(NoticeLevel::Error, "worker offline".to_string())));
    assert!(notices.contains(&(NoticeLevel::Info, "Recognition stopped".to_string())));

    // The failure status is shown before the stop overwrites it
    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let LoopEvent::StatusChanged { status } = event {
            statuses.push(status);
        }
    }
    assert_eq!(
        statuses,
        vec![
            STATUS_RECOGNIZING.to_string(),
            STATUS_SERVICE_UNREACHABLE.to_string(),
            STATUS_STOPPED.to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_failure_notice() {
    let client = ScriptedClient::new(Duration::ZERO, |_| {
        Err(RecognitionError::Unauthorized { message: None })
    });
    let (controller, notifier) = create_controller(client);

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(controller.state(), RunState::Stopped);
    assert!(notifier
        .notices()
        .iter()
        .any(|(level, msg)| *level == NoticeLevel::Error && msg.contains("Login expired")));
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_cycle() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(controller.next_cycle_due().is_some());

    controller.stop();
    assert!(controller.next_cycle_due().is_none());
    assert_eq!(controller.status(), STATUS_STOPPED);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(client.calls(), 1);
    assert_eq!(controller.state(), RunState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stale_completion_is_discarded() {
    let client = ScriptedClient::new(Duration::from_secs(1), |_| alice_and_stranger());
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(controller.is_busy());

    controller.stop();
    assert!(!controller.is_busy());

    sleep(Duration::from_secs(2)).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, RunState::Stopped);
    assert_eq!(snapshot.status, STATUS_STOPPED);
    assert!(snapshot.results.is_empty());
    assert!(snapshot.history.is_empty());
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_runs_first_cycle_immediately() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle.clone()).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(client.calls(), 1);

    controller.stop();
    controller.start(handle).unwrap();
    assert_eq!(controller.state(), RunState::Running);
    assert_eq!(controller.status(), STATUS_RECOGNIZING);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(client.calls(), 2);
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_restart_waits_for_stale_request() {
    let client = ScriptedClient::new(Duration::from_secs(1), |_| {
        Ok(RecognitionOutcome::Persons(vec![RecognizedPerson::new("Alice", 0)]))
    });
    let (controller, _) = create_controller(client.clone());

    let (source, handle) = source(true);
    controller.start(handle.clone()).unwrap();
    sleep(Duration::from_millis(100)).await;
    controller.stop();
    controller.start(handle).unwrap();

    // The new episode grabs its frame only once the stale request is done
    sleep(Duration::from_millis(500)).await;
    assert_eq!(source.captures(), 1);

    // The stale request completes at 1s and is discarded; the new one starts then
    sleep(Duration::from_millis(900)).await;
    assert_eq!(source.captures(), 2);
    assert_eq!(client.calls(), 2);
    assert!(controller.history().is_empty());

    sleep(Duration::from_millis(600)).await;
    assert_eq!(controller.history().len(), 1);
    assert_eq!(client.max_in_flight(), 1);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_never_more_than_one_request_in_flight() {
    let client = ScriptedClient::new(Duration::from_millis(700), |_| alice_and_stranger());
    let (controller, _) = create_controller(client.clone());
    let (_source, handle) = source(true);

    for _ in 0..3 {
        controller.start(handle.clone()).unwrap();
        controller.start(handle.clone()).unwrap();
        sleep(Duration::from_millis(150)).await;
        controller.stop();
        sleep(Duration::from_millis(10)).await;
    }

    controller.start(handle).unwrap();
    sleep(Duration::from_secs(6)).await;
    controller.stop();

    assert!(client.calls() >= 4);
    assert_eq!(client.max_in_flight(), 1);
    assert!(controller.history().len() <= 10);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_frames_skip_recognition() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, _) = create_controller(client.clone());

    let (source, handle) = source(false);
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(2000)).await;

    assert_eq!(client.calls(), 0);
    assert_eq!(source.captures(), 3);
    assert_eq!(controller.state(), RunState::Running);
    assert_eq!(controller.status(), STATUS_RECOGNIZING);
    assert!(controller.history().is_empty());

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_start_while_running_is_noop() {
    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let (controller, notifier) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle.clone()).unwrap();
    controller.start(handle).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(client.calls(), 1);
    assert_eq!(notifier.count(NoticeLevel::Warning), 1);
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_history_stays_bounded() {
    let client = ScriptedClient::new(Duration::ZERO, |call| {
        Ok(RecognitionOutcome::Persons(vec![
            RecognizedPerson::new(format!("p{}a", call), 0),
            RecognizedPerson::new(format!("p{}b", call), 1),
            RecognizedPerson::new("Stranger", 0),
        ]))
    });
    let (controller, _) = create_controller(client.clone());

    let (_source, handle) = source(true);
    controller.start(handle).unwrap();
    sleep(Duration::from_secs(4)).await;
    controller.stop();

    let history = controller.history();
    assert!(client.calls() >= 4);
    assert_eq!(history.len(), 10);

    let last_call = client.calls() - 1;
    assert_eq!(history[0].person.identity, "Stranger");
    assert_eq!(history[1].person.identity, format!("p{}b", last_call));
    assert_eq!(history[1].label, PersonLabel::Flagged);
    assert_eq!(history[2].person.identity, format!("p{}a", last_call));
}

#[test]
fn test_builder_requires_client() {
    assert!(LoopController::builder().build().is_err());

    let client = ScriptedClient::new(Duration::ZERO, |_| empty_outcome());
    let result = LoopController::builder()
        .client(client)
        .config(ControllerConfig {
            cycle_delay_ms: 800,
            history_capacity: 0,
        })
        .build();
    assert!(result.is_err());
}
