use super::state::{
    LoopSnapshot, LoopState, PendingCycle, RunState, STATUS_RECOGNIZING,
    STATUS_SERVICE_UNREACHABLE, STATUS_STOPPED,
};
use crate::config::ControllerConfig;
use crate::error::{FacewatchError, LoopError, RecognitionError, Result};
use crate::events::{EventBus, LoopEvent};
use crate::history::HistoryEntry;
use crate::notify::{Notifier, TracingNotifier};
use crate::person::{RecognitionOutcome, RecognizedPerson};
use crate::recognition::RecognitionClient;
use crate::source::FrameSource;
use chrono::Local;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_FAILURE_NOTICE: &str =
    "Recognition service request failed, check the recognition worker";
const UNAUTHORIZED_NOTICE: &str = "Login expired, please sign in again";

/// Drives the capture → recognize → react loop for one frame source at a time.
///
/// At most one recognition request is outstanding per controller. The next
/// cycle is scheduled only once the previous one has completed, so a slow
/// service slows the polling rate instead of queueing requests. Any service
/// failure stops the loop.
///
/// `start` spawns onto the current Tokio runtime and must be called from
/// within one.
#[derive(Clone)]
pub struct LoopController {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<LoopState>,
    /// Held for the whole duration of a recognition request
    in_flight: tokio::sync::Mutex<()>,
    client: Arc<dyn RecognitionClient>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    cycle_delay: Duration,
}

impl LoopController {
    pub(crate) fn new(
        client: Arc<dyn RecognitionClient>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
        config: ControllerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState::new(config.history_capacity)),
                in_flight: tokio::sync::Mutex::new(()),
                client,
                notifier,
                events,
                cycle_delay: config.cycle_delay(),
            }),
        }
    }

    pub fn builder() -> LoopControllerBuilder {
        LoopControllerBuilder::new()
    }

    /// Start a new running episode over `source`; the first cycle runs
    /// immediately. Without a source nothing changes and the configuration
    /// error is reported.
    pub fn start(&self, source: Option<Arc<dyn FrameSource>>) -> std::result::Result<(), LoopError> {
        let shared = &self.shared;

        let source = match source {
            Some(source) => source,
            None => {
                let err = LoopError::MissingSource;
                warn!("Refusing to start recognition: {}", err);
                shared.notifier.error(&err.to_string());
                return Err(err);
            }
        };

        let (episode, token) = {
            let mut state = shared.state.lock();
            if state.run_state == RunState::Running {
                drop(state);
                warn!("Recognition loop is already running");
                shared.notifier.warning("Recognition is already running");
                return Ok(());
            }

            state.cancel_episode();
            state.episode += 1;
            let token = CancellationToken::new();
            state.episode_cancel = Some(token.clone());

            shared.transition(&mut state, RunState::Running);
            shared.set_status(&mut state, STATUS_RECOGNIZING);

            (state.episode, token)
        };

        info!(
            "Starting recognition episode {} with {}",
            episode,
            source.describe()
        );
        shared.notifier.success("Recognition started");

        tokio::spawn(Arc::clone(shared).run_episode(source, episode, token));
        Ok(())
    }

    /// Stop the running loop. No-op unless running.
    pub fn stop(&self) {
        let stopped = {
            let mut state = self.shared.state.lock();
            self.shared.stop_locked(&mut state, STATUS_STOPPED)
        };

        if stopped {
            self.shared.notifier.info("Recognition stopped");
        } else {
            debug!("Stop requested while not running, ignoring");
        }
    }

    pub fn state(&self) -> RunState {
        self.shared.state.lock().run_state
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().busy
    }

    pub fn status(&self) -> String {
        self.shared.state.lock().status.clone()
    }

    /// Persons recognized by the latest completed cycle
    pub fn results(&self) -> Vec<RecognizedPerson> {
        self.shared.state.lock().results.clone()
    }

    /// History entries, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.state.lock().history.to_vec()
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// When the next cycle is due, if one is scheduled
    pub fn next_cycle_due(&self) -> Option<Instant> {
        self.shared.state.lock().pending.as_ref().map(|p| p.due)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LoopEvent> {
        self.shared.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.shared.events
    }
}

impl Shared {
    /// Run cycles for one episode until it is stopped or superseded
    async fn run_episode(
        self: Arc<Self>,
        source: Arc<dyn FrameSource>,
        episode: u64,
        token: CancellationToken,
    ) {
        while !token.is_cancelled() {
            if !self.run_cycle(source.as_ref(), episode).await {
                break;
            }

            let timer = token.child_token();
            let due = Instant::now() + self.cycle_delay;
            {
                let mut state = self.state.lock();
                if !state.is_current(episode) {
                    break;
                }
                state.pending = Some(PendingCycle {
                    due,
                    cancel: timer.clone(),
                });
            }

            tokio::select! {
                _ = timer.cancelled() => break,
                _ = tokio::time::sleep_until(due) => {}
            }

            let mut state = self.state.lock();
            if !state.is_current(episode) {
                break;
            }
            state.pending = None;
        }

        debug!("Recognition episode {} finished", episode);
    }

    /// Execute one cycle. Returns whether the episode is still running.
    async fn run_cycle(&self, source: &dyn FrameSource, episode: u64) -> bool {
        if !self.state.lock().is_current(episode) {
            return false;
        }

        // A restarted episode waits here for a stale request of the previous one
        let _in_flight = self.in_flight.lock().await;
        if !self.state.lock().is_current(episode) {
            return false;
        }

        let frame = match source.capture().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping recognition cycle: {}", e);
                return self.state.lock().is_current(episode);
            }
        };

        {
            let mut state = self.state.lock();
            if !state.is_current(episode) {
                return false;
            }
            self.set_busy(&mut state, true);
        }

        debug!("Submitting frame {} for recognition", frame.id);
        let result = self.client.recognize(&frame).await;

        let mut notices = Vec::new();
        let running = {
            let mut state = self.state.lock();
            if !state.is_current(episode) {
                debug!(
                    "Discarding recognition result of stopped episode {}",
                    episode
                );
                return false;
            }

            match result {
                Ok(outcome) => self.apply_outcome(&mut state, outcome),
                Err(e) => {
                    notices = self.apply_failure(&mut state, &e);
                }
            }

            self.set_busy(&mut state, false);
            state.is_current(episode)
        };

        for notice in notices {
            self.notifier.error(&notice);
        }
        if !running {
            self.notifier.info("Recognition stopped");
        }

        running
    }

    fn apply_outcome(&self, state: &mut LoopState, outcome: RecognitionOutcome) {
        let persons = outcome.persons().to_vec();
        self.set_results(state, persons.clone());

        if let Some(message) = outcome.status_message() {
            debug!("No person recognized: {}", message);
            self.set_status(state, message);
            return;
        }

        let now = Local::now();
        state.history.append(&persons, now);

        let added: Vec<HistoryEntry> = state
            .history
            .entries()
            .take(persons.len())
            .cloned()
            .collect();
        for entry in &added {
            info!(
                "Recognized {} ({}) at {}",
                entry.person.identity,
                entry.label,
                entry.time_of_day()
            );
        }

        self.events.publish(LoopEvent::HistoryAppended {
            entries: added,
            history_len: state.history.len(),
        });
    }

    /// Record a service failure and stop the loop. Returns notices for the operator.
    fn apply_failure(&self, state: &mut LoopState, err: &RecognitionError) -> Vec<String> {
        error!("Recognition request failed, stopping loop: {}", err);

        let notice = match err {
            RecognitionError::Unauthorized { .. } => UNAUTHORIZED_NOTICE.to_string(),
            _ => err
                .server_message()
                .unwrap_or(DEFAULT_FAILURE_NOTICE)
                .to_string(),
        };

        self.set_status(state, STATUS_SERVICE_UNREACHABLE);
        self.set_results(state, Vec::new());
        self.stop_locked(state, STATUS_STOPPED);

        vec![notice]
    }

    /// Stop the running episode, leaving `status` as the final status.
    /// Returns false if the loop was not running.
    fn stop_locked(&self, state: &mut LoopState, status: &str) -> bool {
        if state.run_state != RunState::Running {
            return false;
        }

        state.cancel_episode();
        self.set_busy(state, false);
        self.set_results(state, Vec::new());
        self.set_status(state, status);
        self.transition(state, RunState::Stopped);
        true
    }

    fn transition(&self, state: &mut LoopState, to: RunState) {
        let from = state.run_state;
        state.run_state = to;
        self.events.publish(LoopEvent::StateChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });
    }

    fn set_status(&self, state: &mut LoopState, status: &str) {
        if state.status != status {
            state.status = status.to_string();
            self.events.publish(LoopEvent::StatusChanged {
                status: state.status.clone(),
            });
        }
    }

    fn set_busy(&self, state: &mut LoopState, busy: bool) {
        if state.busy != busy {
            state.busy = busy;
            self.events.publish(LoopEvent::BusyChanged { busy });
        }
    }

    fn set_results(&self, state: &mut LoopState, persons: Vec<RecognizedPerson>) {
        if state.results.is_empty() && persons.is_empty() {
            return;
        }
        state.results = persons;
        self.events.publish(LoopEvent::ResultsChanged {
            persons: state.results.clone(),
        });
    }
}

/// Builder for the loop controller
pub struct LoopControllerBuilder {
    client: Option<Arc<dyn RecognitionClient>>,
    notifier: Option<Arc<dyn Notifier>>,
    event_bus: Option<EventBus>,
    config: ControllerConfig,
}

impl LoopControllerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            client: None,
            notifier: None,
            event_bus: None,
            config: ControllerConfig::default(),
        }
    }

    /// Set the recognition client
    pub fn client(mut self, client: Arc<dyn RecognitionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the notifier (defaults to logging notices)
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the event bus (defaults to a fresh bus)
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Set the controller configuration
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller
    pub fn build(self) -> Result<LoopController> {
        let client = self.client.ok_or_else(|| {
            FacewatchError::component("loop_controller_builder", "Recognition client is required")
        })?;

        if self.config.history_capacity == 0 {
            return Err(FacewatchError::component(
                "loop_controller_builder",
                "History capacity must be greater than 0",
            ));
        }

        Ok(LoopController::new(
            client,
            self.notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier) as Arc<dyn Notifier>),
            self.event_bus.unwrap_or_else(|| EventBus::new(100)),
            self.config,
        ))
    }
}

impl Default for LoopControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
