use crate::history::{HistoryEntry, HistoryLog};
use crate::person::RecognizedPerson;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const STATUS_WAITING: &str = "waiting to start recognition";
pub const STATUS_RECOGNIZING: &str = "recognizing...";
pub const STATUS_STOPPED: &str = "recognition stopped";
pub const STATUS_SERVICE_UNREACHABLE: &str = "recognition service unreachable";

/// Lifecycle of a recognition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// Never started
    Idle,
    /// Cycles are being executed and scheduled
    Running,
    /// Stopped by the operator or by a service failure; may be restarted
    Stopped,
}

/// The next cycle of an episode, waiting out the cycle delay
#[derive(Debug)]
pub(crate) struct PendingCycle {
    pub due: Instant,
    pub cancel: CancellationToken,
}

/// Mutable loop state, only touched under the controller's lock
#[derive(Debug)]
pub(crate) struct LoopState {
    pub run_state: RunState,
    pub busy: bool,
    pub status: String,
    pub results: Vec<RecognizedPerson>,
    pub history: HistoryLog,
    /// Incremented by every successful start
    pub episode: u64,
    pub episode_cancel: Option<CancellationToken>,
    pub pending: Option<PendingCycle>,
}

impl LoopState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            run_state: RunState::Idle,
            busy: false,
            status: STATUS_WAITING.to_string(),
            results: Vec::new(),
            history: HistoryLog::new(history_capacity),
            episode: 0,
            episode_cancel: None,
            pending: None,
        }
    }

    /// True while `episode` is the live, running episode
    pub fn is_current(&self, episode: u64) -> bool {
        self.run_state == RunState::Running && self.episode == episode
    }

    /// Cancel the scheduled cycle, if any
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the scheduled cycle and the episode driving it
    pub fn cancel_episode(&mut self) {
        self.cancel_pending();
        if let Some(token) = self.episode_cancel.take() {
            token.cancel();
        }
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            state: self.run_state,
            busy: self.busy,
            status: self.status.clone(),
            results: self.results.clone(),
            history: self.history.to_vec(),
        }
    }
}

/// Read-only copy of everything a renderer may show
#[derive(Debug, Clone, Serialize)]
pub struct LoopSnapshot {
    pub state: RunState,
    pub busy: bool,
    pub status: String,
    pub results: Vec<RecognizedPerson>,
    pub history: Vec<HistoryEntry>,
}
