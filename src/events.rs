use crate::controller::RunState;
use crate::error::EventBusError;
use crate::history::HistoryEntry;
use crate::person::RecognizedPerson;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Observable changes of a recognition loop
#[derive(Debug, Clone)]
pub enum LoopEvent {
    /// The loop moved between Idle, Running and Stopped
    StateChanged {
        from: RunState,
        to: RunState,
        timestamp: SystemTime,
    },
    /// A recognition request started or finished
    BusyChanged { busy: bool },
    /// The status message changed
    StatusChanged { status: String },
    /// The current result sequence was replaced
    ResultsChanged { persons: Vec<RecognizedPerson> },
    /// New entries were added to the history log, newest first
    HistoryAppended {
        entries: Vec<HistoryEntry>,
        history_len: usize,
    },
}

impl LoopEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            LoopEvent::StateChanged { from, to, .. } => {
                format!("Loop state {:?} -> {:?}", from, to)
            }
            LoopEvent::BusyChanged { busy } => {
                format!("Recognition {}", if *busy { "in flight" } else { "idle" })
            }
            LoopEvent::StatusChanged { status } => format!("Status: {}", status),
            LoopEvent::ResultsChanged { persons } => {
                format!("{} person(s) in current result", persons.len())
            }
            LoopEvent::HistoryAppended {
                entries,
                history_len,
            } => format!(
                "{} history entr{} added ({} kept)",
                entries.len(),
                if entries.len() == 1 { "y" } else { "ies" },
                history_len
            ),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            LoopEvent::StateChanged { .. } => "state_changed",
            LoopEvent::BusyChanged { .. } => "busy_changed",
            LoopEvent::StatusChanged { .. } => "status_changed",
            LoopEvent::ResultsChanged { .. } => "results_changed",
            LoopEvent::HistoryAppended { .. } => "history_appended",
        }
    }
}

/// Broadcast bus that lets renderers observe every loop change
pub struct EventBus {
    sender: broadcast::Sender<LoopEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Whether every published event is also logged at debug level
    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<LoopEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receive
    pub fn subscribe_filtered<S: Into<String>>(&self, filter: EventFilter, name: S) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers, returning how many received it.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: LoopEvent) -> usize {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        if let LoopEvent::StateChanged { from, to, .. } = &event {
            info!("Recognition loop {:?} -> {:?}", from, to);
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&LoopEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &LoopEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<LoopEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(receiver: broadcast::Receiver<LoopEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next matching event. Lagging skips ahead rather than failing.
    pub async fn recv(&mut self) -> Result<LoopEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive a matching event without blocking
    pub fn try_recv(&mut self) -> Result<Option<LoopEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
