use crate::events::{EventBus, EventFilter, LoopEvent};
use crate::history::HistoryEntry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One line describing a history entry
pub fn format_entry(entry: &HistoryEntry) -> String {
    format!(
        "[{}] {} ({})",
        entry.time_of_day(),
        entry.person.identity,
        entry.label
    )
}

/// Log-based renderer showing every change of the loop
pub struct EventRenderer {
    event_bus: EventBus,
    cancellation_token: CancellationToken,
}

impl EventRenderer {
    pub fn new(event_bus: EventBus, cancellation_token: CancellationToken) -> Self {
        Self {
            event_bus,
            cancellation_token,
        }
    }

    /// Spawn the render task
    pub fn start(&self) {
        // Busy flips twice per cycle and is not worth a line
        let mut receiver = self.event_bus.subscribe_filtered(
            EventFilter::Custom(|e| !matches!(e, LoopEvent::BusyChanged { .. })),
            "renderer",
        );
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = receiver.recv() => match event {
                        Ok(event) => render(&event),
                        Err(_) => break,
                    },
                }
            }
            debug!("Event renderer stopped");
        });
    }
}

fn render(event: &LoopEvent) {
    match event {
        LoopEvent::StatusChanged { status } => info!("Status: {}", status),
        LoopEvent::ResultsChanged { persons } if !persons.is_empty() => {
            let names: Vec<String> = persons
                .iter()
                .map(|p| format!("{} ({})", p.identity, p.label()))
                .collect();
            info!("In view: {}", names.join(", "));
        }
        LoopEvent::HistoryAppended { entries, .. } => {
            for entry in entries {
                info!("History: {}", format_entry(entry));
            }
        }
        other => debug!("{}", other.description()),
    }
}
