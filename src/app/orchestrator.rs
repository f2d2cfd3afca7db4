use super::keyboard_input::KeyboardInputHandler;
use super::renderer::{format_entry, EventRenderer};
use super::Command;
use crate::config::FacewatchConfig;
use crate::controller::LoopController;
use crate::error::Result;
use crate::events::EventBus;
use crate::notify::{Notifier, TracingNotifier};
use crate::recognition::{HttpRecognitionClient, RecognitionClient};
use crate::source::{self, FrameSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires configuration, frame source, recognition client and loop together
pub struct FacewatchApp {
    pub(super) config: FacewatchConfig,
    pub(super) controller: LoopController,
    pub(super) source: Option<Arc<dyn FrameSource>>,
    pub(super) renderer: EventRenderer,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) autostart: bool,
    pub(super) cancellation_token: CancellationToken,
}

impl FacewatchApp {
    /// Create the application from configuration
    pub fn new(config: FacewatchConfig) -> Result<Self> {
        let client: Arc<dyn RecognitionClient> = Arc::new(
            HttpRecognitionClient::builder()
                .config(config.recognition.clone())
                .auth(&config.auth)
                .build()?,
        );
        info!("Recognition endpoint: {}{}", config.recognition.base_url, config.recognition.recognize_path);

        let source = source::from_config(&config.source)?;

        Self::with_parts(config, client, source, Arc::new(TracingNotifier))
    }

    /// Create the application from already-built collaborators
    pub fn with_parts(
        config: FacewatchConfig,
        client: Arc<dyn RecognitionClient>,
        source: Option<Arc<dyn FrameSource>>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let event_bus = if config.system.debug_events {
            EventBus::with_debug_logging(config.system.event_bus_capacity)
        } else {
            EventBus::new(config.system.event_bus_capacity)
        };
        let controller = LoopController::builder()
            .client(client)
            .notifier(notifier)
            .event_bus(event_bus.clone())
            .config(config.controller.clone())
            .build()?;

        let cancellation_token = CancellationToken::new();
        let renderer = EventRenderer::new(event_bus, cancellation_token.clone());

        Ok(Self {
            config,
            controller,
            source,
            renderer,
            keyboard_handler: None,
            keyboard_enabled: true,
            autostart: false,
            cancellation_token,
        })
    }

    /// Enable or disable keyboard control
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    /// Start recognizing as soon as the app runs
    pub fn set_autostart(&mut self, autostart: bool) {
        self.autostart = autostart;
    }

    pub fn controller(&self) -> &LoopController {
        &self.controller
    }

    pub fn config(&self) -> &FacewatchConfig {
        &self.config
    }

    /// Apply one operator command. Returns false when the app should quit.
    pub fn handle_command(&self, command: Command) -> bool {
        match command {
            Command::Start => {
                // Failure is already reported through the notifier
                let _ = self.controller.start(self.source.clone());
            }
            Command::Stop => self.controller.stop(),
            Command::Toggle => {
                if self.controller.is_running() {
                    self.controller.stop();
                } else {
                    let _ = self.controller.start(self.source.clone());
                }
            }
            Command::ShowHistory => {
                let history = self.controller.history();
                if history.is_empty() {
                    info!("History is empty");
                }
                for entry in &history {
                    info!("History: {}", format_entry(entry));
                }
            }
            Command::Quit => return false,
        }
        true
    }
}
