use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FacewatchConfig {
    pub recognition: RecognitionConfig,
    pub auth: AuthConfig,
    pub source: SourceConfig,
    pub controller: ControllerConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecognitionConfig {
    /// Base URL of the recognition service (proxy base + AI API path)
    #[serde(default = "default_recognition_base_url")]
    pub base_url: String,

    /// Path of the frame recognition endpoint
    #[serde(default = "default_recognize_path")]
    pub recognize_path: String,

    /// Request timeout in seconds; recognition can be slow server-side
    #[serde(default = "default_recognition_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Token sent in the Authorization header, if any
    #[serde(default)]
    pub token: Option<String>,

    /// Authorization scheme prefix
    #[serde(default = "default_auth_scheme")]
    pub scheme: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Snapshot file refreshed by an external grabber
    File,
    /// HTTP snapshot endpoint of an IP camera
    Http,
    /// No frame source configured
    None,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,

    /// Snapshot file path (kind = "file")
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Snapshot URL (kind = "http")
    #[serde(default)]
    pub url: Option<String>,

    /// Snapshot fetch timeout in seconds (kind = "http")
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControllerConfig {
    /// Delay between the end of one cycle and the start of the next
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,

    /// Maximum number of history entries kept
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Log every published loop event at debug level
    #[serde(default)]
    pub debug_events: bool,
}

impl ControllerConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }
}

impl FacewatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("facewatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("recognition.base_url", default_recognition_base_url())?
            .set_default("recognition.recognize_path", default_recognize_path())?
            .set_default(
                "recognition.timeout_seconds",
                default_recognition_timeout() as i64,
            )?
            .set_default(
                "recognition.connect_timeout_seconds",
                default_connect_timeout() as i64,
            )?
            .set_default("auth.scheme", default_auth_scheme())?
            .set_default("source.kind", "file")?
            .set_default("source.path", default_source_path())?
            .set_default("source.timeout_seconds", default_source_timeout() as i64)?
            .set_default("controller.cycle_delay_ms", default_cycle_delay_ms() as i64)?
            .set_default(
                "controller.history_capacity",
                default_history_capacity() as i64,
            )?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("system.debug_events", false)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with FACEWATCH_ prefix
            .add_source(
                Environment::with_prefix("FACEWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: FacewatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recognition.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Recognition base_url must not be empty".to_string(),
            ));
        }

        if !self.recognition.recognize_path.starts_with('/') {
            return Err(ConfigError::Message(
                "Recognition recognize_path must start with '/'".to_string(),
            ));
        }

        if self.recognition.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Recognition timeout_seconds must be greater than 0".to_string(),
            ));
        }

        match self.source.kind {
            SourceKind::File if self.source.path.is_empty() => {
                return Err(ConfigError::Message(
                    "Source path must be set for file sources".to_string(),
                ));
            }
            SourceKind::Http if self.source.url.as_deref().map_or(true, str::is_empty) => {
                return Err(ConfigError::Message(
                    "Source url must be set for http sources".to_string(),
                ));
            }
            SourceKind::Http if self.source.timeout_seconds == 0 => {
                return Err(ConfigError::Message(
                    "Source timeout_seconds must be greater than 0".to_string(),
                ));
            }
            _ => {}
        }

        if self.controller.history_capacity == 0 {
            return Err(ConfigError::Message(
                "History capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FacewatchConfig {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig {
                base_url: default_recognition_base_url(),
                recognize_path: default_recognize_path(),
                timeout_seconds: default_recognition_timeout(),
                connect_timeout_seconds: default_connect_timeout(),
            },
            auth: AuthConfig {
                token: None,
                scheme: default_auth_scheme(),
            },
            source: SourceConfig {
                kind: default_source_kind(),
                path: default_source_path(),
                url: None,
                timeout_seconds: default_source_timeout(),
            },
            controller: ControllerConfig::default(),
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                debug_events: false,
            },
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_delay_ms: default_cycle_delay_ms(),
            history_capacity: default_history_capacity(),
        }
    }
}

// Default value functions
fn default_recognition_base_url() -> String {
    "http://127.0.0.1:8000/api/ai".to_string()
}
fn default_recognize_path() -> String {
    "/recognize-frame".to_string()
}
fn default_recognition_timeout() -> u64 {
    60
}
fn default_connect_timeout() -> u64 {
    10
}

fn default_auth_scheme() -> String {
    "Token".to_string()
}

fn default_source_kind() -> SourceKind {
    SourceKind::File
}
fn default_source_path() -> String {
    "./snapshot.jpg".to_string()
}
fn default_source_timeout() -> u64 {
    5
}

fn default_cycle_delay_ms() -> u64 {
    800
}
fn default_history_capacity() -> usize {
    10
}

fn default_event_bus_capacity() -> usize {
    100
}
