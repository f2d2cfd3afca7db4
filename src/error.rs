use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("Recognition loop error: {0}")]
    Loop(#[from] LoopError),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures raised by the recognition transport
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Recognition service request failed (status: {status:?}): {}", message.as_deref().unwrap_or("no message"))]
    Transport {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Recognition service rejected credentials: {}", message.as_deref().unwrap_or("no message"))]
    Unauthorized { message: Option<String> },

    #[error("Failed to decode recognition response: {details}")]
    Decode { details: String },

    #[error("Failed to build recognition client: {details}")]
    Client { details: String },
}

impl RecognitionError {
    /// Server-supplied message, if the failure carried one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RecognitionError::Transport { message, .. }
            | RecognitionError::Unauthorized { message } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame unavailable: {details}")]
    Unavailable { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Event bus channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("Camera is not ready, cannot start recognition")]
    MissingSource,
}

impl FacewatchError {
    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FacewatchError>;
