pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod history;
pub mod notify;
pub mod person;
pub mod recognition;
pub mod source;

pub use app::{Command, FacewatchApp, ShutdownReason};
pub use config::FacewatchConfig;
pub use controller::{LoopController, LoopControllerBuilder, LoopSnapshot, RunState};
pub use error::{FacewatchError, LoopError, RecognitionError, Result, SourceError};
pub use events::{EventBus, EventFilter, EventReceiver, LoopEvent};
pub use frame::{EncodedFrame, FrameFormat};
pub use history::{HistoryEntry, HistoryLog};
pub use notify::{NoticeLevel, Notifier, TracingNotifier};
pub use person::{PersonLabel, RecognitionOutcome, RecognizedPerson};
pub use recognition::{HttpRecognitionClient, RecognitionClient, StaticTokenProvider, TokenProvider};
pub use source::{FileFrameSource, FrameSource, HttpSnapshotSource};
