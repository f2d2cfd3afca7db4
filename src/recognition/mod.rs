mod auth;
mod http;

use crate::error::RecognitionError;
use crate::frame::EncodedFrame;
use crate::person::RecognitionOutcome;
use async_trait::async_trait;

pub use auth::{NoTokenProvider, StaticTokenProvider, TokenProvider};
pub use http::{HttpRecognitionClient, HttpRecognitionClientBuilder, RecognizeRequest};

/// Remote face recognition service
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Submit one encoded frame and wait for the service's verdict
    async fn recognize(&self, frame: &EncodedFrame) -> Result<RecognitionOutcome, RecognitionError>;
}
