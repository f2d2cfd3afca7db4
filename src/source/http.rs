use super::FrameSource;
use crate::error::{FacewatchError, Result, SourceError};
use crate::frame::EncodedFrame;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::trace;

/// Pulls stills from an IP camera's HTTP snapshot endpoint
pub struct HttpSnapshotSource {
    http: Client,
    url: String,
    frame_counter: AtomicU64,
}

impl HttpSnapshotSource {
    pub fn new<S: Into<String>>(url: S, timeout_seconds: u64) -> Result<Self> {
        if timeout_seconds == 0 {
            return Err(FacewatchError::component(
                "frame_source",
                "Snapshot timeout must be greater than 0",
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                FacewatchError::component(
                    "frame_source",
                    format!("Failed to build snapshot client: {}", e),
                )
            })?;

        Ok(Self {
            http,
            url: url.into(),
            frame_counter: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FrameSource for HttpSnapshotSource {
    async fn capture(&self) -> std::result::Result<EncodedFrame, SourceError> {
        let unavailable = |details: String| SourceError::Unavailable { details };

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(format!("snapshot request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("snapshot returned {}", status)));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read snapshot body: {}", e)))?;

        if data.is_empty() {
            return Err(unavailable("snapshot body is empty".to_string()));
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!("Fetched snapshot {} ({} bytes)", frame_id, data.len());

        Ok(EncodedFrame::new(frame_id, SystemTime::now(), data))
    }

    fn describe(&self) -> String {
        format!("http snapshot {}", self.url)
    }
}
