use super::FrameSource;
use crate::error::SourceError;
use crate::frame::EncodedFrame;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::trace;

/// Reads a snapshot file that an external grabber keeps refreshed
pub struct FileFrameSource {
    path: PathBuf,
    frame_counter: AtomicU64,
}

impl FileFrameSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            frame_counter: AtomicU64::new(0),
        }
    }

    /// Number of frames captured so far
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn capture(&self) -> Result<EncodedFrame, SourceError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SourceError::Unavailable {
                details: format!("{}: {}", self.path.display(), e),
            })?;

        if data.is_empty() {
            return Err(SourceError::Unavailable {
                details: format!("{} is empty", self.path.display()),
            });
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Read snapshot {} from {} ({} bytes)",
            frame_id,
            self.path.display(),
            data.len()
        );

        Ok(EncodedFrame::new(frame_id, SystemTime::now(), data))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
