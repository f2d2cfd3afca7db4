mod file;
mod http;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{FacewatchError, Result, SourceError};
use crate::frame::EncodedFrame;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use file::FileFrameSource;
pub use http::HttpSnapshotSource;

/// Live capture handle that yields one encoded still image on demand
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Take a snapshot, or report that none is available right now
    async fn capture(&self) -> std::result::Result<EncodedFrame, SourceError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Build the frame source named by the configuration.
/// Returns `Ok(None)` when the configuration names no source.
pub fn from_config(config: &SourceConfig) -> Result<Option<Arc<dyn FrameSource>>> {
    let source: Arc<dyn FrameSource> = match config.kind {
        SourceKind::None => {
            info!("No frame source configured");
            return Ok(None);
        }
        SourceKind::File => Arc::new(FileFrameSource::new(&config.path)),
        SourceKind::Http => {
            let url = config.url.clone().ok_or_else(|| {
                FacewatchError::component("frame_source", "Snapshot url is required")
            })?;
            Arc::new(HttpSnapshotSource::new(url, config.timeout_seconds)?)
        }
    };

    info!("Using frame source: {}", source.describe());
    Ok(Some(source))
}
