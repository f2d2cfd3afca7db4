use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Encoding of a captured still image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    Jpeg,
    Png,
}

impl FrameFormat {
    /// Detect the format from the leading magic bytes, defaulting to JPEG
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            FrameFormat::Png
        } else {
            FrameFormat::Jpeg
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "image/jpeg",
            FrameFormat::Png => "image/png",
        }
    }
}

/// A single encoded still image pulled from a frame source
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Frame identifier, monotonically increasing per source
    pub id: u64,
    /// Timestamp when the frame was captured
    pub timestamp: SystemTime,
    /// Encoded image bytes (cheap to clone)
    pub data: Bytes,
    pub format: FrameFormat,
}

impl EncodedFrame {
    /// Create a frame, detecting its format from the data
    pub fn new(id: u64, timestamp: SystemTime, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let format = FrameFormat::detect(&data);
        Self {
            id,
            timestamp,
            data,
            format,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Render as a `data:` URL, the form the recognition endpoint accepts
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}
