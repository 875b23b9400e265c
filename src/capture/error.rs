use crate::block::{BlockError, FrameError};
use thiserror::Error;

/// Stream-level failures. All of these are fatal: the input is unusable and
/// the process reports and exits (see the error taxonomy).
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("input does not look like a pcap or pcapng capture")]
    NotACapture,

    #[error("capture stream ended unexpectedly")]
    UnexpectedEof,

    #[error("corrupted capture: {0}")]
    CorruptedCapture(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BlockError> for CaptureError {
    fn from(e: BlockError) -> Self {
        CaptureError::CorruptedCapture(e.to_string())
    }
}

impl From<FrameError> for CaptureError {
    fn from(e: FrameError) -> Self {
        CaptureError::CorruptedCapture(e.to_string())
    }
}
