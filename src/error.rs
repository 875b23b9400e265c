//! Top-level error type for the handful of call sites (CLI entry, subprocess
//! launch) that need to report a single failure and pick an exit code.
//!
//! Per-packet and per-message failures are *not* funneled through here: they
//! are caught at the smallest enclosing loop, logged, and the loop
//! continues. Only stream-level and I/O failures propagate this far.

use crate::capture::CaptureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to launch capture subprocess: {0}")]
    Subprocess(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
