//! `spinslim-types` – shared vocabulary for the camera control crates.
//!
//! Everything here is plain data: the error taxonomy, the trigger state, the
//! enumeration values written to camera nodes, and the retrieved frame.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque failure reported by the vendor camera binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("SDK error {code}: {message}")]
pub struct SdkError {
    /// Vendor error code (negative on Spinnaker-style SDKs).
    pub code: i32,
    pub message: String,
}

impl SdkError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure while looking up, reading, or writing a named node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("node '{0}' is unavailable or not writable")]
    NodeUnavailable(String),

    #[error("enum entry '{0}' is unavailable or not readable")]
    EntryUnavailable(String),

    #[error("executing command node '{node}' failed: {cause}")]
    CommandExecutionFailed { node: String, cause: SdkError },

    #[error("writing node '{node}' failed: {cause}")]
    WriteFailed { node: String, cause: SdkError },

    #[error("reading node '{node}' failed: {cause}")]
    ReadFailed { node: String, cause: SdkError },
}

/// Errors raised by the software trigger state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("trigger node '{0}' is unavailable or not writable")]
    NodeUnavailable(String),

    #[error("trigger entry '{0}' is unavailable or not readable")]
    EntryUnavailable(String),

    #[error("executing trigger command '{node}' failed: {cause}")]
    CommandExecutionFailed { node: String, cause: SdkError },

    #[error("writing trigger node '{node}' failed: {cause}")]
    WriteFailed { node: String, cause: SdkError },

    #[error("reading trigger node '{node}' failed: {cause}")]
    ReadFailed { node: String, cause: SdkError },

    /// `operation` was requested while the controller was in `state`.
    #[error("cannot {operation} while trigger is {state}")]
    InvalidState {
        operation: &'static str,
        state: TriggerState,
    },
}

impl TriggerError {
    /// `true` when the error is a caller contract violation rather than a
    /// condition reported by the camera.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, TriggerError::InvalidState { .. })
    }
}

impl From<NodeError> for TriggerError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NodeUnavailable(name) => TriggerError::NodeUnavailable(name),
            NodeError::EntryUnavailable(name) => TriggerError::EntryUnavailable(name),
            NodeError::CommandExecutionFailed { node, cause } => {
                TriggerError::CommandExecutionFailed { node, cause }
            }
            NodeError::WriteFailed { node, cause } => TriggerError::WriteFailed { node, cause },
            NodeError::ReadFailed { node, cause } => TriggerError::ReadFailed { node, cause },
        }
    }
}

/// Process-level error spanning camera lookup, node access, triggering and
/// streaming.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera index {index} out of range ({count} cameras)")]
    CameraNotFound { index: usize, count: usize },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error("{operation} failed: {cause}")]
    Sdk {
        operation: &'static str,
        cause: SdkError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("shutdown failed for {} camera(s)", .0.len())]
    Shutdown(Vec<(usize, SdkError)>),
}

impl CameraError {
    pub fn sdk(operation: &'static str, cause: SdkError) -> Self {
        CameraError::Sdk { operation, cause }
    }
}

/// Lifecycle of one software-trigger controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerState {
    Unconfigured,
    Configured,
    Fired,
    Reset,
}

impl TriggerState {
    /// Whether a software trigger may be fired from this state.
    pub fn can_fire(self) -> bool {
        matches!(self, TriggerState::Configured | TriggerState::Fired)
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerState::Unconfigured => "unconfigured",
            TriggerState::Configured => "configured",
            TriggerState::Fired => "fired",
            TriggerState::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Pixel formats selectable through the `PixelFormat` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    #[default]
    Mono8,
    Rgb8,
}

impl PixelFormat {
    /// Enum entry name on the `PixelFormat` node.
    pub fn entry_name(self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "Mono8",
            PixelFormat::Rgb8 => "RGB8",
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Stream buffer policies selectable through `StreamBufferHandlingMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BufferHandlingMode {
    NewestFirst,
    NewestOnly,
    #[default]
    OldestFirst,
    OldestFirstOverwrite,
}

impl BufferHandlingMode {
    /// Enum entry name on the `StreamBufferHandlingMode` node.
    pub fn entry_name(self) -> &'static str {
        match self {
            BufferHandlingMode::NewestFirst => "NewestFirst",
            BufferHandlingMode::NewestOnly => "NewestOnly",
            BufferHandlingMode::OldestFirst => "OldestFirst",
            BufferHandlingMode::OldestFirstOverwrite => "OldestFirstOverwrite",
        }
    }
}

/// A frame retrieved from a camera and already released back to the SDK.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Device timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Host time at which the frame was handed to the caller.
    pub received_at: DateTime<Utc>,
    pub data: Vec<u8>,
}
