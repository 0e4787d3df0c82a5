use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for device session and streaming operations
pub type SdrResult<T> = Result<T, SdrError>;

/// Errors raised by the session, the validator and the transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdrError {
    #[error("{field} must be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{field} should be an integer value from {min}-{max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("device is closed")]
    DeviceClosed,

    #[error("{call} failed with code {code}")]
    Transport { call: &'static str, code: i32 },
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    TypeMismatch,
    OutOfRange,
    InvalidArgument,
    InvalidState,
    Transport,
}

impl SdrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState(_) | Self::DeviceClosed => ErrorKind::InvalidState,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    pub fn transport(call: &'static str, code: i32) -> Self {
        Self::Transport { call, code }
    }

    /// Hardware return code, if this came from the transport
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_names_call() {
        let err = SdrError::transport("rtlsdr_set_center_freq", -1);
        assert_eq!(err.to_string(), "rtlsdr_set_center_freq failed with code -1");
        assert_eq!(err.code(), Some(-1));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_device_closed_is_invalid_state() {
        assert_eq!(SdrError::DeviceClosed.kind(), ErrorKind::InvalidState);
        assert_eq!(SdrError::DeviceClosed.code(), None);
    }

    #[test]
    fn test_out_of_range_message() {
        let err = SdrError::OutOfRange { field: "offset", value: 256, min: 0, max: 255 };
        assert_eq!(err.to_string(), "offset should be an integer value from 0-255 (got 256)");
    }
}
