use serde::{Deserialize, Serialize};

/// Lifecycle of the streaming side of a device session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Completed,
    Cancelled,
    Faulted(String),
}

impl StreamState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &StreamState) -> bool {
        use StreamState::*;

        matches!(
            (self, target),
            // From Idle
            (Idle, Streaming) |

            // From Streaming
            (Streaming, Completed) |
            (Streaming, Cancelled) |
            (Streaming, Faulted(_)) |

            // Terminal states restart with a new stream
            (Completed, Streaming) |
            (Cancelled, Streaming) |
            (Faulted(_), Streaming)
        )
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Faulted(_))
    }

    /// Get human-readable state name
    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Streaming => "Streaming",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Faulted(_) => "Faulted",
        }
    }
}
