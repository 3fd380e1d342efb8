// Events emitted by a streaming generation task.

use crate::error::ServiceError;

/// One step of a streamed response. Every event carries the generation of
/// the request that produced it so receivers can drop events from superseded
/// requests.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    Token {
        text: String,
        generation: u64,
    },
    Complete {
        full_text: String,
        input_tokens: u32,
        output_tokens: u32,
        stop_reason: Option<String>,
        generation: u64,
    },
    Error {
        error: ServiceError,
        generation: u64,
    },
}

impl LlmEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LlmEvent::Token { generation, .. }
            | LlmEvent::Complete { generation, .. }
            | LlmEvent::Error { generation, .. } => *generation,
        }
    }

    /// `true` for `Complete` and `Error`, the last event of a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LlmEvent::Token { .. })
    }
}
