//! Domain errors raised while speaking the multilang protocol.
//!
//! All errors use a `thiserror`-derived enum with structured context so the
//! engine and record processors can inspect failures programmatically. I/O
//! and JSON errors are wrapped in `Arc` so the error stays small and can be
//! cloned: the checkpoint handshake hands one copy to the calling processor
//! and keeps another to abort the run loop.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from framing, dispatch, or the checkpoint handshake.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// Reading from or writing to the protocol stream failed.
    #[error("I/O error on the protocol stream while {operation}: {source}")]
    Io {
        /// What the engine was doing when the stream failed.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The input stream closed before the daemon sent a terminal action.
    #[error(
        "protocol input ended before a terminal action ({bytes_read} unterminated byte(s) discarded)"
    )]
    EndOfStream {
        /// Bytes of an unterminated line discarded at end of stream.
        bytes_read: usize,
    },

    /// An inbound frame was not valid JSON or did not match the expected shape.
    #[error("failed to decode inbound frame: {message}")]
    Decode {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<Arc<serde_json::Error>>,
    },

    /// An outbound frame could not be serialised.
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// The daemon sent an action this engine does not understand.
    #[error("unknown action '{action}'")]
    UnknownAction {
        /// Action name found on the frame.
        action: String,
    },

    /// The daemon refused a checkpoint request.
    #[error("checkpoint at {} rejected: {message}", display_sequence(.sequence_number.as_deref()))]
    CheckpointRejected {
        /// Sequence number that was requested, `None` for the shard-end sentinel.
        sequence_number: Option<String>,
        /// Error text reported by the daemon.
        message: String,
    },

    /// Frame alignment between the two sides of the stream was lost.
    #[error("protocol desynchronised: expected '{expected}' but received '{actual}'")]
    ProtocolDesync {
        /// Action the engine was waiting for.
        expected: &'static str,
        /// Action that actually arrived.
        actual: String,
    },
}

impl ProtocolError {
    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            source: Arc::new(source),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn decode_json(context: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            message: format!("{context}: {source}"),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns `true` when the error leaves the stream in a state where no
    /// further frame can be trusted.
    ///
    /// A rejected checkpoint is the only recoverable failure: the daemon
    /// answered with a well-formed acknowledgement, so alignment holds.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::CheckpointRejected { .. })
    }
}

fn display_sequence(sequence_number: Option<&str>) -> String {
    sequence_number.map_or_else(
        || String::from("shard end"),
        |sequence| format!("sequence number '{sequence}'"),
    )
}
