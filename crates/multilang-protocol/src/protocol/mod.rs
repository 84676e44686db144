//! Wire types for the daemon to record-processor conversation.
//!
//! Every frame is one JSON object on one line, discriminated by its `action`
//! field. Inbound lifecycle frames decode into [`Event`]; the `checkpoint`
//! action is reused by the daemon as the reply to a checkpoint request and
//! decodes into [`CheckpointAck`] instead. Which interpretation applies is
//! decided by the reader, never by the frame, so [`Frame`] keeps the raw
//! object until the caller picks one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Action name of the `initialize` lifecycle frame.
pub const ACTION_INITIALIZE: &str = "initialize";
/// Action name of the `processRecords` lifecycle frame.
pub const ACTION_PROCESS_RECORDS: &str = "processRecords";
/// Action name of the `leaseLost` lifecycle frame.
pub const ACTION_LEASE_LOST: &str = "leaseLost";
/// Action name of the `shardEnded` lifecycle frame.
pub const ACTION_SHARD_ENDED: &str = "shardEnded";
/// Action name of the `shutdownRequested` lifecycle frame.
pub const ACTION_SHUTDOWN_REQUESTED: &str = "shutdownRequested";
/// Action name shared by checkpoint requests and their acknowledgements.
pub const ACTION_CHECKPOINT: &str = "checkpoint";
/// Action name of outbound status frames.
pub const ACTION_STATUS: &str = "status";

const LIFECYCLE_ACTIONS: [&str; 5] = [
    ACTION_INITIALIZE,
    ACTION_PROCESS_RECORDS,
    ACTION_LEASE_LOST,
    ACTION_SHARD_ENDED,
    ACTION_SHUTDOWN_REQUESTED,
];

/// A single inbound line that parsed as a JSON object with a string `action`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    action: String,
    body: Value,
}

impl Frame {
    /// Parses one protocol line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the line is not a JSON object or
    /// lacks a string `action` field.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let body: Value = serde_json::from_str(line)
            .map_err(|source| ProtocolError::decode_json("frame is not valid JSON", source))?;

        let Some(object) = body.as_object() else {
            return Err(ProtocolError::decode("frame is not a JSON object"));
        };
        let action = match object.get("action") {
            Some(Value::String(action)) => action.clone(),
            Some(other) => {
                return Err(ProtocolError::decode(format!(
                    "frame action must be a string, found {other}"
                )));
            }
            None => return Err(ProtocolError::decode("frame has no action")),
        };

        Ok(Self { action, body })
    }

    /// Returns the frame's action name.
    #[must_use]
    pub const fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Interprets the frame as a lifecycle event read by the main loop.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAction`] for any action that is not a
    /// lifecycle action, including a `checkpoint` acknowledgement read outside
    /// a handshake, and [`ProtocolError::Decode`] when the payload does not
    /// match the action.
    pub fn into_event(self) -> Result<Event, ProtocolError> {
        if !LIFECYCLE_ACTIONS.contains(&self.action.as_str()) {
            return Err(ProtocolError::UnknownAction {
                action: self.action,
            });
        }

        let context = format!("malformed '{}' frame", self.action);
        serde_json::from_value(self.body)
            .map_err(|source| ProtocolError::decode_json(&context, source))
    }

    /// Interprets the frame as the reply to a checkpoint request.
    ///
    /// The action is not checked here; the handshake compares it so that a
    /// reported error takes precedence over a mismatched action.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the `error` field is not a
    /// string.
    pub fn into_acknowledgement(self) -> Result<CheckpointAck, ProtocolError> {
        serde_json::from_value(self.body).map_err(|source| {
            ProtocolError::decode_json("malformed checkpoint acknowledgement", source)
        })
    }
}

/// Lifecycle events dispatched to the record processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    /// The processor has been assigned a shard.
    Initialize {
        /// Identifier of the assigned shard.
        shard_id: String,
    },
    /// A batch of records in delivery order.
    ProcessRecords {
        /// Records to process.
        #[serde(default, deserialize_with = "null_as_empty")]
        records: Vec<Record>,
    },
    /// Another worker took the lease; checkpointing is no longer possible.
    LeaseLost,
    /// Every record in the shard has been delivered.
    ShardEnded,
    /// The daemon is shutting down.
    ShutdownRequested {
        /// Last sequence number the daemon checkpointed, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkpoint: Option<String>,
    },
}

impl Event {
    /// Returns the wire action name echoed back in the status frame.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => ACTION_INITIALIZE,
            Self::ProcessRecords { .. } => ACTION_PROCESS_RECORDS,
            Self::LeaseLost => ACTION_LEASE_LOST,
            Self::ShardEnded => ACTION_SHARD_ENDED,
            Self::ShutdownRequested { .. } => ACTION_SHUTDOWN_REQUESTED,
        }
    }

    /// Returns `true` when handling this event ends the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ShardEnded | Self::ShutdownRequested { .. })
    }
}

/// A data record delivered inside a `processRecords` frame.
///
/// `data` travels as standard base64 text and is decoded on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(with = "base64_data")]
    data: Vec<u8>,
    partition_key: String,
    sequence_number: String,
}

impl Record {
    /// Creates a record from its decoded parts.
    #[must_use]
    pub fn new(
        data: impl Into<Vec<u8>>,
        partition_key: impl Into<String>,
        sequence_number: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            partition_key: partition_key.into(),
            sequence_number: sequence_number.into(),
        }
    }

    /// Returns the decoded payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the partition key.
    #[must_use]
    pub const fn partition_key(&self) -> &str {
        self.partition_key.as_str()
    }

    /// Returns the sequence number assigned by the upstream source.
    #[must_use]
    pub const fn sequence_number(&self) -> &str {
        self.sequence_number.as_str()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<Record>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

mod base64_data {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(|error| serde::de::Error::custom(format!("invalid base64 data: {error}")))
    }
}

/// The daemon's reply to a checkpoint request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckpointAck {
    action: String,
    #[serde(default)]
    error: Option<String>,
}

impl CheckpointAck {
    /// Returns the reply's action name.
    #[must_use]
    pub const fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the daemon's error text, treating an empty string as success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}

/// Frames written by the record processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    /// Acknowledges receipt of a lifecycle action.
    Status {
        /// Action being acknowledged.
        response_for: String,
    },
    /// Asks the daemon to persist a checkpoint.
    Checkpoint {
        /// Position to persist; `None` serialises as `null`, the shard-end
        /// sentinel.
        sequence_number: Option<String>,
    },
}

impl OutboundMessage {
    /// Builds the status frame for `action`.
    #[must_use]
    pub fn status(action: impl Into<String>) -> Self {
        Self::Status {
            response_for: action.into(),
        }
    }

    /// Builds a checkpoint request.
    #[must_use]
    pub fn checkpoint(sequence_number: Option<&str>) -> Self {
        Self::Checkpoint {
            sequence_number: sequence_number.map(str::to_owned),
        }
    }

    /// Serialises the message to its single-line JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode(source.into()))
    }
}
