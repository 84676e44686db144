//! The callback surface implemented by record-processing hosts.
//!
//! The engine calls exactly one [`RecordProcessor`] method per lifecycle
//! event, synchronously, on the thread running the session. Callbacks that
//! may checkpoint receive a [`Checkpointer`] borrowed for the duration of the
//! call, so it can neither outlive the callback nor be used concurrently.

use crate::error::ProtocolError;
use crate::protocol::Record;

/// Issues checkpoint requests to the daemon from inside a callback.
pub trait Checkpointer {
    /// Asks the daemon to persist `sequence_number` and waits for its reply.
    ///
    /// `None` is the shard-end sentinel: every record in the shard has been
    /// processed. Use it only from [`RecordProcessor::shard_ended`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CheckpointRejected`] when the daemon refuses
    /// the checkpoint; the session continues and the caller decides whether
    /// to retry. Any other error is fatal and the engine stops once the
    /// callback returns.
    fn checkpoint(&mut self, sequence_number: Option<&str>) -> Result<(), ProtocolError>;
}

/// Input to [`RecordProcessor::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationInput {
    shard_id: String,
}

impl InitializationInput {
    /// Creates the input for the given shard.
    #[must_use]
    pub fn new(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
        }
    }

    /// Returns the identifier of the assigned shard.
    #[must_use]
    pub const fn shard_id(&self) -> &str {
        self.shard_id.as_str()
    }
}

/// Input to [`RecordProcessor::process_records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecordsInput {
    records: Vec<Record>,
}

impl ProcessRecordsInput {
    /// Wraps a batch of records in delivery order.
    #[must_use]
    pub const fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Returns the records in delivery order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Input to [`RecordProcessor::shutdown_requested`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequestedInput {
    sequence_number: Option<String>,
}

impl ShutdownRequestedInput {
    /// Creates the input with the daemon's last checkpointed position.
    #[must_use]
    pub const fn new(sequence_number: Option<String>) -> Self {
        Self { sequence_number }
    }

    /// Returns the last sequence number the daemon checkpointed, if any.
    #[must_use]
    pub fn sequence_number(&self) -> Option<&str> {
        self.sequence_number.as_deref()
    }
}

/// Host-supplied handling for each lifecycle event of a shard session.
pub trait RecordProcessor {
    /// Called once when the processor is assigned a shard.
    fn initialize(&mut self, input: &InitializationInput);

    /// Called for every batch of records, in delivery order.
    fn process_records(&mut self, input: &ProcessRecordsInput, checkpointer: &mut dyn Checkpointer);

    /// Called when another worker has taken the shard's lease.
    fn lease_lost(&mut self);

    /// Called once every record in the shard has been delivered.
    ///
    /// Implementations should checkpoint with `None` so the daemon can move
    /// on to the shard's children.
    fn shard_ended(&mut self, checkpointer: &mut dyn Checkpointer);

    /// Called when the daemon is shutting down.
    fn shutdown_requested(
        &mut self,
        input: &ShutdownRequestedInput,
        checkpointer: &mut dyn Checkpointer,
    );
}

impl<P: RecordProcessor + ?Sized> RecordProcessor for &mut P {
    fn initialize(&mut self, input: &InitializationInput) {
        (**self).initialize(input);
    }

    fn process_records(&mut self, input: &ProcessRecordsInput, checkpointer: &mut dyn Checkpointer) {
        (**self).process_records(input, checkpointer);
    }

    fn lease_lost(&mut self) {
        (**self).lease_lost();
    }

    fn shard_ended(&mut self, checkpointer: &mut dyn Checkpointer) {
        (**self).shard_ended(checkpointer);
    }

    fn shutdown_requested(
        &mut self,
        input: &ShutdownRequestedInput,
        checkpointer: &mut dyn Checkpointer,
    ) {
        (**self).shutdown_requested(input, checkpointer);
    }
}
