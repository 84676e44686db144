//! Reference record processor.

use multilang_protocol::{
    Checkpointer, InitializationInput, ProcessRecordsInput, RecordProcessor,
    ShutdownRequestedInput,
};
use tracing::{info, warn};


const SAMPLE_TARGET: &str = "multilang_sample::processor";

/// Logs every callback and checkpoints the latest sequence number it has
/// seen.
///
/// Batches checkpoint at the newest record delivered so far, shard end
/// checkpoints with the shard-end sentinel, and shutdown checkpoints only
/// when at least one record has arrived. Rejected checkpoints are logged and
/// otherwise ignored.
#[derive(Debug, Default)]
pub struct SampleProcessor {
    shard_id: Option<String>,
    latest_sequence_number: Option<String>,
    records_seen: usize,
}

impl SampleProcessor {
    /// Creates a processor that has seen no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shard assigned at initialisation.
    #[must_use]
    pub fn shard_id(&self) -> Option<&str> {
        self.shard_id.as_deref()
    }

    /// Sequence number of the newest record delivered so far.
    #[must_use]
    pub fn latest_sequence_number(&self) -> Option<&str> {
        self.latest_sequence_number.as_deref()
    }

    /// Total number of records delivered so far.
    #[must_use]
    pub const fn records_seen(&self) -> usize {
        self.records_seen
    }

    fn checkpoint(
        &self,
        checkpointer: &mut dyn Checkpointer,
        sequence_number: Option<&str>,
        callback: &'static str,
    ) {
        match checkpointer.checkpoint(sequence_number) {
            Ok(()) => info!(
                target: SAMPLE_TARGET,
                shard_id = self.shard_id(),
                sequence_number,
                callback,
                "checkpoint recorded"
            ),
            Err(error) => warn!(
                target: SAMPLE_TARGET,
                shard_id = self.shard_id(),
                sequence_number,
                callback,
                fatal = error.is_fatal(),
                %error,
                "checkpoint failed"
            ),
        }
    }
}

impl RecordProcessor for SampleProcessor {
    fn initialize(&mut self, input: &InitializationInput) {
        info!(
            target: SAMPLE_TARGET,
            shard_id = input.shard_id(),
            "sample processor received initialize"
        );
        self.shard_id = Some(input.shard_id().to_owned());
    }

    fn process_records(&mut self, input: &ProcessRecordsInput, checkpointer: &mut dyn Checkpointer) {
        info!(
            target: SAMPLE_TARGET,
            shard_id = self.shard_id(),
            records = input.records().len(),
            "sample processor received processRecords"
        );
        self.records_seen += input.records().len();
        if let Some(last) = input.records().last() {
            self.latest_sequence_number = Some(last.sequence_number().to_owned());
        }

        // A null checkpoint means shard end, so an empty first batch must not
        // checkpoint at all.
        if let Some(sequence_number) = self.latest_sequence_number() {
            self.checkpoint(checkpointer, Some(sequence_number), "processRecords");
        }
    }

    fn lease_lost(&mut self) {
        info!(
            target: SAMPLE_TARGET,
            shard_id = self.shard_id(),
            "sample processor received leaseLost"
        );
    }

    fn shard_ended(&mut self, checkpointer: &mut dyn Checkpointer) {
        info!(
            target: SAMPLE_TARGET,
            shard_id = self.shard_id(),
            "sample processor received shardEnded"
        );
        self.checkpoint(checkpointer, None, "shardEnded");
    }

    fn shutdown_requested(
        &mut self,
        input: &ShutdownRequestedInput,
        checkpointer: &mut dyn Checkpointer,
    ) {
        info!(
            target: SAMPLE_TARGET,
            shard_id = self.shard_id(),
            daemon_checkpoint = input.sequence_number(),
            "sample processor received shutdownRequested"
        );
        if let Some(sequence_number) = self.latest_sequence_number() {
            self.checkpoint(checkpointer, Some(sequence_number), "shutdownRequested");
        }
    }
}
