//! Crate-level test support and behavioural tests.

use crate::engine::Engine;
use crate::error::ProtocolError;
use crate::processor::{
    Checkpointer, InitializationInput, ProcessRecordsInput, RecordProcessor,
    ShutdownRequestedInput,
};
use crate::protocol::Record;


/// One observed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Initialize(String),
    ProcessRecords(Vec<Record>),
    LeaseLost,
    ShardEnded,
    ShutdownRequested(Option<String>),
}

/// Processor that records every callback and issues scripted checkpoints.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) calls: Vec<Call>,
    /// Checkpoints issued from every `process_records` call.
    pub(crate) on_records: Vec<Option<String>>,
    /// Checkpoints issued from `shard_ended`.
    pub(crate) on_shard_end: Vec<Option<String>>,
    /// Checkpoints issued from `shutdown_requested`.
    pub(crate) on_shutdown: Vec<Option<String>>,
    /// Result of every checkpoint call, in order.
    pub(crate) outcomes: Vec<Result<(), ProtocolError>>,
}

impl Recorder {
    fn issue(
        plan: &[Option<String>],
        checkpointer: &mut dyn Checkpointer,
        outcomes: &mut Vec<Result<(), ProtocolError>>,
    ) {
        for sequence_number in plan {
            outcomes.push(checkpointer.checkpoint(sequence_number.as_deref()));
        }
    }
}

impl RecordProcessor for Recorder {
    fn initialize(&mut self, input: &InitializationInput) {
        self.calls.push(Call::Initialize(input.shard_id().to_owned()));
    }

    fn process_records(&mut self, input: &ProcessRecordsInput, checkpointer: &mut dyn Checkpointer) {
        self.calls.push(Call::ProcessRecords(input.records().to_vec()));
        Self::issue(&self.on_records, checkpointer, &mut self.outcomes);
    }

    fn lease_lost(&mut self) {
        self.calls.push(Call::LeaseLost);
    }

    fn shard_ended(&mut self, checkpointer: &mut dyn Checkpointer) {
        self.calls.push(Call::ShardEnded);
        Self::issue(&self.on_shard_end, checkpointer, &mut self.outcomes);
    }

    fn shutdown_requested(
        &mut self,
        input: &ShutdownRequestedInput,
        checkpointer: &mut dyn Checkpointer,
    ) {
        self.calls.push(Call::ShutdownRequested(
            input.sequence_number().map(str::to_owned),
        ));
        Self::issue(&self.on_shutdown, checkpointer, &mut self.outcomes);
    }
}

/// Joins frames into newline-terminated daemon input.
pub(crate) fn lines(frames: &[&str]) -> String {
    frames.iter().fold(String::new(), |mut input, frame| {
        input.push_str(frame);
        input.push('\n');
        input
    })
}

/// Runs one session over `input` and returns the result and everything the
/// engine wrote.
pub(crate) fn run_session(
    recorder: &mut Recorder,
    input: &str,
) -> (Result<(), ProtocolError>, String) {
    let mut output = Vec::new();
    let result = Engine::new(recorder, input.as_bytes(), &mut output).run();
    let written = String::from_utf8(output).expect("engine output is utf-8");
    (result, written)
}

/// Renders the frames the engine is expected to write.
pub(crate) fn expected_output(frames: &[&str]) -> String {
    frames.iter().map(|frame| format!("\n{frame}\n")).collect()
}
