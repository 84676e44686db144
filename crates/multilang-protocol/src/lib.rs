//! Record-processor side of the multilang daemon protocol.
//!
//! A supervising daemon owns shard leases, checkpoint storage, and retries
//! against the upstream stream. It drives a record-processing host over a
//! pair of byte streams (normally the host's stdin and stdout) using one JSON
//! object per line. This crate implements the host half of that conversation:
//!
//! - [`frame`]: reads `\n`-terminated frames and writes `\n<payload>\n` frames.
//! - [`protocol`]: the wire types and their JSON shapes.
//! - [`engine`]: the run loop that dispatches each lifecycle event to a
//!   [`RecordProcessor`] and acknowledges it with a status frame, plus the
//!   blocking checkpoint handshake offered to callbacks via [`Checkpointer`].
//!
//! # Example
//!
//! ```rust,no_run
//! use multilang_protocol::{
//!     Checkpointer, Engine, InitializationInput, ProcessRecordsInput, RecordProcessor,
//!     ShutdownRequestedInput,
//! };
//!
//! struct Printer;
//!
//! impl RecordProcessor for Printer {
//!     fn initialize(&mut self, _input: &InitializationInput) {}
//!
//!     fn process_records(&mut self, input: &ProcessRecordsInput, checkpointer: &mut dyn Checkpointer) {
//!         if let Some(last) = input.records().last() {
//!             drop(checkpointer.checkpoint(Some(last.sequence_number())));
//!         }
//!     }
//!
//!     fn lease_lost(&mut self) {}
//!
//!     fn shard_ended(&mut self, checkpointer: &mut dyn Checkpointer) {
//!         drop(checkpointer.checkpoint(None));
//!     }
//!
//!     fn shutdown_requested(&mut self, _input: &ShutdownRequestedInput, _cp: &mut dyn Checkpointer) {}
//! }
//!
//! Engine::stdio(Printer).run().expect("session completes");
//! ```

pub mod engine;
pub mod error;
pub mod frame;
pub mod processor;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use self::engine::Engine;
pub use self::error::ProtocolError;
pub use self::frame::Framer;
pub use self::processor::{
    Checkpointer, InitializationInput, ProcessRecordsInput, RecordProcessor,
    ShutdownRequestedInput,
};
pub use self::protocol::{CheckpointAck, Event, Frame, OutboundMessage, Record};
