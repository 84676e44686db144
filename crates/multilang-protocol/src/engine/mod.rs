//! Session run loop, lifecycle dispatch, and the checkpoint handshake.
//!
//! [`Engine::run`] reads one frame at a time, hands each lifecycle event to
//! the [`RecordProcessor`], and acknowledges it with a status frame. A
//! checkpoint requested from inside a callback is a blocking exchange on the
//! same streams: the request is written and the very next inbound line is
//! read as its acknowledgement, never as a lifecycle event. The main loop
//! does not read again until the callback has returned, so the two read
//! paths cannot interleave.

use std::io::{self, BufRead, StdinLock, StdoutLock, Write};

use tracing::{Dispatch, debug, info, warn};

use crate::error::ProtocolError;
use crate::frame::Framer;
use crate::processor::{
    Checkpointer, InitializationInput, ProcessRecordsInput, RecordProcessor,
    ShutdownRequestedInput,
};
use crate::protocol::{ACTION_CHECKPOINT, Event, Frame, OutboundMessage};

/// Tracing target for engine operations.
const ENGINE_TARGET: &str = "multilang_protocol::engine";

/// Drives one shard session between the daemon and a record processor.
///
/// # Example
///
/// ```rust
/// use multilang_protocol::{
///     Checkpointer, Engine, InitializationInput, ProcessRecordsInput, RecordProcessor,
///     ShutdownRequestedInput,
/// };
///
/// struct Discard;
///
/// impl RecordProcessor for Discard {
///     fn initialize(&mut self, _input: &InitializationInput) {}
///     fn process_records(&mut self, _input: &ProcessRecordsInput, _cp: &mut dyn Checkpointer) {}
///     fn lease_lost(&mut self) {}
///     fn shard_ended(&mut self, _cp: &mut dyn Checkpointer) {}
///     fn shutdown_requested(&mut self, _input: &ShutdownRequestedInput, _cp: &mut dyn Checkpointer) {}
/// }
///
/// let input = b"{\"action\":\"shutdownRequested\"}\n";
/// let mut output = Vec::new();
/// Engine::new(Discard, &input[..], &mut output).run()?;
/// assert_eq!(output, b"\n{\"action\":\"status\",\"responseFor\":\"shutdownRequested\"}\n");
/// # Ok::<(), multilang_protocol::ProtocolError>(())
/// ```
pub struct Engine<P, R, W> {
    processor: P,
    framer: Framer<R, W>,
    session: SessionState,
    log_dispatch: Option<Dispatch>,
}

#[derive(Debug, Default)]
struct SessionState {
    shard_id: Option<String>,
    phase: Phase,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Running,
    Stopped,
}

impl<P> Engine<P, StdinLock<'static>, StdoutLock<'static>>
where
    P: RecordProcessor,
{
    /// Creates an engine bound to the process's standard input and output.
    ///
    /// Nothing else in the process may write protocol-shaped lines to stdout
    /// while the engine runs; send diagnostics to stderr or a file instead.
    #[must_use]
    pub fn stdio(processor: P) -> Self {
        Self::new(processor, io::stdin().lock(), io::stdout().lock())
    }
}

impl<P, R, W> Engine<P, R, W>
where
    P: RecordProcessor,
    R: BufRead,
    W: Write,
{
    /// Creates an engine over the given streams.
    #[must_use]
    pub fn new(processor: P, reader: R, writer: W) -> Self {
        Self {
            processor,
            framer: Framer::new(reader, writer),
            session: SessionState::default(),
            log_dispatch: None,
        }
    }

    /// Routes the engine's diagnostics to `dispatch` instead of the global
    /// subscriber.
    #[must_use]
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Runs the session until a terminal action has been acknowledged.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ProtocolError`]: a failed read or write, end
    /// of input before `shardEnded` or `shutdownRequested`, a malformed or
    /// unknown frame, or a desynchronised checkpoint exchange. Rejected
    /// checkpoints are reported to the callback and do not end the session.
    pub fn run(mut self) -> Result<(), ProtocolError> {
        match self.log_dispatch.take() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || self.run_loop()),
            None => self.run_loop(),
        }
    }

    fn run_loop(&mut self) -> Result<(), ProtocolError> {
        while self.session.phase == Phase::Running {
            let event = match self.framer.read_frame().and_then(Frame::into_event) {
                Ok(event) => event,
                Err(error) => return Err(self.abort(error)),
            };
            let action = event.action();
            let terminal = event.is_terminal();

            if let Err(error) = self.dispatch(event) {
                return Err(self.abort(error));
            }
            self.framer
                .write_message(&OutboundMessage::status(action))
                .map_err(|error| self.abort(error))?;

            if terminal {
                self.session.phase = Phase::Stopped;
            }
        }

        info!(
            target: ENGINE_TARGET,
            shard_id = self.shard_id(),
            "session finished"
        );
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ProtocolError> {
        debug!(
            target: ENGINE_TARGET,
            shard_id = self.shard_id(),
            action = event.action(),
            "dispatching event"
        );

        match event {
            Event::Initialize { shard_id } => {
                info!(target: ENGINE_TARGET, shard_id = %shard_id, "initialising record processor");
                let input = InitializationInput::new(shard_id.as_str());
                self.session.shard_id = Some(shard_id);
                self.processor.initialize(&input);
                Ok(())
            }
            Event::ProcessRecords { records } => {
                debug!(
                    target: ENGINE_TARGET,
                    shard_id = self.shard_id(),
                    record_count = records.len(),
                    "delivering records"
                );
                let input = ProcessRecordsInput::new(records);
                let mut handshake =
                    Handshake::new(&mut self.framer, self.session.shard_id.as_deref());
                self.processor.process_records(&input, &mut handshake);
                handshake.finish()
            }
            Event::LeaseLost => {
                info!(target: ENGINE_TARGET, shard_id = self.shard_id(), "lease lost");
                self.processor.lease_lost();
                Ok(())
            }
            Event::ShardEnded => {
                info!(target: ENGINE_TARGET, shard_id = self.shard_id(), "shard ended");
                let mut handshake =
                    Handshake::new(&mut self.framer, self.session.shard_id.as_deref());
                self.processor.shard_ended(&mut handshake);
                handshake.finish()
            }
            Event::ShutdownRequested { checkpoint } => {
                info!(
                    target: ENGINE_TARGET,
                    shard_id = self.shard_id(),
                    last_checkpoint = ?checkpoint,
                    "shutdown requested"
                );
                let input = ShutdownRequestedInput::new(checkpoint);
                let mut handshake =
                    Handshake::new(&mut self.framer, self.session.shard_id.as_deref());
                self.processor.shutdown_requested(&input, &mut handshake);
                handshake.finish()
            }
        }
    }

    fn abort(&mut self, error: ProtocolError) -> ProtocolError {
        self.session.phase = Phase::Stopped;
        warn!(
            target: ENGINE_TARGET,
            shard_id = self.shard_id(),
            %error,
            "session aborted"
        );
        error
    }

    fn shard_id(&self) -> &str {
        self.session.shard_id.as_deref().unwrap_or_default()
    }
}

/// The [`Checkpointer`] handed to a single callback invocation.
///
/// A fatal failure is remembered: later requests in the same callback fail
/// with the same error without touching the stream, and [`Handshake::finish`]
/// hands it back to the run loop even if the callback discarded it.
struct Handshake<'a, R, W> {
    framer: &'a mut Framer<R, W>,
    shard_id: Option<&'a str>,
    fatal: Option<ProtocolError>,
}

impl<'a, R: BufRead, W: Write> Handshake<'a, R, W> {
    const fn new(framer: &'a mut Framer<R, W>, shard_id: Option<&'a str>) -> Self {
        Self {
            framer,
            shard_id,
            fatal: None,
        }
    }

    fn finish(self) -> Result<(), ProtocolError> {
        self.fatal.map_or(Ok(()), Err)
    }

    fn exchange(&mut self, sequence_number: Option<&str>) -> Result<(), ProtocolError> {
        debug!(
            target: ENGINE_TARGET,
            shard_id = self.shard_id.unwrap_or_default(),
            sequence_number = ?sequence_number,
            "requesting checkpoint"
        );
        self.framer
            .write_message(&OutboundMessage::checkpoint(sequence_number))?;

        let ack = self.framer.read_frame()?.into_acknowledgement()?;
        if let Some(message) = ack.error() {
            warn!(
                target: ENGINE_TARGET,
                shard_id = self.shard_id.unwrap_or_default(),
                sequence_number = ?sequence_number,
                error = message,
                "checkpoint rejected by daemon"
            );
            return Err(ProtocolError::CheckpointRejected {
                sequence_number: sequence_number.map(str::to_owned),
                message: message.to_owned(),
            });
        }
        if ack.action() != ACTION_CHECKPOINT {
            return Err(ProtocolError::ProtocolDesync {
                expected: ACTION_CHECKPOINT,
                actual: ack.action().to_owned(),
            });
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Checkpointer for Handshake<'_, R, W> {
    fn checkpoint(&mut self, sequence_number: Option<&str>) -> Result<(), ProtocolError> {
        if let Some(error) = &self.fatal {
            return Err(error.clone());
        }

        let result = self.exchange(sequence_number);
        if let Err(error) = &result
            && error.is_fatal()
        {
            self.fatal = Some(error.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests;
