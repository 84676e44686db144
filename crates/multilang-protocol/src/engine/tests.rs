//! Unit tests for the session run loop and checkpoint handshake.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::rstest;
use tracing::span;
use tracing::{Metadata, Subscriber};

use super::*;
use crate::protocol::Record;
use crate::tests::{Call, Recorder, expected_output, lines, run_session};

const INITIALIZE: &str = r#"{"action": "initialize", "shardId": "someShardID"}"#;
const SHUTDOWN: &str = r#"{"action": "shutdownRequested"}"#;
const SHARD_ENDED: &str = r#"{"action": "shardEnded"}"#;
const ACK: &str = r#"{"action": "checkpoint"}"#;

const STATUS_INITIALIZE: &str = r#"{"action":"status","responseFor":"initialize"}"#;
const STATUS_RECORDS: &str = r#"{"action":"status","responseFor":"processRecords"}"#;
const STATUS_LEASE_LOST: &str = r#"{"action":"status","responseFor":"leaseLost"}"#;
const STATUS_SHARD_ENDED: &str = r#"{"action":"status","responseFor":"shardEnded"}"#;
const STATUS_SHUTDOWN: &str = r#"{"action":"status","responseFor":"shutdownRequested"}"#;

fn records_frame(sequence_numbers: &[&str]) -> String {
    let records: Vec<String> = sequence_numbers
        .iter()
        .map(|sequence| {
            format!(
                r#"{{"data": "dGVzdERhdGE=", "partitionKey": "somePartitionKey", "sequenceNumber": "{sequence}"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"action": "processRecords", "records": [{}]}}"#,
        records.join(",")
    )
}

// ---------------------------------------------------------------------------
// Dispatch and status acknowledgements
// ---------------------------------------------------------------------------

#[test]
fn initialize_passes_shard_id_and_acknowledges() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(&mut recorder, &lines(&[INITIALIZE, SHUTDOWN]));

    result.expect("session succeeds");
    assert_eq!(output, expected_output(&[STATUS_INITIALIZE, STATUS_SHUTDOWN]));
    assert_eq!(
        recorder.calls,
        vec![
            Call::Initialize(String::from("someShardID")),
            Call::ShutdownRequested(None),
        ]
    );
}

#[test]
fn process_records_delivers_decoded_records_in_order() {
    let mut recorder = Recorder::default();
    let frame = records_frame(&["1", "2", "3"]);
    let (result, output) = run_session(&mut recorder, &lines(&[&frame, SHUTDOWN]));

    result.expect("session succeeds");
    assert_eq!(output, expected_output(&[STATUS_RECORDS, STATUS_SHUTDOWN]));

    let Some(Call::ProcessRecords(records)) = recorder.calls.first() else {
        panic!("expected processRecords first, got {:?}", recorder.calls);
    };
    let expected: Vec<Record> = ["1", "2", "3"]
        .into_iter()
        .map(|sequence| Record::new(b"testData".to_vec(), "somePartitionKey", sequence))
        .collect();
    assert_eq!(records, &expected);
}

#[test]
fn lease_lost_is_acknowledged_and_session_continues() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(
        &mut recorder,
        &lines(&[r#"{"action": "leaseLost"}"#, SHUTDOWN]),
    );

    result.expect("session succeeds");
    assert_eq!(output, expected_output(&[STATUS_LEASE_LOST, STATUS_SHUTDOWN]));
    assert_eq!(
        recorder.calls,
        vec![Call::LeaseLost, Call::ShutdownRequested(None)]
    );
}

#[rstest]
#[case::shard_ended(SHARD_ENDED, STATUS_SHARD_ENDED, Call::ShardEnded)]
#[case::shutdown(
    r#"{"action": "shutdownRequested", "checkpoint": "49"}"#,
    STATUS_SHUTDOWN,
    Call::ShutdownRequested(Some(String::from("49")))
)]
fn terminal_actions_stop_without_reading_further(
    #[case] terminal: &str,
    #[case] status: &str,
    #[case] call: Call,
) {
    let mut recorder = Recorder::default();
    // The trailing line is not valid JSON: reading it would fail the session.
    let (result, output) = run_session(&mut recorder, &lines(&[terminal, "garbage"]));

    result.expect("session stops cleanly");
    assert_eq!(output, expected_output(&[status]));
    assert_eq!(recorder.calls, vec![call]);
}

#[test]
fn unknown_action_fails_without_acknowledging() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(
        &mut recorder,
        &lines(&[r#"{"action": "bogus"}"#, SHUTDOWN]),
    );

    let error = result.expect_err("unknown action is fatal");
    assert!(
        matches!(&error, ProtocolError::UnknownAction { action } if action == "bogus"),
        "{error:?}"
    );
    assert!(output.is_empty(), "unexpected output: {output:?}");
    assert!(recorder.calls.is_empty());
}

#[test]
fn end_of_input_before_terminal_action_is_fatal() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(&mut recorder, &lines(&[INITIALIZE]));

    let error = result.expect_err("eof is fatal");
    assert!(
        matches!(error, ProtocolError::EndOfStream { .. }),
        "{error:?}"
    );
    assert_eq!(output, expected_output(&[STATUS_INITIALIZE]));
}

#[test]
fn malformed_frame_aborts_without_status() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(&mut recorder, &lines(&["{\"action\": \"initialize\"}"]));

    let error = result.expect_err("missing shard id");
    assert!(matches!(error, ProtocolError::Decode { .. }), "{error:?}");
    assert!(output.is_empty());
}

#[test]
fn non_utf8_frame_is_a_decode_error() {
    let mut recorder = Recorder::default();
    let input = b"{\"action\":\"leaseLost\",\"x\":\"\xff\"}\n{\"action\":\"shutdownRequested\"}\n";
    let mut output = Vec::new();
    let result = Engine::new(&mut recorder, &input[..], &mut output).run();

    let error = result.expect_err("invalid utf-8 is fatal");
    assert!(matches!(error, ProtocolError::Decode { .. }), "{error:?}");
    assert!(output.is_empty());
    assert!(recorder.calls.is_empty());
}

#[test]
fn unsolicited_acknowledgement_is_an_unknown_action() {
    let mut recorder = Recorder::default();
    let (result, output) = run_session(&mut recorder, &lines(&[ACK, SHUTDOWN]));

    let error = result.expect_err("ack outside a handshake");
    assert!(
        matches!(&error, ProtocolError::UnknownAction { action } if action == "checkpoint"),
        "{error:?}"
    );
    assert!(output.is_empty(), "unexpected output: {output:?}");
    assert!(recorder.calls.is_empty());
}

// ---------------------------------------------------------------------------
// Checkpoint handshake
// ---------------------------------------------------------------------------

#[test]
fn checkpoint_round_trip_precedes_status() {
    let mut recorder = Recorder {
        on_records: vec![Some(String::from("2"))],
        ..Recorder::default()
    };
    let frame = records_frame(&["1", "2"]);
    let (result, output) = run_session(&mut recorder, &lines(&[&frame, ACK, SHUTDOWN]));

    result.expect("session succeeds");
    assert_eq!(
        output,
        expected_output(&[
            r#"{"action":"checkpoint","sequenceNumber":"2"}"#,
            STATUS_RECORDS,
            STATUS_SHUTDOWN,
        ])
    );
    assert_eq!(recorder.outcomes.len(), 1);
    assert!(recorder.outcomes.iter().all(Result::is_ok));
}

#[test]
fn shard_end_checkpoints_with_null_sentinel() {
    let mut recorder = Recorder {
        on_shard_end: vec![None],
        ..Recorder::default()
    };
    let (result, output) = run_session(&mut recorder, &lines(&[SHARD_ENDED, ACK]));

    result.expect("session succeeds");
    assert_eq!(
        output,
        expected_output(&[
            r#"{"action":"checkpoint","sequenceNumber":null}"#,
            STATUS_SHARD_ENDED,
        ])
    );
}

#[test]
fn rejected_checkpoint_is_returned_to_the_callback() {
    let mut recorder = Recorder {
        on_records: vec![Some(String::from("1"))],
        ..Recorder::default()
    };
    let frame = records_frame(&["1"]);
    let rejection = r#"{"action": "checkpoint", "error": "ThrottlingException"}"#;
    let (result, output) = run_session(&mut recorder, &lines(&[&frame, rejection, SHUTDOWN]));

    result.expect("rejection is not fatal");
    assert_eq!(
        output,
        expected_output(&[
            r#"{"action":"checkpoint","sequenceNumber":"1"}"#,
            STATUS_RECORDS,
            STATUS_SHUTDOWN,
        ])
    );
    let [Err(ProtocolError::CheckpointRejected { sequence_number, message })] =
        recorder.outcomes.as_slice()
    else {
        panic!("expected one rejection, got {:?}", recorder.outcomes);
    };
    assert_eq!(sequence_number.as_deref(), Some("1"));
    assert_eq!(message, "ThrottlingException");
}

#[test]
fn error_takes_precedence_over_mismatched_action() {
    let mut recorder = Recorder {
        on_records: vec![Some(String::from("1"))],
        ..Recorder::default()
    };
    let frame = records_frame(&["1"]);
    let reply = r#"{"action": "status", "error": "boom"}"#;
    let (result, _) = run_session(&mut recorder, &lines(&[&frame, reply, SHUTDOWN]));

    result.expect("rejection is not fatal");
    assert!(
        matches!(
            recorder.outcomes.as_slice(),
            [Err(ProtocolError::CheckpointRejected { .. })]
        ),
        "{:?}",
        recorder.outcomes
    );
}

#[test]
fn desync_is_fatal_even_when_the_callback_ignores_it() {
    let mut recorder = Recorder {
        on_records: vec![Some(String::from("1")), Some(String::from("2"))],
        ..Recorder::default()
    };
    let frame = records_frame(&["1", "2"]);
    let (result, output) = run_session(
        &mut recorder,
        &lines(&[&frame, r#"{"action": "leaseLost"}"#, ACK, SHUTDOWN]),
    );

    let error = result.expect_err("desync aborts the session");
    assert!(
        matches!(&error, ProtocolError::ProtocolDesync { actual, .. } if actual == "leaseLost"),
        "{error:?}"
    );
    // Only the first request reaches the stream and no status follows it.
    assert_eq!(
        output,
        expected_output(&[r#"{"action":"checkpoint","sequenceNumber":"1"}"#])
    );
    assert_eq!(recorder.outcomes.len(), 2);
    assert!(
        recorder
            .outcomes
            .iter()
            .all(|outcome| matches!(outcome, Err(ProtocolError::ProtocolDesync { .. }))),
        "{:?}",
        recorder.outcomes
    );
}

#[test]
fn end_of_input_during_handshake_is_fatal() {
    let mut recorder = Recorder {
        on_shutdown: vec![Some(String::from("7"))],
        ..Recorder::default()
    };
    let (result, _) = run_session(&mut recorder, &lines(&[SHUTDOWN]));

    let error = result.expect_err("no acknowledgement");
    assert!(
        matches!(error, ProtocolError::EndOfStream { .. }),
        "{error:?}"
    );
}

// ---------------------------------------------------------------------------
// Injected log sink
// ---------------------------------------------------------------------------

struct CountingSubscriber {
    events: Arc<AtomicUsize>,
}

impl Subscriber for CountingSubscriber {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, _event: &tracing::Event<'_>) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

#[test]
fn diagnostics_go_to_the_injected_dispatch() {
    let events = Arc::new(AtomicUsize::new(0));
    let dispatch = Dispatch::new(CountingSubscriber {
        events: Arc::clone(&events),
    });

    let mut recorder = Recorder::default();
    let input = lines(&[INITIALIZE, SHUTDOWN]);
    let mut output = Vec::new();
    Engine::new(&mut recorder, input.as_bytes(), &mut output)
        .with_log_dispatch(dispatch)
        .run()
        .expect("session succeeds");

    assert!(
        events.load(Ordering::SeqCst) > 0,
        "expected engine events on the injected dispatch"
    );
}
