//! Unit tests for the in-memory substrate and side channel.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rstest::rstest;

use crate::error::{ReduceError, SubstrateError};

use super::{Emitter, InMemorySubstrate, SideChannel, Substrate, TaskCounters, counter};

fn substrate(attempts: usize) -> InMemorySubstrate {
    InMemorySubstrate::new(NonZeroUsize::new(attempts).expect("attempts are non-zero"))
}

fn modulo_mapper(value: &u32, emitter: &mut Emitter<u32, u32>) {
    emitter.emit(value % 3, *value);
}

#[test]
fn groups_by_key_preserving_input_order() {
    let input: Vec<u32> = (0..12).rev().collect();
    let output = substrate(1)
        .map_reduce("group", &input, modulo_mapper, |key, records, counters| {
            counters.increment("records", records.len() as u64);
            Ok(vec![(*key, records.to_vec())])
        })
        .expect("stage must succeed");

    assert_eq!(output.groups, 3);
    assert_eq!(
        output.records,
        vec![
            (0, vec![9, 6, 3, 0]),
            (1, vec![10, 7, 4, 1]),
            (2, vec![11, 8, 5, 2]),
        ]
    );
    assert_eq!(output.counters.get("records"), 12);
}

#[test]
fn empty_input_yields_no_groups() {
    let input: Vec<u32> = Vec::new();
    let output = substrate(1)
        .map_reduce("empty", &input, modulo_mapper, |_, records, _| {
            Ok(records.to_vec())
        })
        .expect("stage must succeed");
    assert_eq!(output.groups, 0);
    assert!(output.records.is_empty());
    assert!(output.counters.snapshot().is_empty());
}

#[test]
fn retries_transient_failures_without_double_counting() {
    let input: Vec<u32> = (0..6).collect();
    let failures = AtomicUsize::new(0);
    let output = substrate(3)
        .map_reduce("flaky", &input, modulo_mapper, |key, records, counters| {
            counters.increment(counter::ACCEPTED_EDGES, records.len() as u64);
            if *key == 1 && failures.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(ReduceError::Task {
                    reason: Arc::from("injected"),
                });
            }
            Ok(records.to_vec())
        })
        .expect("third attempt must succeed");

    assert_eq!(failures.load(Ordering::SeqCst), 3);
    assert_eq!(output.counters.get(counter::ACCEPTED_EDGES), 6);
    assert_eq!(output.records, vec![0, 3, 1, 4, 2, 5]);
}

#[test]
fn exhausted_retries_report_stage_and_key() {
    let input: Vec<u32> = (0..3).collect();
    let err = substrate(2)
        .map_reduce("doomed", &input, modulo_mapper, |key, records, _| {
            if *key == 2 {
                return Err(ReduceError::Task {
                    reason: Arc::from("always"),
                });
            }
            Ok(records.to_vec())
        })
        .expect_err("stage must fail");

    match err {
        SubstrateError::RetriesExhausted {
            stage,
            key,
            attempts,
            ..
        } => {
            assert_eq!(stage, "doomed");
            assert_eq!(&*key, "2");
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case::invariant(ReduceError::InvariantViolation { invariant: "test" })]
#[case::broadcast(ReduceError::MissingBroadcast { round: 1, channel: "test" })]
fn permanent_failures_are_not_retried(#[case] failure: ReduceError) {
    let calls = AtomicUsize::new(0);
    let input = vec![1_u32];
    let err = substrate(5)
        .map_reduce("fatal", &input, modulo_mapper, |_, _, _: &mut TaskCounters| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Vec<u32>, _>(failure.clone())
        })
        .expect_err("stage must fail");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, SubstrateError::Fatal { .. }));
    assert_eq!(err.reduce_error(), &failure);
}

#[test]
fn side_channel_reports_missing_rounds() {
    let channel = SideChannel::new("matched_vertices");
    channel.publish(1, vec![1, 2]);
    assert_eq!(*channel.fetch(1).expect("round 1 is published"), vec![1, 2]);
    let err = channel.fetch(2).expect_err("round 2 was never published");
    assert_eq!(
        err,
        ReduceError::MissingBroadcast {
            round: 2,
            channel: "matched_vertices"
        }
    );
    channel.retire(1);
    assert!(channel.fetch(1).is_err());
}
