//! Batch Lifecycle Tests
//!
//! Creation, interposed reuse, discard, and close-time completion.

mod common;

use cobatch::prelude::*;
use common::counting_batcher;

// ============================================================================
// Non-transactional mode
// ============================================================================

#[test]
fn no_manager_batches_are_trivially_active() {
    common::init_tracing();
    let batcher = Batcher::non_transactional();
    let cx = batcher.context();

    let batch = batcher.create_batch(&cx).expect("create batch");
    assert_eq!(batch.state().unwrap(), BatchState::Active);

    // Close and discard never fail and never change observable state.
    batch.discard();
    batch.close().unwrap();
    batch.close().unwrap();
    assert_eq!(batch.state().unwrap(), BatchState::Active);
}

#[test]
fn no_manager_batches_are_all_the_same_singleton() {
    let batcher = Batcher::non_transactional();
    let cx = batcher.context();

    let first = batcher.create_batch(&cx).unwrap();
    let second = batcher.create_batch(&cx).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, first.interpose());
}

// ============================================================================
// Interposition
// ============================================================================

#[test]
fn nested_creates_share_one_transaction() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    // First acquisition begins the transaction; the second interposes.
    let outer = batcher.create_batch(&cx).expect("outer batch");
    let nested = batcher.create_batch(&cx).expect("nested batch");
    assert_eq!(outer, nested);
    assert_eq!(outer.txn(), nested.txn());

    // First close: pre-decrement count is 1, so no action yet.
    nested.close().unwrap();
    assert_eq!(rm.completions(), 0, "inner close must not complete");

    // Second close: pre-decrement count is 0, the outermost close.
    outer.close().unwrap();
    assert_eq!(rm.commits(), 1);
    assert_eq!(rm.rollbacks(), 0);
}

#[test]
fn n_nested_acquisitions_commit_exactly_once() {
    for n in 1..=6 {
        let (rm, batcher) = counting_batcher();
        let cx = batcher.context();

        let batches: Vec<_> = (0..n)
            .map(|_| batcher.create_batch(&cx).expect("create batch"))
            .collect();
        for batch in batches.iter().rev() {
            batch.close().unwrap();
        }

        assert_eq!(rm.commits(), 1, "n = {n}");
        assert_eq!(rm.rollbacks(), 0, "n = {n}");
    }
}

// ============================================================================
// Discard
// ============================================================================

#[test]
fn discard_forces_rollback_at_close() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let batch = batcher.create_batch(&cx).unwrap();
    batch.discard();

    // The transaction itself is untouched until close.
    assert_eq!(batch.state().unwrap(), BatchState::Discarded);
    assert_eq!(rm.completions(), 0);

    batch.close().unwrap();
    assert_eq!(rm.rollbacks(), 1);
    assert_eq!(rm.commits(), 0);
}

#[test]
fn discard_anywhere_in_the_nesting_wins() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let outer = batcher.create_batch(&cx).unwrap();
    let nested = batcher.create_batch(&cx).unwrap();

    nested.discard();
    nested.close().unwrap();
    outer.close().unwrap();

    assert_eq!(rm.rollbacks(), 1);
    assert_eq!(rm.commits(), 0);
}

#[test]
fn rollback_only_transaction_is_observed_as_discarded() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let batch = batcher.create_batch(&cx).unwrap();
    rm.raw().set_rollback_only(batch.txn().unwrap()).unwrap();

    assert_eq!(batch.state().unwrap(), BatchState::Discarded);
    batch.close().unwrap();
    assert_eq!(rm.rollbacks(), 1);
}

// ============================================================================
// Association lifecycle
// ============================================================================

#[test]
fn completion_clears_the_context_association() {
    let (_rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let batch = batcher.create_batch(&cx).unwrap();
    assert_eq!(cx.current_batch(), Some(batch.clone()));

    batch.close().unwrap();
    assert_eq!(cx.current_batch(), None);
}

#[test]
fn a_fresh_batch_follows_a_completed_one() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let first = batcher.create_batch(&cx).unwrap();
    first.close().unwrap();

    let second = batcher.create_batch(&cx).unwrap();
    assert_ne!(first, second);

    second.close().unwrap();
    assert_eq!(rm.commits(), 2);
}

#[test]
fn batch_state_is_closed_after_completion() {
    let (_rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let batch = batcher.create_batch(&cx).unwrap();
    batch.close().unwrap();

    assert_eq!(batch.state().unwrap(), BatchState::Closed);
    // Closing an already-completed batch takes no further action.
    batch.close().unwrap();
}

// ============================================================================
// Closure convenience
// ============================================================================

#[test]
fn with_batch_commits_on_success() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let value = batcher.with_batch(&cx, |batch| {
        assert_eq!(batch.state().unwrap(), BatchState::Active);
        Ok(42)
    });

    assert_eq!(value.unwrap(), 42);
    assert_eq!(rm.commits(), 1);
}

#[test]
fn with_batch_rolls_back_on_failure() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let result: Result<()> = batcher.with_batch(&cx, |_| {
        Err(Error::IllegalState("work refused".into()))
    });

    assert!(result.is_err());
    assert_eq!(rm.rollbacks(), 1);
    assert_eq!(rm.commits(), 0);
}

#[test]
fn with_batch_nests_inside_an_open_batch() {
    let (rm, batcher) = counting_batcher();
    let cx = batcher.context();

    let outer = batcher.create_batch(&cx).unwrap();
    batcher
        .with_batch(&cx, |nested| {
            assert_eq!(*nested, outer);
            Ok(())
        })
        .unwrap();

    // The nested scope closed its interposition level only.
    assert_eq!(rm.completions(), 0);
    outer.close().unwrap();
    assert_eq!(rm.commits(), 1);
}
