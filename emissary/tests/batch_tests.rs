/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![allow(dead_code, unused_doc_comments)]

//! Tests for staged dispatch through `BatchProxy`.

use emissary::prelude::*;
use emissary_test::prelude::*;

use crate::setup::{initialize_tracing, targets::counter::Counter, targets::journal::Journal};

mod setup;

/// Staged operations stay local until commit.
///
/// **Scenario:**
/// 1. Stage one operation; confirm its slot reports `NotReady`.
/// 2. Round-trip a read and confirm the target is untouched.
/// 3. Commit and read again.
///
/// **Verification:**
/// - Before commit the target never sees the staged work; after commit
///   the slot holds the result and the state change is visible.
#[emissary_test]
async fn staged_operations_do_not_run_until_commit() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let mut batch = handle.new_batch();
    let mut slot = batch.stage(Selector::new("add", 1), |counter| counter.add(5))?;
    assert!(batch.is_open());
    assert_eq!(batch.len(), 1);
    assert_eq!(slot.try_result(), Err(DispatchError::NotReady));

    let before = handle
        .as_sync()
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(before, 0, "staged work must not have touched the target");

    let receipt = batch.commit().await?;
    assert_eq!(receipt.committed(), 1);
    assert!(receipt.is_clean());
    assert_eq!(slot.try_result(), Ok(()));

    let after = handle
        .as_sync()
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(after, 5);

    runtime.shutdown_all().await
}

/// A staged slot can also be awaited like any other future.
#[emissary_test]
async fn staged_slots_fill_with_values_at_commit() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let mut batch = handle.new_batch();
    let slot = batch.stage(Selector::new("add_and_report", 1), |counter| {
        counter.add(9);
        counter.total()
    })?;
    let receipt = batch.commit().await?;
    assert_eq!(receipt.committed(), 1);

    let value = slot.await?;
    assert_eq!(value, 9);

    runtime.shutdown_all().await
}

/// Committing an empty proxy is a no-op: nothing reaches the mailbox
/// and the worker is never even spawned.
#[emissary_test]
async fn an_empty_commit_touches_nothing() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let mut batch = handle.new_batch();
    let receipt = batch.commit().await?;
    assert_eq!(receipt.committed(), 0);
    assert!(receipt.is_clean());
    assert_eq!(
        handle.phase(),
        MailboxPhase::Idle,
        "no worker should have spawned for an empty commit"
    );
    assert_eq!(handle.depth(), 0);
    Ok(())
}

/// Discard throws the staged block away; nothing ever executes.
#[emissary_test]
async fn discard_throws_the_staged_block_away() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let mut batch = handle.new_batch();
    let mut slot = batch.stage(Selector::new("add", 1), |counter| counter.add(10))?;
    let _ = batch.stage(Selector::new("add", 1), |counter| counter.add(20))?;
    assert_eq!(batch.discard(), 2);
    assert!(!batch.is_open());
    assert!(batch.is_empty());

    assert_eq!(slot.try_result(), Err(DispatchError::TargetGone));

    let receipt = batch.commit().await?;
    assert_eq!(receipt.committed(), 0, "discard left nothing to commit");

    let total = handle
        .as_sync()
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(total, 0);

    runtime.shutdown_all().await
}

/// A proxy is reusable: each commit closes one block and the next stage
/// opens a fresh one.
#[emissary_test]
async fn a_proxy_stages_fresh_blocks_after_commit() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let mut batch = handle.new_batch();
    batch.stage(Selector::new("add", 1), |counter| counter.add(1))?;
    let first = batch.commit().await?;
    assert_eq!(first.committed(), 1);
    assert!(!batch.is_open());

    batch.stage(Selector::new("add", 1), |counter| counter.add(2))?;
    batch.stage(Selector::new("add", 1), |counter| counter.add(3))?;
    let second = batch.commit().await?;
    assert_eq!(second.committed(), 2);

    let total = handle
        .as_sync()
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(total, 6);

    runtime.shutdown_all().await
}

/// A committed block occupies one contiguous run of the mailbox even
/// while another sender keeps casting.
///
/// **Scenario:**
/// 1. One task stages 50 journal entries and commits them.
/// 2. A second task concurrently casts 50 entries one at a time,
///    yielding between casts to maximize interleaving pressure.
///
/// **Verification:**
/// - All 100 entries execute.
/// - The 50 batched entries sit at consecutive positions, in staging
///   order; the singles land before or after the block, never inside.
#[emissary_test]
async fn a_committed_block_is_contiguous_under_concurrent_casts() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Journal::default(), "journal".to_string());

    let batcher = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let mut batch = handle.new_batch();
            for i in 0..50 {
                batch
                    .stage(Selector::new("record", 1), move |journal| {
                        journal.record(format!("batch-{i}"));
                    })
                    .expect("stage failed");
            }
            batch.commit().await.expect("commit failed")
        })
    };
    let caster = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let actor = handle.as_actor();
            for i in 0..50 {
                actor
                    .cast(Selector::new("record", 1), move |journal| {
                        journal.record(format!("single-{i}"));
                    })
                    .expect("cast failed");
                tokio::task::yield_now().await;
            }
        })
    };
    let receipt = batcher.await?;
    caster.await?;
    assert_eq!(receipt.committed(), 50);
    assert!(receipt.is_clean());

    let entries = handle
        .as_sync()
        .call(Selector::new("snapshot", 0), |journal| journal.snapshot())
        .await?;
    assert_eq!(entries.len(), 100);

    let positions: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("batch-"))
        .map(|(at, _)| at)
        .collect();
    assert_eq!(positions.len(), 50);
    let first = positions[0];
    for (offset, at) in positions.iter().enumerate() {
        assert_eq!(*at, first + offset, "a single slipped inside the block");
    }
    for (i, at) in positions.iter().enumerate() {
        assert_eq!(entries[*at], format!("batch-{i}"), "staging order broke");
    }

    runtime.shutdown_all().await
}

/// Two proxies are independent buffers; each commit lands as its own
/// contiguous block.
#[emissary_test]
async fn independent_proxies_commit_separate_blocks() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Journal::default(), "journal".to_string());

    let mut left = handle.new_batch();
    let mut right = handle.new_batch();
    left.stage(Selector::new("record", 1), |journal| {
        journal.record("left-0".to_string());
    })?;
    right.stage(Selector::new("record", 1), |journal| {
        journal.record("right-0".to_string());
    })?;
    left.stage(Selector::new("record", 1), |journal| {
        journal.record("left-1".to_string());
    })?;
    right.stage(Selector::new("record", 1), |journal| {
        journal.record("right-1".to_string());
    })?;

    let first = left.commit().await?;
    let second = right.commit().await?;
    assert_eq!(first.committed(), 2);
    assert_eq!(second.committed(), 2);

    let entries = handle
        .as_sync()
        .call(Selector::new("snapshot", 0), |journal| journal.snapshot())
        .await?;
    assert_eq!(entries, vec!["left-0", "left-1", "right-0", "right-1"]);

    runtime.shutdown_all().await
}
