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

//! Tests for round-trip dispatch through `SyncProxy`.

use emissary::prelude::*;
use emissary_test::prelude::*;

use crate::setup::{initialize_tracing, targets::counter::Counter};

mod setup;

/// A call delivers the operation's own return value to the caller.
#[emissary_test]
async fn a_call_returns_the_operations_value() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let total = handle
        .as_sync()
        .call(Selector::new("add_and_report", 1), |counter| {
            counter.add(5);
            counter.total()
        })
        .await?;
    assert_eq!(total, 5);

    runtime.shutdown_all().await
}

/// Calls take the same mailbox as casts, so a call observes every cast
/// that was enqueued before it.
#[emissary_test]
async fn a_call_serializes_behind_earlier_casts() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());
    let actor = handle.as_actor();

    for _ in 0..3 {
        actor.cast(Selector::new("add", 1), |counter| counter.add(1))?;
    }
    let total = handle
        .as_sync()
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(total, 3, "the call ran before its predecessors finished");

    runtime.shutdown_all().await
}

/// `call_blocking` serves callers that live outside any async runtime.
///
/// **Scenario:**
/// 1. Wrap a counter and hand a `SyncProxy` to a plain OS thread.
/// 2. The thread dispatches with `call_blocking` and parks until the
///    result arrives.
///
/// **Verification:**
/// - The thread observes the operation's return value, proving the
///   round trip works with no runtime on the calling side.
#[emissary_test]
async fn call_blocking_works_from_a_plain_thread() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());
    let sync = handle.as_sync();

    let caller = std::thread::spawn(move || {
        sync.call_blocking(Selector::new("add_and_report", 1), |counter| {
            counter.add(7);
            counter.total()
        })
    });
    let total = caller.join().expect("calling thread panicked")?;
    assert_eq!(total, 7);

    runtime.shutdown_all().await
}

/// A call to a retired target fails with `TargetGone` instead of
/// hanging forever.
#[emissary_test]
async fn a_call_to_a_retired_target_reports_gone() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());
    let sync = handle.as_sync();

    handle.retire().await?;

    let outcome = sync
        .call(Selector::new("total", 0), |counter| counter.total())
        .await;
    assert_eq!(outcome, Err(DispatchError::TargetGone));
    Ok(())
}

/// Clones of a proxy address the same target.
#[emissary_test]
async fn proxy_clones_share_the_target() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = Emissary::launch();
    let handle = runtime.wrap_named(Counter::default(), "counter".to_string());

    let first = handle.as_sync();
    let second = first.clone();
    first
        .call(Selector::new("add", 1), |counter| counter.add(2))
        .await?;
    let total = second
        .call(Selector::new("total", 0), |counter| counter.total())
        .await?;
    assert_eq!(total, 2);
    assert_eq!(first.target_name(), second.target_name());

    runtime.shutdown_all().await
}
