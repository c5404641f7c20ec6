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

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

use static_assertions::assert_impl_all;
use tokio::sync::oneshot;
use tracing::trace;

use crate::common::Thunk;
use crate::message::{DispatchError, FaultReport, Pending, Selector};
use crate::proxy::BatchLedger;

/// A reified invocation against a target of type `T`.
///
/// The thunk owns the captured arguments and, for result-bearing
/// operations, the sending half of a one-shot reply channel. The channel is
/// both the result slot and the completion signal: it can be written at
/// most once, and writing it wakes the waiter. Result and error are
/// therefore mutually exclusive by construction.
///
/// A message is created by a proxy, owned by the mailbox queue, and
/// consumed by the target's worker. The waiter holds only the receiving
/// half of the reply channel, as a [`Pending`].
pub struct Message<T> {
    selector: Selector,
    thunk: Option<Thunk<T>>,
    expects_reply: bool,
    ledger: Option<Arc<BatchLedger>>,
    created_at: SystemTime,
}

/// What happened when a message ran, as seen by the worker loop.
#[derive(Debug)]
pub(crate) enum ExecOutcome {
    /// The operation returned normally.
    Completed,
    /// The operation panicked. `observed` records whether the report was
    /// delivered to a live waiter; unobserved faults are the worker's to
    /// surface.
    Faulted { report: FaultReport, observed: bool },
}

assert_impl_all!(Message<()>: Send);

impl<T> Message<T> {
    /// Reifies a fire-and-forget operation.
    ///
    /// The operation's return value is unit; there is nothing for a caller
    /// to observe, so no reply channel is allocated.
    pub fn unit<F>(selector: Selector, op: F) -> Self
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let fault_selector = selector.clone();
        let thunk: Thunk<T> = Box::new(move |target| {
            match catch_unwind(AssertUnwindSafe(|| op(target))) {
                Ok(()) => ExecOutcome::Completed,
                Err(payload) => ExecOutcome::Faulted {
                    report: FaultReport::new(fault_selector, panic_detail(payload.as_ref())),
                    observed: false,
                },
            }
        });
        Self {
            selector,
            thunk: Some(thunk),
            expects_reply: false,
            ledger: None,
            created_at: SystemTime::now(),
        }
    }

    /// Reifies a result-bearing operation.
    ///
    /// Returns the message together with the caller-owned [`Pending`]
    /// placeholder that will resolve once the worker has executed the
    /// message. A panic inside the operation resolves the placeholder with
    /// [`DispatchError::Faulted`].
    pub fn returning<F, R>(selector: Selector, op: F) -> (Self, Pending<R>)
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, slot) = oneshot::channel();
        let fault_selector = selector.clone();
        let thunk: Thunk<T> = Box::new(move |target| {
            match catch_unwind(AssertUnwindSafe(|| op(target))) {
                Ok(value) => {
                    if reply.send(Ok(value)).is_err() {
                        trace!("reply abandoned before completion");
                    }
                    ExecOutcome::Completed
                }
                Err(payload) => {
                    let report = FaultReport::new(fault_selector, panic_detail(payload.as_ref()));
                    let observed = reply
                        .send(Err(DispatchError::Faulted(report.clone())))
                        .is_ok();
                    ExecOutcome::Faulted { report, observed }
                }
            }
        });
        let message = Self {
            selector,
            thunk: Some(thunk),
            expects_reply: true,
            ledger: None,
            created_at: SystemTime::now(),
        };
        (message, Pending::new(slot))
    }

    /// Attaches the per-batch completion ledger; the ledger is marked when
    /// the message executes, whatever the outcome.
    pub(crate) fn with_ledger(mut self, ledger: Arc<BatchLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Returns the selector this message was reified with.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Returns `true` if a waiter holds the reply half of this message.
    pub fn expects_reply(&self) -> bool {
        self.expects_reply
    }

    /// Returns the instant the message was reified.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Runs the reified operation against the target.
    ///
    /// Invoked only by the mailbox's worker. The operation runs under
    /// `catch_unwind`; a panic becomes a [`FaultReport`] delivered through
    /// the reply channel if one exists. A second invocation fails with
    /// [`DispatchError::DoubleExecution`] and leaves the target untouched.
    pub(crate) fn execute(&mut self, target: &mut T) -> Result<ExecOutcome, DispatchError> {
        let thunk = self
            .thunk
            .take()
            .ok_or_else(|| DispatchError::DoubleExecution(self.selector.clone()))?;
        let outcome = thunk(target);
        if let Some(ledger) = self.ledger.take() {
            match &outcome {
                ExecOutcome::Completed => ledger.mark_done(None),
                ExecOutcome::Faulted { report, .. } => ledger.mark_done(Some(report.clone())),
            }
        }
        Ok(outcome)
    }
}

impl<T> fmt::Debug for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("selector", &self.selector)
            .field("expects_reply", &self.expects_reply)
            .field("executed", &self.thunk.is_none())
            .finish()
    }
}

/// Renders a panic payload as text. Panics raised through `panic!` carry a
/// `&str` or `String`; anything else is opaque.
fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
