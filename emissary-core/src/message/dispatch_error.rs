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

use derive_new::new;

use crate::message::Selector;

/// Represents errors that can occur when dispatching messages to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The target has been retired or dropped; its mailbox no longer accepts
    /// messages.
    TargetGone,
    /// A result-bearing operation was dispatched fire-and-forget, which can
    /// never observe the result.
    AsyncResultMismatch(Selector),
    /// A blocking round-trip was attempted from the target's own worker,
    /// which would deadlock.
    ReentrantDeadlock,
    /// The batch is closed for staging (a commit is in flight or was
    /// abandoned mid-way).
    BatchNotOpen,
    /// The message has already been executed once.
    DoubleExecution(Selector),
    /// The result has not been produced yet.
    NotReady,
    /// The operation panicked while executing against the target.
    Faulted(FaultReport),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DispatchError::TargetGone => write!(f, "target is retired or gone"),
            DispatchError::AsyncResultMismatch(selector) => write!(
                f,
                "operation `{}` expects a result and cannot be dispatched fire-and-forget",
                selector
            ),
            DispatchError::ReentrantDeadlock => write!(
                f,
                "blocking round-trip from the target's own worker would deadlock"
            ),
            DispatchError::BatchNotOpen => write!(f, "batch is not open for staging"),
            DispatchError::DoubleExecution(selector) => {
                write!(f, "message `{}` has already been executed", selector)
            }
            DispatchError::NotReady => write!(f, "result is not ready yet"),
            DispatchError::Faulted(report) => write!(f, "{}", report),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Converts a closed one-shot reply channel into a `DispatchError`.
///
/// The reply sender lives inside the reified message; if it is dropped
/// without sending, the message was discarded before execution and the
/// target is effectively gone for that caller.
impl From<tokio::sync::oneshot::error::RecvError> for DispatchError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        DispatchError::TargetGone
    }
}

/// A captured execution failure: the operation that panicked and the panic
/// payload, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FaultReport {
    selector: Selector,
    detail: String,
}

impl FaultReport {
    /// Returns the selector of the operation that panicked.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Returns the panic payload rendered as text.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for FaultReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "operation `{}` panicked: {}", self.selector, self.detail)
    }
}
