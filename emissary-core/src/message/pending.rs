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

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::message::DispatchError;

/// A caller-owned placeholder for the result of a dispatched operation.
///
/// The worker resolves it by executing the underlying message; awaiting it
/// yields the operation's result, or [`DispatchError::Faulted`] if the
/// operation panicked. If the message is discarded before execution (the
/// target retired, or the batch holding it was discarded), the placeholder
/// resolves with [`DispatchError::TargetGone`].
#[derive(Debug)]
pub struct Pending<R> {
    slot: oneshot::Receiver<Result<R, DispatchError>>,
}

impl<R> Pending<R> {
    pub(crate) fn new(slot: oneshot::Receiver<Result<R, DispatchError>>) -> Self {
        Self { slot }
    }

    /// Reads the result without suspending.
    ///
    /// Fails with [`DispatchError::NotReady`] while the operation has not
    /// executed yet.
    pub fn try_result(&mut self) -> Result<R, DispatchError> {
        match self.slot.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => Err(DispatchError::NotReady),
            Err(TryRecvError::Closed) => Err(DispatchError::TargetGone),
        }
    }

    /// Waits for the result from a thread that is not running the async
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within a Tokio runtime; use `.await` there
    /// instead.
    pub fn blocking_result(self) -> Result<R, DispatchError> {
        self.slot.blocking_recv()?
    }
}

impl<R> Future for Pending<R> {
    type Output = Result<R, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.slot).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(gone)) => Poll::Ready(Err(gone.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}
