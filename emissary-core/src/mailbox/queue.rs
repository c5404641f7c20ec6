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

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::trace;

use crate::message::{DispatchError, Message};

/// Observable state of a target's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxPhase {
    /// No worker is running; the queue is empty.
    Idle,
    /// A worker is executing or parked on the queue.
    Running,
    /// The mailbox is closed and the worker is finishing queued messages.
    Draining,
}

impl fmt::Display for MailboxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxPhase::Idle => write!(f, "idle"),
            MailboxPhase::Running => write!(f, "running"),
            MailboxPhase::Draining => write!(f, "draining"),
        }
    }
}

struct QueueState<T> {
    queue: VecDeque<Message<T>>,
    closed: bool,
    phase: MailboxPhase,
}

/// The ordered, thread-safe message queue belonging to one target.
///
/// Append and pop are each a single lock acquisition, which is what makes
/// batch insertion contiguous: a committed block goes in under one lock and
/// no concurrent enqueue can interleave with it. The paired worker is the
/// only consumer; nothing else pops or peeks. Enqueuers and the worker meet
/// through the `Notify` wake/park primitive.
pub(crate) struct Mailbox<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    senders: AtomicUsize,
}

impl<T> Mailbox<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                closed: false,
                phase: MailboxPhase::Idle,
            }),
            notify: Notify::new(),
            senders: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().expect("mailbox lock poisoned")
    }

    /// Appends one message at the tail and wakes the worker.
    ///
    /// The queue is unbounded; the only failure is a closed mailbox. On
    /// success, returns the queue depth after the append.
    pub(crate) fn enqueue(&self, message: Message<T>) -> Result<usize, DispatchError> {
        let depth = {
            let mut state = self.state();
            if state.closed {
                return Err(DispatchError::TargetGone);
            }
            state.queue.push_back(message);
            state.queue.len()
        };
        self.notify.notify_one();
        Ok(depth)
    }

    /// Appends a whole ordered block at the tail, atomically.
    ///
    /// The block goes in under a single lock acquisition, so no concurrent
    /// enqueue or batch can interleave with it. An empty block is a no-op.
    pub(crate) fn enqueue_batch(
        &self,
        messages: Vec<Message<T>>,
    ) -> Result<usize, DispatchError> {
        if messages.is_empty() {
            return Ok(0);
        }
        let appended = messages.len();
        let depth = {
            let mut state = self.state();
            if state.closed {
                return Err(DispatchError::TargetGone);
            }
            state.queue.extend(messages);
            state.queue.len()
        };
        trace!(appended, depth, "batch appended");
        self.notify.notify_one();
        Ok(depth)
    }

    /// Pops the head message. Called only by the paired worker.
    pub(crate) fn dequeue(&self) -> Option<Message<T>> {
        self.state().queue.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    pub(crate) fn depth(&self) -> usize {
        self.state().queue.len()
    }

    pub(crate) fn phase(&self) -> MailboxPhase {
        self.state().phase
    }

    /// Refuses further enqueues. Queued messages still drain.
    pub(crate) fn close(&self) {
        {
            let mut state = self.state();
            state.closed = true;
            if state.phase == MailboxPhase::Running {
                state.phase = MailboxPhase::Draining;
            }
        }
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// True once the worker may exit: nothing queued, and either the
    /// mailbox is closed or nothing can enqueue anymore.
    pub(crate) fn should_retire(&self) -> bool {
        let state = self.state();
        state.queue.is_empty() && (state.closed || self.senders.load(Ordering::Acquire) == 0)
    }

    /// A park future for the worker; completes on the next wake.
    pub(crate) fn parked(&self) -> Notified<'_> {
        self.notify.notified()
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.state();
        if !state.closed {
            state.phase = MailboxPhase::Running;
        }
    }

    pub(crate) fn mark_idle(&self) {
        self.state().phase = MailboxPhase::Idle;
    }

    pub(crate) fn sender_joined(&self) {
        self.senders.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one sender reference; the last one wakes the worker so it can
    /// re-check retirement.
    pub(crate) fn sender_left(&self) {
        if self.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_one();
        }
    }
}
