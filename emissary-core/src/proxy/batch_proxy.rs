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

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use derive_new::new;
use tokio::sync::Notify;
use tracing::{instrument, trace, warn};

use crate::mailbox::SenderToken;
use crate::message::{DispatchError, FaultReport, Message, Pending, Selector};

/// Crate-internal: completion bookkeeping shared by one staged block.
///
/// Every message in the block holds an `Arc` to the same ledger; the
/// worker ticks it once per executed message, and `commit` waits on it
/// until the whole block has run.
pub(crate) struct BatchLedger {
    done: AtomicUsize,
    faults: Mutex<Vec<FaultReport>>,
    notify: Notify,
}

impl BatchLedger {
    fn new() -> Self {
        Self {
            done: AtomicUsize::new(0),
            faults: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Ticks the ledger for one executed message. The committer is the
    /// only waiter, so a single stored permit cannot be lost between its
    /// re-check and its park.
    pub(crate) fn mark_done(&self, fault: Option<FaultReport>) {
        if let Some(report) = fault {
            self.faults
                .lock()
                .expect("batch ledger lock poisoned")
                .push(report);
        }
        self.done.fetch_add(1, Ordering::AcqRel);
        self.notify.notify_one();
    }

    async fn wait_for(&self, total: usize) {
        loop {
            if self.done.load(Ordering::Acquire) >= total {
                return;
            }
            let parked = self.notify.notified();
            if self.done.load(Ordering::Acquire) >= total {
                return;
            }
            parked.await;
        }
    }

    fn faults(&self) -> Vec<FaultReport> {
        self.faults
            .lock()
            .expect("batch ledger lock poisoned")
            .clone()
    }
}

/// The outcome of a committed block: how many operations ran and which
/// of them panicked.
#[derive(Debug, Clone, new)]
pub struct BatchReceipt {
    committed: usize,
    faults: Vec<FaultReport>,
}

impl BatchReceipt {
    pub(crate) fn empty() -> Self {
        Self {
            committed: 0,
            faults: Vec::new(),
        }
    }

    /// The number of operations that executed.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Fault reports for the operations that panicked, in completion
    /// order.
    pub fn faults(&self) -> &[FaultReport] {
        &self.faults
    }

    /// `true` when every operation in the block completed normally.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

enum BatchState {
    Idle,
    Batching(Arc<BatchLedger>),
    Committing,
}

/// The staging proxy: buffer operations locally, then dispatch them as
/// one contiguous block.
///
/// Nothing reaches the target until [`BatchProxy::commit`]; until then
/// the staged operations live in this proxy and can be thrown away with
/// [`BatchProxy::discard`]. A commit appends the whole block to the
/// mailbox atomically, so no message from another sender can land
/// between two operations of the same block.
///
/// Each `BatchProxy` is an independent buffer. Two proxies committing
/// concurrently produce two contiguous blocks in some order; they never
/// interleave.
pub struct BatchProxy<T> {
    token: SenderToken<T>,
    staged: Vec<Message<T>>,
    state: BatchState,
}

impl<T: Send + 'static> BatchProxy<T> {
    pub(crate) fn from_token(token: SenderToken<T>) -> Self {
        Self {
            token,
            staged: Vec::new(),
            state: BatchState::Idle,
        }
    }

    /// Buffers `op` without dispatching it. The first stage after
    /// construction, a commit, or a discard opens a fresh block.
    ///
    /// The returned [`Pending`] stays empty until the block commits;
    /// polling it before then reports [`DispatchError::NotReady`]. If
    /// the block is discarded instead, the slot resolves to
    /// [`DispatchError::TargetGone`].
    #[instrument(skip(self, op), fields(target = %self.token.dispatcher().name(), selector = %selector))]
    pub fn stage<R: Send + 'static>(
        &mut self,
        selector: Selector,
        op: impl FnOnce(&mut T) -> R + Send + 'static,
    ) -> Result<Pending<R>, DispatchError> {
        let ledger = match &self.state {
            BatchState::Idle => {
                let ledger = Arc::new(BatchLedger::new());
                self.state = BatchState::Batching(Arc::clone(&ledger));
                ledger
            }
            BatchState::Batching(ledger) => Arc::clone(ledger),
            BatchState::Committing => return Err(DispatchError::BatchNotOpen),
        };
        let (message, pending) = Message::returning(selector, op);
        self.staged.push(message.with_ledger(ledger));
        if self.staged.len() > self.token.dispatcher().batch_warn_staged() {
            warn!(
                staged = self.staged.len(),
                "staged block exceeds configured threshold"
            );
        }
        Ok(pending)
    }

    /// Dispatches the staged block as one contiguous run and waits for
    /// every operation in it to execute.
    ///
    /// Committing with nothing staged is a no-op that does not touch
    /// the target. If the target is gone the block is dropped, every
    /// staged [`Pending`] resolves to [`DispatchError::TargetGone`],
    /// and the proxy is reset for reuse.
    ///
    /// Dropping the returned future after dispatch leaves the proxy
    /// mid-commit; [`BatchProxy::discard`] resets it. Staging or
    /// committing in that window reports
    /// [`DispatchError::BatchNotOpen`].
    #[instrument(skip(self), fields(target = %self.token.dispatcher().name(), staged = self.staged.len()))]
    pub async fn commit(&mut self) -> Result<BatchReceipt, DispatchError> {
        if self.token.dispatcher().is_current_worker() {
            return Err(DispatchError::ReentrantDeadlock);
        }
        let ledger = match mem::replace(&mut self.state, BatchState::Committing) {
            BatchState::Idle => {
                self.state = BatchState::Idle;
                return Ok(BatchReceipt::empty());
            }
            BatchState::Committing => return Err(DispatchError::BatchNotOpen),
            BatchState::Batching(ledger) => ledger,
        };
        let block = mem::take(&mut self.staged);
        let total = block.len();
        if let Err(refused) = self.token.dispatcher().submit_batch(block) {
            self.state = BatchState::Idle;
            return Err(refused);
        }
        ledger.wait_for(total).await;
        let receipt = BatchReceipt::new(total, ledger.faults());
        self.state = BatchState::Idle;
        trace!(
            committed = receipt.committed(),
            faults = receipt.faults().len(),
            "block committed"
        );
        Ok(receipt)
    }

    /// Drops every staged operation without dispatching anything and
    /// returns how many were thrown away. Their [`Pending`] slots
    /// resolve to [`DispatchError::TargetGone`].
    pub fn discard(&mut self) -> usize {
        self.state = BatchState::Idle;
        let dropped = self.staged.len();
        self.staged.clear();
        if dropped > 0 {
            trace!(dropped, "staged block discarded");
        }
        dropped
    }

    /// The number of operations currently staged.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// `true` while a block is open for staging.
    pub fn is_open(&self) -> bool {
        matches!(self.state, BatchState::Batching(_))
    }

    /// The name of the target this proxy forwards to.
    pub fn target_name(&self) -> &str {
        self.token.dispatcher().name()
    }
}

impl<T> fmt::Debug for BatchProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProxy")
            .field("target", &self.token.dispatcher().name())
            .field("staged", &self.staged.len())
            .field("open", &matches!(self.state, BatchState::Batching(_)))
            .finish()
    }
}
