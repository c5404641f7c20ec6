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

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace, warn};

use crate::common::{EmissaryConfig, FaultHook};
use crate::mailbox::Mailbox;
use crate::message::{DispatchError, ExecOutcome, FaultReport, Message};

tokio::task_local! {
    /// Id of the dispatcher whose worker drives the current task.
    pub(crate) static ACTIVE_WORKER: u64;
}

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Owns one target's mailbox and the single worker task that consumes it.
///
/// The worker is created lazily on the first enqueue, owns the wrapped
/// target value for its whole life, and retires once the queue is empty
/// and either the mailbox is closed or no sender remains. One message's
/// failure never stops the loop.
pub(crate) struct Dispatcher<T> {
    id: u64,
    name: Arc<str>,
    mailbox: Mailbox<T>,
    vault: Mutex<Option<T>>,
    spawned: AtomicBool,
    tracker: TaskTracker,
    runtime: Handle,
    fault_hook: Mutex<Option<FaultHook>>,
    warn_depth: usize,
    batch_warn_staged: usize,
    retire_patience: Duration,
    weak: Weak<Dispatcher<T>>,
}

impl<T> Dispatcher<T> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn batch_warn_staged(&self) -> usize {
        self.batch_warn_staged
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn mailbox(&self) -> &Mailbox<T> {
        &self.mailbox
    }

    /// True when the calling task is this dispatcher's own worker.
    pub(crate) fn is_current_worker(&self) -> bool {
        ACTIVE_WORKER.try_with(|id| *id == self.id).unwrap_or(false)
    }

    pub(crate) fn set_fault_hook(&self, hook: FaultHook) {
        *self.fault_hook.lock().expect("fault hook lock poisoned") = Some(hook);
    }

    fn notify_fault(&self, report: &FaultReport) {
        let hook = self.fault_hook.lock().expect("fault hook lock poisoned");
        if let Some(hook) = hook.as_ref() {
            if catch_unwind(AssertUnwindSafe(|| hook(report))).is_err() {
                error!(name = %self.name, "fault hook panicked");
            }
        }
    }
}

impl<T: Send + 'static> Dispatcher<T> {
    pub(crate) fn new(
        name: Arc<str>,
        target: T,
        runtime: Handle,
        config: &EmissaryConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id: NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed),
            name,
            mailbox: Mailbox::new(),
            vault: Mutex::new(Some(target)),
            spawned: AtomicBool::new(false),
            tracker: TaskTracker::new(),
            runtime,
            fault_hook: Mutex::new(None),
            warn_depth: config.limits.mailbox_warn_depth,
            batch_warn_staged: config.limits.batch_warn_staged,
            retire_patience: config.target_retire_timeout(),
            weak: weak.clone(),
        })
    }

    /// Enqueues one message, spinning the worker up if this is the first.
    #[instrument(skip(self, message), fields(target = %self.name, selector = %message.selector()))]
    pub(crate) fn submit(&self, message: Message<T>) -> Result<(), DispatchError> {
        self.ensure_worker();
        let depth = self.mailbox.enqueue(message)?;
        if depth > self.warn_depth {
            warn!(depth, "mailbox backlog above configured threshold");
        }
        Ok(())
    }

    /// Enqueues an ordered block as one contiguous append.
    #[instrument(skip(self, messages), fields(target = %self.name, staged = messages.len()))]
    pub(crate) fn submit_batch(&self, messages: Vec<Message<T>>) -> Result<(), DispatchError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.ensure_worker();
        let depth = self.mailbox.enqueue_batch(messages)?;
        if depth > self.warn_depth {
            warn!(depth, "mailbox backlog above configured threshold");
        }
        Ok(())
    }

    /// Closes the mailbox, lets the worker drain what is queued, and waits
    /// for it to finish.
    #[instrument(skip(self), fields(target = %self.name))]
    pub(crate) async fn retire(&self) -> anyhow::Result<()> {
        trace!("retiring target");
        self.mailbox.close();
        self.tracker.close();
        if tokio::time::timeout(self.retire_patience, self.tracker.wait())
            .await
            .is_err()
        {
            anyhow::bail!(
                "target `{}` did not drain within {:?}",
                self.name,
                self.retire_patience
            );
        }
        trace!("target retired");
        Ok(())
    }

    fn ensure_worker(&self) {
        if self
            .spawned
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let target = self.vault.lock().expect("target vault poisoned").take();
        let Some(target) = target else {
            error!(name = %self.name, "no target value at worker spawn");
            return;
        };
        self.mailbox.mark_running();
        let Some(worker) = self.weak.upgrade() else {
            return;
        };
        self.tracker
            .spawn_on(ACTIVE_WORKER.scope(self.id, worker.run(target)), &self.runtime);
    }

    #[instrument(skip(self, target), fields(target = %self.name, id = self.id))]
    async fn run(self: Arc<Self>, mut target: T) {
        trace!("worker online");
        loop {
            while let Some(mut message) = self.mailbox.dequeue() {
                let selector = message.selector().clone();
                match message.execute(&mut target) {
                    Ok(ExecOutcome::Completed) => trace!(selector = %selector, "executed"),
                    Ok(ExecOutcome::Faulted { report, observed }) => {
                        if observed {
                            trace!(selector = %selector, "fault delivered to its waiter");
                        } else {
                            error!(selector = %selector, fault = %report, "unhandled fault in target operation");
                            self.notify_fault(&report);
                        }
                    }
                    Err(refused) => {
                        error!(selector = %selector, error = %refused, "message refused execution");
                    }
                }
            }
            if self.mailbox.should_retire() {
                break;
            }
            let wakeup = self.mailbox.parked();
            if !self.mailbox.is_empty() {
                continue;
            }
            if self.mailbox.should_retire() {
                break;
            }
            wakeup.await;
        }
        self.mailbox.mark_idle();
        trace!("worker retired");
    }
}

/// A counted sender reference to one dispatcher.
///
/// Every handle and proxy holds one; the worker uses the count to decide
/// natural retirement. Dropping the last token wakes the worker so it can
/// re-check.
pub(crate) struct SenderToken<T> {
    dispatcher: Arc<Dispatcher<T>>,
}

impl<T> SenderToken<T> {
    pub(crate) fn issue(dispatcher: Arc<Dispatcher<T>>) -> Self {
        dispatcher.mailbox.sender_joined();
        Self { dispatcher }
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }
}

impl<T> Clone for SenderToken<T> {
    fn clone(&self) -> Self {
        self.dispatcher.mailbox.sender_joined();
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<T> Drop for SenderToken<T> {
    fn drop(&mut self) {
        self.dispatcher.mailbox.sender_left();
    }
}
