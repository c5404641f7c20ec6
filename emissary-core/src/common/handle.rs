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
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::instrument;

use crate::mailbox::{Dispatcher, MailboxPhase, SenderToken};
use crate::message::FaultReport;
use crate::proxy::{ActorProxy, BatchProxy, SyncProxy};

/// The per-target bundle returned by wrapping a value.
///
/// A handle is a cheap, clonable reference to the target's dispatcher. It
/// mints the three proxy kinds, observes the mailbox, and retires the
/// target. Every live handle or proxy keeps the target reachable; when the
/// last one is dropped and the queue has drained, the worker retires on
/// its own.
pub struct TargetHandle<T> {
    token: SenderToken<T>,
}

impl<T: Send + 'static> TargetHandle<T> {
    pub(crate) fn new(dispatcher: Arc<Dispatcher<T>>) -> Self {
        Self {
            token: SenderToken::issue(dispatcher),
        }
    }

    /// Returns a fire-and-forget proxy for this target.
    pub fn as_actor(&self) -> ActorProxy<T> {
        ActorProxy::from_token(self.token.clone())
    }

    /// Returns a blocking round-trip proxy for this target.
    pub fn as_sync(&self) -> SyncProxy<T> {
        SyncProxy::from_token(self.token.clone())
    }

    /// Opens a fresh batch proxy for this target.
    ///
    /// Each call returns an independent buffer; batches from different
    /// proxies commit as separate contiguous blocks.
    pub fn new_batch(&self) -> BatchProxy<T> {
        BatchProxy::from_token(self.token.clone())
    }

    /// Installs the observer for faults no waiter is positioned to see.
    ///
    /// A later call replaces the previous hook. The hook runs on the
    /// target's worker; a panicking hook is caught and logged.
    pub fn on_fault(&self, hook: impl Fn(&FaultReport) + Send + Sync + 'static) {
        self.token.dispatcher().set_fault_hook(Box::new(hook));
    }

    /// Retires the target: refuses new messages, drains what is queued,
    /// and waits for the worker to stop.
    ///
    /// Fails if the drain exceeds the configured retire timeout. Other
    /// handles and proxies to this target get
    /// [`DispatchError::TargetGone`](crate::message::DispatchError) from
    /// then on.
    #[instrument(skip(self), fields(target = %self.name()))]
    pub async fn retire(&self) -> anyhow::Result<()> {
        self.token.dispatcher().retire().await
    }
}

impl<T> TargetHandle<T> {
    /// Returns the target's name as registered at wrap time.
    pub fn name(&self) -> &str {
        self.token.dispatcher().name()
    }

    /// Returns the runtime-unique id of the target's mailbox.
    pub fn id(&self) -> u64 {
        self.token.dispatcher().id()
    }

    /// Returns the number of messages currently queued.
    pub fn depth(&self) -> usize {
        self.token.dispatcher().mailbox().depth()
    }

    /// Returns the mailbox phase: idle, running, or draining.
    pub fn phase(&self) -> MailboxPhase {
        self.token.dispatcher().mailbox().phase()
    }
}

impl<T> Clone for TargetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
        }
    }
}

impl<T> PartialEq for TargetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T> Eq for TargetHandle<T> {}

impl<T> Hash for TargetHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<T> fmt::Debug for TargetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandle")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("depth", &self.depth())
            .field("phase", &self.phase())
            .finish()
    }
}
