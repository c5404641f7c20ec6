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

use tracing::instrument;

use crate::mailbox::SenderToken;
use crate::message::{DispatchError, Message, Pending, Selector};

/// The round-trip proxy: enqueue, then wait for the result.
///
/// Calls still travel through the mailbox, so they serialize with every
/// other message to the same target; the caller simply does not proceed
/// until its own message has executed.
///
/// Calling from inside the target's own worker would park the worker
/// waiting on a message only that worker can execute. That path is
/// refused up front with [`DispatchError::ReentrantDeadlock`]; handler
/// code already holds `&mut` access and can invoke the operation
/// directly.
pub struct SyncProxy<T> {
    token: SenderToken<T>,
}

impl<T: Send + 'static> SyncProxy<T> {
    pub(crate) fn from_token(token: SenderToken<T>) -> Self {
        Self { token }
    }

    /// Runs `op` against the target and awaits its result.
    ///
    /// A panic inside `op` surfaces here as
    /// [`DispatchError::Faulted`]; the worker itself survives.
    #[instrument(skip(self, op), fields(target = %self.token.dispatcher().name(), selector = %selector))]
    pub async fn call<R: Send + 'static>(
        &self,
        selector: Selector,
        op: impl FnOnce(&mut T) -> R + Send + 'static,
    ) -> Result<R, DispatchError> {
        self.guard_reentry()?;
        let (message, pending) = Message::returning(selector, op);
        self.token.dispatcher().submit(message)?;
        pending.await
    }

    /// Runs `op` against the target and blocks the current thread until
    /// the result arrives.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context;
    /// use [`SyncProxy::call`] there instead.
    #[instrument(skip(self, op), fields(target = %self.token.dispatcher().name(), selector = %selector))]
    pub fn call_blocking<R: Send + 'static>(
        &self,
        selector: Selector,
        op: impl FnOnce(&mut T) -> R + Send + 'static,
    ) -> Result<R, DispatchError> {
        self.guard_reentry()?;
        let (message, pending) = Message::returning(selector, op);
        self.token.dispatcher().submit(message)?;
        pending.blocking_result()
    }

    /// The name of the target this proxy forwards to.
    pub fn target_name(&self) -> &str {
        self.token.dispatcher().name()
    }

    fn guard_reentry(&self) -> Result<(), DispatchError> {
        if self.token.dispatcher().is_current_worker() {
            return Err(DispatchError::ReentrantDeadlock);
        }
        Ok(())
    }
}

impl<T> Clone for SyncProxy<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
        }
    }
}

impl<T> fmt::Debug for SyncProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncProxy")
            .field("target", &self.token.dispatcher().name())
            .finish()
    }
}
