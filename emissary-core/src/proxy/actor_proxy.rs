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
use crate::message::{DispatchError, Message, Selector};

/// The fire-and-forget proxy: enqueue and return immediately.
///
/// A cast never waits for execution and never observes the operation's
/// result. The only errors it reports are delivery errors: a mailbox
/// that has been closed refuses further messages with
/// [`DispatchError::TargetGone`].
pub struct ActorProxy<T> {
    token: SenderToken<T>,
}

impl<T: Send + 'static> ActorProxy<T> {
    pub(crate) fn from_token(token: SenderToken<T>) -> Self {
        Self { token }
    }

    /// Enqueues `op` to run against the target and returns without
    /// waiting. Execution order follows enqueue order.
    #[instrument(skip(self, op), fields(target = %self.token.dispatcher().name(), selector = %selector))]
    pub fn cast(
        &self,
        selector: Selector,
        op: impl FnOnce(&mut T) + Send + 'static,
    ) -> Result<(), DispatchError> {
        self.send(Message::unit(selector, op))
    }

    /// Enqueues an already-built message.
    ///
    /// A message carrying a result slot cannot travel this path; nobody
    /// would be waiting on the slot, so the send is refused with
    /// [`DispatchError::AsyncResultMismatch`] instead of silently
    /// dropping the result.
    pub fn send(&self, message: Message<T>) -> Result<(), DispatchError> {
        if message.expects_reply() {
            return Err(DispatchError::AsyncResultMismatch(message.selector().clone()));
        }
        self.token.dispatcher().submit(message)
    }

    /// The name of the target this proxy forwards to.
    pub fn target_name(&self) -> &str {
        self.token.dispatcher().name()
    }
}

impl<T> Clone for ActorProxy<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
        }
    }
}

impl<T> fmt::Debug for ActorProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorProxy")
            .field("target", &self.token.dispatcher().name())
            .finish()
    }
}
