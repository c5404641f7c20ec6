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

#![forbid(unsafe_code)]
// #![warn(missing_docs)]
//! Emissary Core Library
//!
//! This library provides the dispatch engine for the Emissary framework:
//! reified messages, per-target mailboxes with a single worker each, and the
//! three proxy policies (fire-and-forget, blocking round-trip, batched
//! commit) built on top of them.

/// Common utilities and structures used throughout the Emissary framework.
pub(crate) mod common;

pub(crate) mod mailbox;
pub(crate) mod message;
pub(crate) mod proxy;

/// Prelude module for convenient imports.
///
/// This module re-exports the types needed to wrap a target, obtain proxies
/// for it, and observe dispatch outcomes.
pub mod prelude {
    pub use crate::common::{DispatchRuntime, Emissary, EmissaryConfig, TargetHandle, CONFIG};
    pub use crate::mailbox::MailboxPhase;
    pub use crate::message::{DispatchError, FaultReport, Message, Pending, Selector};
    pub use crate::proxy::{ActorProxy, BatchProxy, BatchReceipt, SyncProxy};
}
