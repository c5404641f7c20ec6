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

//! Defines common internal type aliases used within `emissary-core`.
//!
//! This module centralizes the type-erased function signatures flowing
//! between messages, workers, and hooks.

use crate::message::{ExecOutcome, FaultReport};

/// Crate-internal: the type-erased invocation a [`Message`](crate::message::Message)
/// carries. It owns the reified arguments and the reply sender, runs once
/// against the target, and reports what happened to the worker loop.
pub(crate) type Thunk<T> = Box<dyn FnOnce(&mut T) -> ExecOutcome + Send>;

/// Crate-internal: the observer a target may install for faults that no
/// waiter is positioned to see.
pub(crate) type FaultHook = Box<dyn Fn(&FaultReport) + Send + Sync>;
