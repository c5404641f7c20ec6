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
#![forbid(missing_docs)] // Keep this to enforce coverage

//! # Emissary
//!
//! This crate provides proxy-based dispatch for plain Rust values, built
//! on top of Tokio. A wrapped value is only reachable through proxies
//! that reify each call as a message and serialize execution through a
//! per-target mailbox with a single worker, so the value itself needs no
//! locks.
//!
//! ## Key Concepts
//!
//! - **Targets**: Plain values handed to the runtime with `wrap`; from
//!   then on the value lives inside its worker and is never touched
//!   directly.
//! - **Handles (`TargetHandle`)**: External references to a wrapped
//!   target, used to obtain proxies, observe mailbox state, and retire
//!   the target.
//! - **Proxies**: Three dispatch policies over the same mailbox:
//!   `ActorProxy` (fire-and-forget), `SyncProxy` (round-trip), and
//!   `BatchProxy` (stage locally, commit as one contiguous block).
//! - **Messages**: Reified invocations carrying a selector, the captured
//!   operation, and an optional result slot (`Pending`).
//! - **Fault isolation**: A panic inside one operation poisons neither
//!   the worker nor the target; it surfaces as a `FaultReport`.
//! - **Runtime (`DispatchRuntime`)**: Owns the target registry and
//!   drains every mailbox at shutdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use emissary::prelude::*;
//!
//! pub struct Counter {
//!     total: u64,
//! }
//!
//! #[dispatchable]
//! impl Counter {
//!     pub fn add(&mut self, amount: u64) {
//!         self.total += amount;
//!     }
//!
//!     pub fn total(&self) -> u64 {
//!         self.total
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Emissary::launch();
//!     let handle = runtime.wrap_named(Counter { total: 0 }, "counter".to_string());
//!
//!     handle.as_actor().add(3)?;
//!     let total = handle.as_sync().total().await?;
//!     assert_eq!(total, 3);
//!
//!     runtime.shutdown_all().await
//! }
//! ```

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `emissary-macro`)
/// *   [`emissary_macro::dispatchable`]: Attribute macro projecting a type's
///     methods onto its proxies.
///
/// ## Core Types
/// *   [`emissary_core::prelude::Emissary`]: Entry point for launching the runtime.
/// *   [`emissary_core::prelude::DispatchRuntime`]: The target registry.
/// *   [`emissary_core::prelude::TargetHandle`]: Handle for a wrapped target.
/// *   [`emissary_core::prelude::ActorProxy`]: Fire-and-forget dispatch.
/// *   [`emissary_core::prelude::SyncProxy`]: Round-trip dispatch.
/// *   [`emissary_core::prelude::BatchProxy`]: Staged, contiguous-block dispatch.
/// *   [`emissary_core::prelude::BatchReceipt`]: Outcome of a committed block.
/// *   [`emissary_core::prelude::Message`]: A reified invocation.
/// *   [`emissary_core::prelude::Selector`]: Name and arity of an operation.
/// *   [`emissary_core::prelude::Pending`]: Result slot for a dispatched operation.
/// *   [`emissary_core::prelude::DispatchError`]: Everything that can go wrong in transit.
/// *   [`emissary_core::prelude::FaultReport`]: Context captured from a panicked operation.
/// *   [`emissary_core::prelude::MailboxPhase`]: Observable worker state.
/// *   [`emissary_core::prelude::EmissaryConfig`]: Runtime configuration.
pub mod prelude {
    // Macros from emissary-macro
    pub use emissary_macro::*;

    // Core types
    pub use emissary_core::prelude::*;
}
