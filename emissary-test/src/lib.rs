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

//! Emissary Test Library
//!
//! Testing utilities for Emissary targets. The [`emissary_test`]
//! attribute runs an async test on a multi-threaded runtime and fails
//! the test when a panic escapes onto a worker thread, which the plain
//! test harness would otherwise miss.
//!
//! Tests that panic on purpose to exercise fault isolation should use
//! `#[tokio::test]` directly; this harness treats every recorded panic
//! as a failure.

pub use emissary_test_macro::emissary_test;

pub mod prelude {
    pub use emissary_test_macro::emissary_test;
}
