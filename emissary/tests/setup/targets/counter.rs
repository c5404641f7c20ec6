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

/// A plain counter used as a wrapped target in tests.
///
/// Note that it carries no synchronization of its own; exclusive access
/// is exactly what dispatch through the mailbox is supposed to provide.
#[derive(Default, Debug)]
pub struct Counter {
    /// The running sum.
    pub total: u64,
}

impl Counter {
    pub fn add(&mut self, amount: u64) {
        self.total += amount;
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
