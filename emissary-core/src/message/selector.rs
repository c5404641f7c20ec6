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

use derive_new::new;

/// Identifies the operation a message performs on its target.
///
/// A selector is a plain name plus the number of reified arguments. It is
/// carried by every [`Message`](crate::message::Message) and shows up in
/// tracing output and fault reports, so a backlog or a panic can always be
/// attributed to a concrete operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct Selector {
    name: &'static str,
    arity: usize,
}

impl Selector {
    /// Returns the operation name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of arguments the operation was reified with.
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}
