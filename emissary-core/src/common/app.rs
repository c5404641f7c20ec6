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

use crate::common::{DispatchRuntime, EmissaryConfig, CONFIG};

/// The entry point for launching a dispatch runtime.
///
/// `Emissary` itself holds no state; launching converts it into a
/// [`DispatchRuntime`] that owns the target registry.
///
/// # Example
///
/// ```ignore
/// let runtime = Emissary::launch();
/// let handle = runtime.wrap_named(Counter::default(), "counter".to_string());
/// ```
#[derive(Default, Debug, Clone)]
pub struct Emissary;

impl Emissary {
    /// Launches a runtime with configuration from the environment.
    pub fn launch() -> DispatchRuntime {
        let system: Emissary = Default::default();
        system.into()
    }

    /// Launches a runtime with an explicit configuration, bypassing any
    /// configuration file on disk.
    pub fn launch_with_config(config: EmissaryConfig) -> DispatchRuntime {
        DispatchRuntime::new(config)
    }
}

impl From<Emissary> for DispatchRuntime {
    fn from(_: Emissary) -> Self {
        DispatchRuntime::new(CONFIG.clone())
    }
}
