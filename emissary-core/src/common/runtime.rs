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
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::runtime::Handle;
use tracing::{instrument, trace};

use crate::common::{EmissaryConfig, TargetHandle};
use crate::mailbox::Dispatcher;

/// Crate-internal: a type-erased registry entry that can retire its target.
///
/// The registry holds weak references only, so it never keeps a target
/// alive: once every handle and proxy is dropped, the worker retires
/// naturally and the entry goes stale.
#[async_trait]
pub(crate) trait Retirable: Send + Sync {
    fn name(&self) -> &str;
    fn is_live(&self) -> bool;
    async fn retire(&self) -> anyhow::Result<()>;
}

struct RegistryEntry<T> {
    name: Arc<str>,
    dispatcher: Weak<Dispatcher<T>>,
}

#[async_trait]
impl<T: Send + 'static> Retirable for RegistryEntry<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        self.dispatcher.strong_count() > 0
    }

    async fn retire(&self) -> anyhow::Result<()> {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            return Ok(());
        };
        dispatcher.retire().await
    }
}

/// The explicit target registry and entry point for wrapping values.
///
/// One runtime owns the table of wrapped targets; `wrap` registers a
/// target and hands back its [`TargetHandle`]. The runtime is cheap to
/// clone and clones share the registry.
#[derive(Clone)]
pub struct DispatchRuntime {
    registry: Arc<DashMap<u64, Arc<dyn Retirable>>>,
    config: Arc<EmissaryConfig>,
    runtime: Handle,
}

impl DispatchRuntime {
    /// Must be called from within a Tokio runtime; workers spawn onto the
    /// runtime that was current here.
    pub(crate) fn new(config: EmissaryConfig) -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            config: Arc::new(config),
            runtime: Handle::current(),
        }
    }

    /// Wraps a target under the configured default name.
    pub fn wrap<T: Send + 'static>(&self, target: T) -> TargetHandle<T> {
        self.wrap_named(target, self.config.defaults.target_name.clone())
    }

    /// Wraps a target under the given name and registers it.
    ///
    /// The returned handle is the only way to reach the target from now
    /// on; the value itself moves into the worker.
    #[instrument(skip(self, target), fields(name = %name))]
    pub fn wrap_named<T: Send + 'static>(&self, target: T, name: String) -> TargetHandle<T> {
        let name: Arc<str> = name.into();
        let dispatcher = Dispatcher::new(
            Arc::clone(&name),
            target,
            self.runtime.clone(),
            &self.config,
        );
        self.registry.insert(
            dispatcher.id(),
            Arc::new(RegistryEntry {
                name,
                dispatcher: Arc::downgrade(&dispatcher),
            }),
        );
        trace!(id = dispatcher.id(), "wrapped new target");
        TargetHandle::new(dispatcher)
    }

    /// Retrieves the number of reachable targets in the registry.
    pub fn target_count(&self) -> usize {
        self.registry
            .iter()
            .filter(|entry| entry.value().is_live())
            .count()
    }

    /// Returns the configuration this runtime was launched with.
    pub fn config(&self) -> &EmissaryConfig {
        &self.config
    }

    /// Retires every registered target and waits for their workers.
    ///
    /// The whole teardown is bounded by the configured system shutdown
    /// timeout, overridable through `EMISSARY_SHUTDOWN_TIMEOUT_MS`.
    #[instrument(skip(self), fields(targets = self.registry.len()))]
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let entries: Vec<Arc<dyn Retirable>> = self
            .registry
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let patience = self.shutdown_patience();

        let retire_futures = entries.into_iter().map(|entry| async move {
            trace!(name = entry.name(), "retiring");
            entry.retire().await
        });
        let Ok(results) = tokio::time::timeout(patience, join_all(retire_futures)).await else {
            anyhow::bail!("shutdown did not complete within {:?}", patience);
        };
        for result in results {
            result?;
        }
        self.registry.clear();
        Ok(())
    }

    fn shutdown_patience(&self) -> Duration {
        std::env::var("EMISSARY_SHUTDOWN_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or_else(
                || self.config.system_shutdown_timeout(),
                Duration::from_millis,
            )
    }
}

impl fmt::Debug for DispatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRuntime")
            .field("targets", &self.registry.len())
            .finish()
    }
}
