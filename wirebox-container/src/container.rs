//! # The Container: heart of wirebox
//!
//! A named registry of providers plus the resolution engine.
//!
//! # Architecture
//! ```text
//! ContainerBuilder  ──build()──>  Container ──clone()──> Container (same state)
//!   (validates graph)                │
//!                               resolve(name)
//!                                    │
//!                                    ▼
//!                               Resolution (one per call: memo; in-flight path per thread)
//! ```
//!
//! # Examples
//! ```rust
//! use wirebox_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Connection { url: String }
//! struct Service { db: Arc<Connection> }
//!
//! let container = Container::builder()
//!     .provide(
//!         "db",
//!         Provider::singleton(|args: &Arguments| Ok(Connection { url: args.cloned("url")? }))
//!             .kwarg("url", Argument::value(String::from("x"))),
//!     )
//!     .provide(
//!         "svc",
//!         Provider::factory(|args: &Arguments| Ok(Service { db: args.get("db")? }))
//!             .kwarg("db", Argument::provider("db")),
//!     )
//!     .build()
//!     .expect("valid wiring");
//!
//! let first: Arc<Service> = container.resolve("svc").expect("resolves");
//! let second: Arc<Service> = container.resolve("svc").expect("resolves");
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.db, &second.db));
//! assert_eq!(first.db.url, "x");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};
use wirebox_support::rendering::suggest_similar;

use crate::argument::{Argument, Instance, downcast};
use crate::configuration::Configuration;
use crate::error::{CircularDependencyError, Result, UnknownProviderError, WireboxError};
use crate::graph::{DependencyInfo, GraphValidator};
use crate::inflight::WaitGraph;
use crate::kind::ProviderKind;
use crate::module::{Declarations, Module};
use crate::name::ProviderName;
use crate::provider::Provider;
use crate::registry::{Entry, EntryId, Registry};
use crate::resolution::Resolution;

// ============================================================
// ContainerBuilder
// ============================================================

/// Collects declarations and builds a validated [`Container`].
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .configuration("config", config)
///     .provide("database", Provider::singleton(connect).kwarg("config", Argument::provider("config.pgsql")))
///     .module(&Services)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    declarations: Vec<(ProviderName, Provider)>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    /// Declare a provider. A later declaration under the same name wins.
    pub fn provide(mut self, name: impl Into<ProviderName>, provider: impl Into<Provider>) -> Self {
        self.declarations.push((name.into(), provider.into()));
        self
    }

    /// Declare a Value provider.
    pub fn value<T: Send + Sync + 'static>(self, name: impl Into<ProviderName>, value: T) -> Self {
        self.provide(name, Provider::value(value))
    }

    /// Declare a Configuration provider backed by `configuration`.
    pub fn configuration(self, name: impl Into<ProviderName>, configuration: Configuration) -> Self {
        self.provide(name, Provider::configuration(configuration))
    }

    /// Add every declaration of a [`Module`].
    pub fn module(mut self, module: &dyn Module) -> Self {
        debug!(module = module.name(), "Registering module");
        module.register(&mut self);
        self
    }

    /// Build the container, validating the provider graph.
    ///
    /// Checks: no provider references itself, every reference is declared,
    /// no cycles through provider references.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(declared = self.declarations.len(), "Building container");

        let container = Container::new();
        for (name, provider) in self.declarations {
            container.declare(name, provider)?;
        }
        container.validate()?;

        info!(providers = container.len(), "Container built successfully ✓");
        Ok(container)
    }
}

impl Declarations for ContainerBuilder {
    fn declare(&mut self, name: ProviderName, provider: Provider) {
        self.declarations.push((name, provider));
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Shared state behind every clone of a [`Container`].
pub(crate) struct Inner {
    registry: RwLock<Registry>,
    singletons: DashMap<EntryId, Arc<OnceCell<Instance>>>,
    waits: WaitGraph,
    next_id: AtomicU64,
}

impl Inner {
    pub(crate) fn entry(&self, name: &str) -> Option<Arc<Entry>> {
        self.registry.read().get(name)
    }

    /// The cached instance of a Singleton entry, if built.
    pub(crate) fn cached(&self, id: EntryId) -> Option<Instance> {
        self.singletons.get(&id).and_then(|cell| cell.value().get().cloned())
    }

    /// The once-cell guarding construction of a Singleton entry.
    pub(crate) fn singleton_cell(&self, id: EntryId) -> Arc<OnceCell<Instance>> {
        self.singletons
            .entry(id)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Singleton constructions in flight, by thread.
    pub(crate) fn waits(&self) -> &WaitGraph {
        &self.waits
    }

    pub(crate) fn unknown(&self, name: &ProviderName, required_by: Option<ProviderName>) -> WireboxError {
        unknown_in(&self.registry.read(), name, required_by)
    }
}

fn unknown_in(registry: &Registry, name: &ProviderName, required_by: Option<ProviderName>) -> WireboxError {
    let declared = registry.names();
    let declared: Vec<&str> = declared.iter().map(ProviderName::as_str).collect();
    WireboxError::UnknownProvider(UnknownProviderError {
        requested: name.clone(),
        required_by,
        suggestions: suggest_similar(name.as_str(), &declared, 3),
    })
}

/// An immediate self-reference can never resolve.
fn check_self_reference(name: &ProviderName, provider: &Provider) -> Result<()> {
    if provider.arguments().any(|argument| argument.reference() == Some(name)) {
        return Err(WireboxError::CircularDependency(CircularDependencyError {
            chain: vec![name.clone(), name.clone()],
        }));
    }
    Ok(())
}

/// Thread-safe provider container.
///
/// Cloning is cheap and every clone shares the same providers and
/// Singleton caches, so one container built at startup can be handed to
/// every request handler.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// An empty container. Declarations made with [`declare`](Self::declare)
    /// are checked lazily, at resolution time.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::new()),
                singletons: DashMap::new(),
                waits: WaitGraph::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Declare `provider` under `name`, replacing any previous declaration.
    ///
    /// The new declaration starts with an empty Singleton cache; instances
    /// already built by the replaced provider are left with whoever holds
    /// them.
    ///
    /// # Errors
    /// [`WireboxError::CircularDependency`] if an argument references `name`
    /// itself.
    pub fn declare(&self, name: impl Into<ProviderName>, provider: impl Into<Provider>) -> Result<()> {
        let name = name.into();
        let provider = provider.into();
        check_self_reference(&name, &provider)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let replaced = self.inner.registry.write().insert(Entry {
            id,
            name: name.clone(),
            provider,
        });

        if let Some(previous) = replaced {
            debug!(provider = %name, previous_kind = %previous.provider.kind(), "Replaced declaration");
        }
        Ok(())
    }

    /// Declare every provider of a [`Module`].
    pub fn install(&self, module: &dyn Module) -> Result<()> {
        let mut declarations: Vec<(ProviderName, Provider)> = Vec::new();
        module.register(&mut declarations);
        debug!(module = module.name(), declared = declarations.len(), "Installing module");

        for (name, provider) in declarations {
            self.declare(name, provider)?;
        }
        Ok(())
    }

    /// Rebind keyed arguments of a declared provider, e.g. to swap in a mock.
    ///
    /// Keys that are already bound are replaced in place; new keys are
    /// appended. The kind is unchanged and an already built Singleton
    /// instance stays cached until [`reset_singletons`](Self::reset_singletons).
    ///
    /// ```rust,ignore
    /// container.override_arguments("auth_service", [("database", Argument::provider("fake_database"))])?;
    /// ```
    ///
    /// # Errors
    /// - [`WireboxError::UnknownProvider`] if `name` is not declared
    /// - [`WireboxError::InvalidOverride`] for Value and Configuration providers
    /// - [`WireboxError::CircularDependency`] if a replacement references `name`
    pub fn override_arguments<K: Into<String>>(
        &self,
        name: &str,
        replacements: impl IntoIterator<Item = (K, Argument)>,
    ) -> Result<()> {
        let mut registry = self.inner.registry.write();
        let Some(entry) = registry.get(name) else {
            return Err(unknown_in(&registry, &ProviderName::new(name), None));
        };

        let Provider::Recipe(recipe) = &entry.provider else {
            return Err(WireboxError::InvalidOverride {
                provider: entry.name.clone(),
                kind: entry.provider.kind(),
            });
        };

        let mut recipe = recipe.clone();
        let mut keys = Vec::new();
        for (key, argument) in replacements {
            let key = key.into();
            keys.push(key.clone());
            recipe.rebind(key, argument);
        }

        let provider = Provider::Recipe(recipe);
        check_self_reference(&entry.name, &provider)?;

        registry.insert(Entry {
            id: entry.id,
            name: entry.name.clone(),
            provider,
        });
        debug!(provider = %entry.name, keys = ?keys, "Overrode arguments");
        Ok(())
    }

    /// Resolve a provider by name.
    ///
    /// ```rust,ignore
    /// let db: Arc<PostgreSQL> = container.resolve("database")?;
    /// let pgsql: Arc<serde_json::Value> = container.resolve("config.pgsql")?;
    /// ```
    pub fn resolve<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let name = ProviderName::new(name);
        let instance = self.resolve_named(&name)?;
        downcast(&name, instance)
    }

    /// Resolve a provider by name without downcasting.
    pub fn resolve_instance(&self, name: &str) -> Result<Instance> {
        self.resolve_named(&ProviderName::new(name))
    }

    #[instrument(skip(self, name), level = "trace", name = "resolve", fields(provider = %name))]
    fn resolve_named(&self, name: &ProviderName) -> Result<Instance> {
        Resolution::new(&self.inner).resolve(name)
    }

    /// Drop every cached Singleton instance.
    ///
    /// Factories, Values and Configuration are unaffected. Instances
    /// already handed out stay alive as long as someone holds them.
    pub fn reset_singletons(&self) {
        let cleared = self
            .inner
            .singletons
            .iter()
            .filter(|cell| cell.value().get().is_some())
            .count();
        self.inner.singletons.clear();
        debug!(cleared, "Singleton caches reset");
    }

    /// Check the declared graph: references exist and contain no cycle.
    ///
    /// Run automatically by [`ContainerBuilder::build`].
    #[instrument(skip(self), name = "container_validate")]
    pub fn validate(&self) -> Result<()> {
        let infos: Vec<DependencyInfo> = self
            .inner
            .registry
            .read()
            .entries()
            .map(|entry| {
                DependencyInfo::new(entry.name.clone(), entry.provider.kind(), entry.provider.arguments())
            })
            .collect();

        GraphValidator::new(infos).validate()
    }

    /// Returns `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.entry(name).is_some()
    }

    /// Kind of the provider declared under `name`.
    pub fn kind_of(&self, name: &str) -> Option<ProviderKind> {
        self.inner.entry(name).map(|entry| entry.provider.kind())
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> Vec<ProviderName> {
        self.inner.registry.read().names()
    }

    /// The configuration handle declared under `name`, for loading it
    /// after the container was built.
    pub fn configuration(&self, name: &str) -> Option<Configuration> {
        self.inner.entry(name).and_then(|entry| match &entry.provider {
            Provider::Configuration(configuration) => Some(configuration.clone()),
            _ => None,
        })
    }

    /// Number of declared providers.
    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.read().is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        let providers: Vec<String> = registry
            .entries()
            .map(|entry| format!("{} [{}] {}", entry.name, entry.provider.kind(), entry.provider.describe()))
            .collect();

        f.debug_struct("Container")
            .field("registered", &registry.len())
            .field("providers", &providers)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Async resolution
// ═══════════════════════════════════════════

#[cfg(feature = "async")]
pub use self::asynchronous::AsyncResolve;

#[cfg(feature = "async")]
mod asynchronous {
    use std::sync::Arc;

    use super::Container;
    use crate::error::{Result, WireboxError};
    use crate::name::ProviderName;

    /// Resolution from async code.
    ///
    /// Targets may block (opening connections, reading keys), so the
    /// resolution runs on tokio's blocking pool instead of the calling task.
    #[async_trait::async_trait]
    pub trait AsyncResolve {
        async fn resolve_async<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>>;
    }

    #[async_trait::async_trait]
    impl AsyncResolve for Container {
        async fn resolve_async<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
            let container = self.clone();
            let requested = ProviderName::new(name);
            let task_name = requested.clone();

            tokio::task::spawn_blocking(move || container.resolve::<T>(task_name.as_str()))
                .await
                .map_err(|join_error| WireboxError::ConstructionFailed {
                    provider: requested,
                    source: Box::new(join_error),
                })?
        }
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    #[cfg(feature = "async")]
    pub use super::AsyncResolve;
    pub use super::{Container, ContainerBuilder};
    pub use crate::argument::{Argument, Arguments, Instance};
    pub use crate::configuration::{ConfigSource, Configuration};
    pub use crate::delegate::Delegate;
    pub use crate::error::{BoxError, Result, WireboxError};
    pub use crate::kind::ProviderKind;
    pub use crate::module::{Declarations, Module};
    pub use crate::name::ProviderName;
    pub use crate::provider::{Provider, Recipe};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
