//! The resolution algorithm.
//!
//! One [`Resolution`] lives for one top-level `resolve` call (or one
//! delegate invocation). It walks the provider graph depth first:
//!
//! 1. a provider already produced during this call is returned from the
//!    per-call memo;
//! 2. a Singleton with a cached instance short-circuits (and is not
//!    marked as visiting);
//! 3. otherwise the provider is marked as visiting, its arguments are
//!    resolved positional first, then keyed, and its target is invoked.
//!
//! Re-entering a provider that is still marked as visiting is a cycle. The
//! visiting marks live on a thread-local stack, so a delegate invoked from
//! inside a target sees the providers its caller is building.
//!
//! Singletons are populated through a per-provider `OnceCell`, so the cache
//! is written only after the target succeeded and concurrent callers wait
//! for the one construction in flight. Before waiting, the container's wait
//! graph is consulted: a wait that would close a cycle across threads fails
//! with `CircularDependency` instead of blocking forever.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::argument::{Argument, Arguments, Instance};
use crate::container::Inner;
use crate::delegate::Delegate;
use crate::error::{Result, WireboxError};
use crate::inflight::ResolvingGuard;
use crate::kind::ProviderKind;
use crate::name::ProviderName;
use crate::provider::{Provider, Recipe};
use crate::registry::Entry;

pub(crate) struct Resolution<'c> {
    inner: &'c Arc<Inner>,
    memo: HashMap<ProviderName, Instance>,
}

impl<'c> Resolution<'c> {
    pub fn new(inner: &'c Arc<Inner>) -> Self {
        Self {
            inner,
            memo: HashMap::new(),
        }
    }

    /// Resolves `name` to an instance.
    pub fn resolve(&mut self, name: &ProviderName) -> Result<Instance> {
        if let Some(hit) = self.memo.get(name) {
            trace!(provider = %name, "Reusing instance from this resolution");
            return Ok(hit.clone());
        }

        let Some(entry) = self.inner.entry(name.as_str()) else {
            return self.resolve_configuration_path(name);
        };

        let instance = match entry.provider.kind() {
            ProviderKind::Delegated => self.delegate_for(entry),
            ProviderKind::Singleton => match self.inner.cached(entry.id) {
                Some(cached) => {
                    trace!(provider = %name, "Singleton cache hit");
                    cached
                }
                None => self.enter(&entry, Vec::new())?,
            },
            _ => self.enter(&entry, Vec::new())?,
        };

        self.memo.insert(name.clone(), instance.clone());
        Ok(instance)
    }

    /// Builds `entry` the way a delegate does: a Delegated provider is
    /// constructed rather than handed out again.
    pub fn invoke(&mut self, entry: &Arc<Entry>, extras: Vec<(String, Argument)>) -> Result<Instance> {
        if entry.provider.kind().is_cached() {
            if let Some(cached) = self.inner.cached(entry.id) {
                return Ok(cached);
            }
        }
        self.enter(entry, extras)
    }

    /// Marks `entry` as visiting for the duration of its construction.
    fn enter(&mut self, entry: &Arc<Entry>, extras: Vec<(String, Argument)>) -> Result<Instance> {
        let _visiting = ResolvingGuard::enter(self.container(), &entry.name)?;
        self.produce(entry, extras)
    }

    fn produce(&mut self, entry: &Arc<Entry>, extras: Vec<(String, Argument)>) -> Result<Instance> {
        match &entry.provider {
            Provider::Value { instance, .. } => Ok(instance.clone()),
            Provider::Configuration(configuration) => {
                let tree = configuration.require(&entry.name, "")?;
                Ok(Arc::new(tree) as Instance)
            }
            Provider::Recipe(recipe) if recipe.kind().is_cached() => {
                let cell = self.inner.singleton_cell(entry.id);
                if let Some(cached) = cell.get() {
                    return Ok(cached.clone());
                }

                let inner = self.inner;
                let waits = inner.waits();
                let _waiting = waits.wait_for(entry.id, &entry.name)?;
                let instance = cell.get_or_try_init(|| {
                    let _building = waits.building(entry.id, &entry.name);
                    self.construct(entry, recipe, extras)
                })?;
                Ok(instance.clone())
            }
            Provider::Recipe(recipe) => self.construct(entry, recipe, extras),
        }
    }

    fn construct(
        &mut self,
        entry: &Arc<Entry>,
        recipe: &Recipe,
        extras: Vec<(String, Argument)>,
    ) -> Result<Instance> {
        let mut positional = Vec::with_capacity(recipe.positional().len());
        for argument in recipe.positional() {
            positional.push(self.argument(argument)?);
        }

        let mut keyed = Vec::with_capacity(recipe.keyed().len() + extras.len());
        for (key, argument) in recipe.keyed() {
            keyed.push((key.clone(), self.argument(argument)?));
        }
        for (key, argument) in extras {
            if recipe.keyed().iter().any(|(bound, _)| *bound == key) {
                continue;
            }
            let value = self.argument(&argument)?;
            keyed.push((key, value));
        }

        let arguments = Arguments::new(entry.name.clone(), positional, keyed);
        trace!(
            provider = %entry.name,
            kind = %recipe.kind(),
            target = recipe.target().type_name(),
            "Invoking target"
        );

        recipe.target().invoke(&arguments).map_err(|source| {
            // A cycle closed through a delegate surfaces as a cycle, not as
            // a failure of the target that invoked the delegate.
            match source.downcast::<WireboxError>() {
                Ok(cycle) if matches!(*cycle, WireboxError::CircularDependency(_)) => *cycle,
                Ok(other) => WireboxError::ConstructionFailed {
                    provider: entry.name.clone(),
                    source: other,
                },
                Err(source) => WireboxError::ConstructionFailed {
                    provider: entry.name.clone(),
                    source,
                },
            }
        })
    }

    fn argument(&mut self, argument: &Argument) -> Result<Instance> {
        match argument {
            Argument::Literal(value) => Ok(value.clone()),
            Argument::Provider(name) => self.resolve(name),
            Argument::Delegate(name) => {
                let entry = self.inner.entry(name.as_str()).ok_or_else(|| self.unknown(name))?;
                Ok(self.delegate_for(entry))
            }
        }
    }

    fn delegate_for(&self, entry: Arc<Entry>) -> Instance {
        trace!(provider = %entry.name, "Handing out delegate");
        Arc::new(Delegate::new(entry, Arc::downgrade(self.inner)))
    }

    /// `config.pgsql.host` -> path `pgsql.host` of Configuration `config`.
    fn resolve_configuration_path(&mut self, name: &ProviderName) -> Result<Instance> {
        let Some((head, path)) = name.split_path() else {
            return Err(self.unknown(name));
        };

        let configuration = self.inner.entry(head).and_then(|entry| match &entry.provider {
            Provider::Configuration(configuration) => Some((entry.name.clone(), configuration.clone())),
            _ => None,
        });
        let Some((owner, configuration)) = configuration else {
            return Err(self.unknown(name));
        };

        let value: Instance = Arc::new(configuration.require(&owner, path)?);
        self.memo.insert(name.clone(), value.clone());
        Ok(value)
    }

    fn unknown(&self, name: &ProviderName) -> WireboxError {
        self.inner.unknown(name, ResolvingGuard::current(self.container()))
    }

    /// Identifies the container on the thread-local resolving stack.
    fn container(&self) -> usize {
        Arc::as_ptr(self.inner) as usize
    }
}
