//! Providers: declarative recipes for producing values on demand.
//!
//! A [`Provider`] is either a stored value, a [`Configuration`] tree, or a
//! [`Recipe`]: a [`Target`] plus bound [`Argument`]s and the
//! [`ProviderKind`] that decides how often the target runs.
//!
//! # Examples
//! ```rust
//! use wirebox_container::prelude::*;
//!
//! struct PostgreSQL { url: String }
//! struct ProfileMapper { database: std::sync::Arc<PostgreSQL> }
//!
//! let database = Provider::singleton(|args: &Arguments| {
//!     Ok(PostgreSQL { url: args.cloned("url")? })
//! })
//! .kwarg("url", Argument::value(String::from("postgres://localhost")));
//!
//! let mapper = Provider::factory(|args: &Arguments| {
//!     Ok(ProfileMapper { database: args.get("database")? })
//! })
//! .kwarg("database", Argument::provider("database"));
//!
//! assert_eq!(mapper.kind(), ProviderKind::Factory);
//! # let _ = database;
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use wirebox_support::rendering::shorten_type_name;

use crate::argument::{Argument, Arguments, Instance};
use crate::configuration::Configuration;
use crate::error::BoxError;
use crate::kind::ProviderKind;

/// Type-erased construction function, shared between clones of a provider.
pub type TargetFn =
    Arc<dyn Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// The constructor, function or procedure a recipe invokes.
#[derive(Clone)]
pub struct Target {
    call: TargetFn,
    type_name: &'static str,
}

impl Target {
    /// Wraps a typed constructor. Its output is shared as `Arc<T>`.
    pub fn new<T, F>(build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |args: &Arguments| {
                build(args).map(|value| Arc::new(value) as Instance)
            }),
            type_name: type_name::<T>(),
        }
    }

    /// Full type name of what the target produces.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn invoke(&self, args: &Arguments) -> std::result::Result<Instance, BoxError> {
        (self.call)(args)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", shorten_type_name(self.type_name))
    }
}

/// A target with bound arguments.
///
/// Built by [`Provider::factory`], [`Provider::singleton`],
/// [`Provider::callable`] and [`Provider::delegated_factory`].
#[derive(Clone, Debug)]
pub struct Recipe {
    kind: ProviderKind,
    target: Target,
    positional: Vec<Argument>,
    keyed: Vec<(String, Argument)>,
}

impl Recipe {
    fn new(kind: ProviderKind, target: Target) -> Self {
        Self {
            kind,
            target,
            positional: Vec::new(),
            keyed: Vec::new(),
        }
    }

    /// Binds the next positional argument.
    pub fn arg(mut self, argument: Argument) -> Self {
        self.positional.push(argument);
        self
    }

    /// Binds a keyed argument.
    pub fn kwarg(mut self, key: impl Into<String>, argument: Argument) -> Self {
        self.keyed.push((key.into(), argument));
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn positional(&self) -> &[Argument] {
        &self.positional
    }

    pub fn keyed(&self) -> &[(String, Argument)] {
        &self.keyed
    }

    /// Every bound argument, positional first.
    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.positional.iter().chain(self.keyed.iter().map(|(_, arg)| arg))
    }

    /// Replaces the keyed binding for `key`, or appends it.
    pub(crate) fn rebind(&mut self, key: String, argument: Argument) {
        match self.keyed.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = argument,
            None => self.keyed.push((key, argument)),
        }
    }
}

/// A declared provider.
#[derive(Clone)]
pub enum Provider {
    /// A payload fixed at declaration time.
    Value {
        instance: Instance,
        type_name: &'static str,
    },
    /// Externally loaded settings.
    Configuration(Configuration),
    /// Factory, Singleton, Callable or Delegated.
    Recipe(Recipe),
}

impl Provider {
    /// A provider that always resolves to `value`.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Provider::Value {
            instance: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// A provider backed by a configuration handle.
    ///
    /// The handle can be loaded before or after declaration.
    pub fn configuration(configuration: Configuration) -> Self {
        Provider::Configuration(configuration)
    }

    /// Builds a new instance on every resolve.
    pub fn factory<T, F>(build: F) -> Recipe
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Recipe::new(ProviderKind::Factory, Target::new(build))
    }

    /// Builds once per container; later resolves return the same instance.
    pub fn singleton<T, F>(build: F) -> Recipe
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Recipe::new(ProviderKind::Singleton, Target::new(build))
    }

    /// Calls a procedure with the bound arguments on every resolve.
    pub fn callable<T, F>(call: F) -> Recipe
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Recipe::new(ProviderKind::Callable, Target::new(call))
    }

    /// Resolves to a [`Delegate`](crate::delegate::Delegate); building is
    /// left to whoever receives it.
    pub fn delegated_factory<T, F>(build: F) -> Recipe
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Recipe::new(ProviderKind::Delegated, Target::new(build))
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Value { .. } => ProviderKind::Value,
            Provider::Configuration(_) => ProviderKind::Configuration,
            Provider::Recipe(recipe) => recipe.kind,
        }
    }

    /// Bound arguments; empty for Value and Configuration providers.
    pub fn arguments(&self) -> Box<dyn Iterator<Item = &Argument> + '_> {
        match self {
            Provider::Recipe(recipe) => Box::new(recipe.arguments()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Short name of what this provider produces, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Provider::Value { type_name, .. } => shorten_type_name(type_name),
            Provider::Configuration(_) => String::from("serde_json::Value"),
            Provider::Recipe(recipe) => shorten_type_name(recipe.target.type_name),
        }
    }
}

impl From<Recipe> for Provider {
    fn from(recipe: Recipe) -> Self {
        Provider::Recipe(recipe)
    }
}

impl From<Configuration> for Provider {
    fn from(configuration: Configuration) -> Self {
        Provider::Configuration(configuration)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Recipe(recipe) => f
                .debug_struct("Provider")
                .field("kind", &recipe.kind)
                .field("target", &recipe.target)
                .field("positional", &recipe.positional)
                .field("keyed", &recipe.keyed)
                .finish(),
            other => f
                .debug_struct("Provider")
                .field("kind", &other.kind())
                .field("produces", &other.describe())
                .finish(),
        }
    }
}
