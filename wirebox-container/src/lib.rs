//! Core provider and container implementation for wirebox.

pub mod argument;
pub mod configuration;
pub mod container;
pub mod delegate;
pub mod error;
pub(crate) mod graph;
pub(crate) mod inflight;
pub mod kind;
pub mod module;
pub mod name;
pub mod provider;
pub(crate) mod registry;
pub(crate) mod resolution;

pub use argument::{Argument, Arguments, Instance};
pub use configuration::{ConfigSource, Configuration};
pub use figment;
#[cfg(feature = "async")]
pub use container::AsyncResolve;
pub use container::{Container, ContainerBuilder, prelude};
pub use delegate::Delegate;
pub use error::{BoxError, Result, WireboxError};
pub use kind::ProviderKind;
pub use module::{Declarations, Module};
pub use name::ProviderName;
pub use provider::{Provider, Recipe, Target};
