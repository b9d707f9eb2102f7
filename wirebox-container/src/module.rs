//! Modules: groups of related declarations.
//!
//! Large applications split their wiring by concern, the way the photo
//! storage app splits gateways, models and services:
//!
//! ```rust,ignore
//! struct Gateways;
//!
//! impl Module for Gateways {
//!     fn register(&self, declarations: &mut dyn Declarations) {
//!         declarations.declare(
//!             "database".into(),
//!             Provider::singleton(|args: &Arguments| Ok(PostgreSQL::new(args.config("config")?)))
//!                 .kwarg("config", Argument::provider("config.pgsql"))
//!                 .into(),
//!         );
//!     }
//! }
//!
//! let container = Container::builder()
//!     .configuration("config", config)
//!     .module(&Gateways)
//!     .module(&Models)
//!     .build()?;
//! ```
//!
//! All modules declare into the same flat namespace; a provider in one
//! module references a provider from another by its plain name.

use crate::name::ProviderName;
use crate::provider::Provider;

/// A set of declarations registered together.
pub trait Module: Send + Sync {
    /// Declare this module's providers.
    ///
    /// Called once, when the module is added to a builder or installed
    /// into a container.
    fn register(&self, declarations: &mut dyn Declarations);

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// What a [`Module`] declares into.
///
/// Implemented by [`ContainerBuilder`](crate::container::ContainerBuilder)
/// and by a plain `Vec`, which makes modules easy to inspect in tests.
pub trait Declarations {
    fn declare(&mut self, name: ProviderName, provider: Provider);
}

impl Declarations for Vec<(ProviderName, Provider)> {
    fn declare(&mut self, name: ProviderName, provider: Provider) {
        self.push((name, provider));
    }
}
