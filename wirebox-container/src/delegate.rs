//! Delegates: deferred construction handles.
//!
//! A [`Delegate`] is what a receiving provider gets for an
//! [`Argument::delegate`](crate::argument::Argument::delegate) binding, or
//! when it resolves a [`ProviderKind::Delegated`] provider. Nothing is
//! built until the receiver calls [`Delegate::create`] /
//! [`Delegate::create_with`], typically once per request:
//!
//! ```rust,ignore
//! let photo_factory = args.delegate("photo_model_factory")?;
//! let photo: Arc<Photo> = photo_factory.create_with([
//!     ("owner_id", Argument::value(owner_id)),
//! ])?;
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::trace;

use crate::argument::{Argument, Instance, downcast};
use crate::container::Inner;
use crate::error::{Result, WireboxError};
use crate::kind::ProviderKind;
use crate::name::ProviderName;
use crate::registry::Entry;
use crate::resolution::Resolution;

/// A bound-but-uninvoked handle on a provider's target.
///
/// Captures the provider as declared when the delegate was resolved; a
/// later `override_arguments` on the container does not change it.
/// Holds the container weakly, so singletons that keep delegates do not
/// keep their container alive.
pub struct Delegate {
    entry: Arc<Entry>,
    container: Weak<Inner>,
}

impl Delegate {
    pub(crate) fn new(entry: Arc<Entry>, container: Weak<Inner>) -> Self {
        Self { entry, container }
    }

    /// Name of the provider this delegate builds.
    pub fn provider(&self) -> &ProviderName {
        &self.entry.name
    }

    /// Kind of the provider this delegate builds.
    pub fn kind(&self) -> ProviderKind {
        self.entry.provider.kind()
    }

    /// Builds an instance with the delegate's own bindings only.
    pub fn create_instance(&self) -> Result<Instance> {
        self.create_instance_with(Vec::<(String, Argument)>::new())
    }

    /// Builds an instance, adding `extras` as keyed arguments.
    ///
    /// The delegate's own bindings take precedence: an extra whose key is
    /// already bound is ignored and never resolved. For a Singleton the
    /// extras only matter if this call is the one that constructs it.
    pub fn create_instance_with<K: Into<String>>(
        &self,
        extras: impl IntoIterator<Item = (K, Argument)>,
    ) -> Result<Instance> {
        let inner = self.container.upgrade().ok_or_else(|| WireboxError::ContainerDropped {
            provider: self.entry.name.clone(),
        })?;

        let extras: Vec<(String, Argument)> =
            extras.into_iter().map(|(key, arg)| (key.into(), arg)).collect();
        trace!(provider = %self.entry.name, extras = extras.len(), "Invoking delegate");

        Resolution::new(&inner).invoke(&self.entry, extras)
    }

    /// Typed [`create_instance`](Self::create_instance).
    pub fn create<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast(&self.entry.name, self.create_instance()?)
    }

    /// Typed [`create_instance_with`](Self::create_instance_with).
    pub fn create_with<T: Send + Sync + 'static, K: Into<String>>(
        &self,
        extras: impl IntoIterator<Item = (K, Argument)>,
    ) -> Result<Arc<T>> {
        downcast(&self.entry.name, self.create_instance_with(extras)?)
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("provider", &self.entry.name)
            .field("kind", &self.entry.provider.kind())
            .field("attached", &(self.container.strong_count() > 0))
            .finish()
    }
}
