//! Provider kinds.
//!
//! The kind determines what resolving a provider does:
//! - [`ProviderKind::Value`] returns a stored payload
//! - [`ProviderKind::Configuration`] returns a (sub-)tree of loaded configuration
//! - [`ProviderKind::Factory`] builds a new instance every time
//! - [`ProviderKind::Singleton`] builds once and caches for the container's lifetime
//! - [`ProviderKind::Callable`] calls a procedure and returns its result
//! - [`ProviderKind::Delegated`] hands out a [`Delegate`](crate::delegate::Delegate)
//!   instead of building anything
use std::fmt;

/// What kind of provider a declaration is.
///
/// # Examples
/// ```
/// use wirebox_container::kind::ProviderKind;
///
/// assert!(ProviderKind::Singleton.is_cached());
/// assert!(!ProviderKind::Factory.is_cached());
/// assert!(ProviderKind::Callable.has_target());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// A literal payload supplied at declaration time.
    Value,

    /// A tree of externally loaded settings, addressable by dotted path.
    Configuration,

    /// New instance on every resolve. Ownership passes to the caller.
    Factory,

    /// One instance for the container's lifetime.
    ///
    /// Built on first resolve, dropped by `reset_singletons()` or when
    /// the container goes away.
    ///
    /// # When to use
    /// - Database connection pools
    /// - Gateways to caches and object stores
    /// - Stateless services shared by request handlers
    Singleton,

    /// A procedure call with bound arguments; its result is returned on
    /// every resolve.
    Callable,

    /// Resolves to a deferred handle on this provider's target instead of
    /// an instance.
    Delegated,
}

impl ProviderKind {
    /// Returns `true` if resolved instances are cached by the container.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, ProviderKind::Singleton)
    }

    /// Returns `true` if the provider invokes a target to produce values.
    #[inline]
    pub fn has_target(&self) -> bool {
        !matches!(self, ProviderKind::Value | ProviderKind::Configuration)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderKind::Value => "Value",
            ProviderKind::Configuration => "Configuration",
            ProviderKind::Factory => "Factory",
            ProviderKind::Singleton => "Singleton",
            ProviderKind::Callable => "Callable",
            ProviderKind::Delegated => "Delegated",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_singleton_is_cached() {
        assert!(ProviderKind::Singleton.is_cached());
        assert!(!ProviderKind::Factory.is_cached());
        assert!(!ProviderKind::Callable.is_cached());
        assert!(!ProviderKind::Delegated.is_cached());
        assert!(!ProviderKind::Value.is_cached());
    }

    #[test]
    fn targets() {
        assert!(ProviderKind::Factory.has_target());
        assert!(ProviderKind::Delegated.has_target());
        assert!(!ProviderKind::Value.has_target());
        assert!(!ProviderKind::Configuration.has_target());
    }

    #[test]
    fn kind_display() {
        assert_eq!(format!("{}", ProviderKind::Singleton), "Singleton");
        assert_eq!(format!("{}", ProviderKind::Delegated), "Delegated");
        assert_eq!(format!("{}", ProviderKind::Configuration), "Configuration");
    }
}
