//! Bound arguments.
//!
//! A recipe provider binds [`Argument`]s at declaration time. At
//! resolution time every argument is turned into an [`Instance`] and the
//! target receives them as [`Arguments`].

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::delegate::Delegate;
use crate::error::{Result, WireboxError};
use crate::name::ProviderName;

/// A type-erased, shared value produced by a provider.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// One bound argument of a recipe provider.
#[derive(Clone)]
pub enum Argument {
    /// A value fixed at declaration time.
    Literal(Instance),
    /// Resolve the named provider and pass its value.
    Provider(ProviderName),
    /// Pass a [`Delegate`] for the named provider without building it.
    Delegate(ProviderName),
}

impl Argument {
    /// A literal value.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Argument::Literal(Arc::new(value))
    }

    /// A literal that is already shared; the target receives this exact `Arc`.
    pub fn shared<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Argument::Literal(value)
    }

    /// A reference to another provider (dotted names reach into configuration).
    pub fn provider(name: impl Into<ProviderName>) -> Self {
        Argument::Provider(name.into())
    }

    /// A deferred reference to another provider's construction.
    pub fn delegate(name: impl Into<ProviderName>) -> Self {
        Argument::Delegate(name.into())
    }

    /// The provider this argument points at, if it is a reference.
    pub fn reference(&self) -> Option<&ProviderName> {
        match self {
            Argument::Literal(_) => None,
            Argument::Provider(name) | Argument::Delegate(name) => Some(name),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(_) => f.write_str("Literal(..)"),
            Argument::Provider(name) => write!(f, "Provider({name})"),
            Argument::Delegate(name) => write!(f, "Delegate({name})"),
        }
    }
}

/// Resolved arguments handed to a target.
///
/// Keyed lookups use the first binding with a matching key.
pub struct Arguments {
    provider: ProviderName,
    positional: Vec<Instance>,
    keyed: Vec<(String, Instance)>,
}

impl Arguments {
    pub(crate) fn new(
        provider: ProviderName,
        positional: Vec<Instance>,
        keyed: Vec<(String, Instance)>,
    ) -> Self {
        Self { provider, positional, keyed }
    }

    /// The provider these arguments were resolved for.
    pub fn provider(&self) -> &ProviderName {
        &self.provider
    }

    /// Number of positional arguments.
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    /// Keys of the keyed arguments, in binding order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keyed.iter().map(|(key, _)| key.as_str())
    }

    /// Returns `true` if a keyed argument named `key` is bound.
    pub fn contains(&self, key: &str) -> bool {
        self.instance(key).is_some()
    }

    /// The raw instance bound under `key`.
    pub fn instance(&self, key: &str) -> Option<&Instance> {
        self.keyed.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Typed keyed argument.
    ///
    /// ```rust,ignore
    /// let db: Arc<PostgreSQL> = args.get("database")?;
    /// ```
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        let instance = self.instance(key).ok_or_else(|| self.missing(key.to_string()))?;
        downcast(&self.provider, instance.clone())
    }

    /// Typed keyed argument, cloned out of its `Arc`.
    pub fn cloned<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Result<T> {
        self.get::<T>(key).map(|value| (*value).clone())
    }

    /// Typed positional argument.
    pub fn at<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        let instance = self
            .positional
            .get(index)
            .ok_or_else(|| self.missing(format!("#{index}")))?;
        downcast(&self.provider, instance.clone())
    }

    /// Deserializes a keyed argument that was bound to a configuration path.
    ///
    /// ```rust,ignore
    /// // kwarg("config", Argument::provider("config.pgsql"))
    /// let settings: PgSettings = args.config("config")?;
    /// ```
    pub fn config<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get::<serde_json::Value>(key)?;
        serde_json::from_value(value.as_ref().clone()).map_err(|source| {
            WireboxError::InvalidConfiguration {
                path: format!("{}:{key}", self.provider),
                source,
            }
        })
    }

    /// The delegate bound under `key`.
    pub fn delegate(&self, key: &str) -> Result<Arc<Delegate>> {
        self.get::<Delegate>(key)
    }

    fn missing(&self, argument: String) -> WireboxError {
        WireboxError::MissingArgument {
            provider: self.provider.clone(),
            argument,
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("provider", &self.provider)
            .field("positional", &self.positional.len())
            .field("keyed", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Downcasts a resolved instance, reporting `provider` on mismatch.
pub(crate) fn downcast<T: Send + Sync + 'static>(
    provider: &ProviderName,
    instance: Instance,
) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| WireboxError::TypeMismatch {
            provider: provider.clone(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn args() -> Arguments {
        Arguments::new(
            ProviderName::new("hasher"),
            vec![Arc::new(String::from("scrypt")) as Instance],
            vec![
                ("salt_size".into(), Arc::new(32u32) as Instance),
                ("rounds".into(), Arc::new(16u32) as Instance),
                ("rounds".into(), Arc::new(99u32) as Instance),
                (
                    "config".into(),
                    Arc::new(serde_json::json!({ "host": "localhost", "port": 5432 })) as Instance,
                ),
            ],
        )
    }

    #[test]
    fn typed_keyed_lookup() {
        let args = args();
        assert_eq!(*args.get::<u32>("salt_size").unwrap(), 32);
        assert_eq!(args.cloned::<u32>("salt_size").unwrap(), 32);
    }

    #[test]
    fn first_binding_wins() {
        assert_eq!(*args().get::<u32>("rounds").unwrap(), 16);
    }

    #[test]
    fn positional_lookup() {
        let args = args();
        assert_eq!(args.at::<String>(0).unwrap().as_str(), "scrypt");
        assert_eq!(args.positional_len(), 1);
    }

    #[test]
    fn missing_argument() {
        match args().get::<u32>("block_size").unwrap_err() {
            WireboxError::MissingArgument { provider, argument } => {
                assert_eq!(provider, "hasher");
                assert_eq!(argument, "block_size");
            }
            other => panic!("Expected MissingArgument, got: {other:?}"),
        }

        match args().at::<String>(3).unwrap_err() {
            WireboxError::MissingArgument { argument, .. } => assert_eq!(argument, "#3"),
            other => panic!("Expected MissingArgument, got: {other:?}"),
        }
    }

    #[test]
    fn type_mismatch() {
        match args().get::<String>("salt_size").unwrap_err() {
            WireboxError::TypeMismatch { expected, .. } => assert!(expected.contains("String")),
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn deserialize_config_argument() {
        #[derive(Deserialize)]
        struct Pg {
            host: String,
            port: u16,
        }

        let pg: Pg = args().config("config").unwrap();
        assert_eq!(pg.host, "localhost");
        assert_eq!(pg.port, 5432);
    }

    #[test]
    fn invalid_config_argument() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            bucket: String,
        }

        let err = args().config::<Wrong>("config").unwrap_err();
        assert!(matches!(err, WireboxError::InvalidConfiguration { .. }));
    }

    #[test]
    fn argument_references() {
        assert_eq!(Argument::provider("database").reference().map(|n| n.as_str()), Some("database"));
        assert_eq!(Argument::delegate("photo").reference().map(|n| n.as_str()), Some("photo"));
        assert!(Argument::value(1u8).reference().is_none());
        assert_eq!(format!("{:?}", Argument::delegate("photo")), "Delegate(photo)");
    }
}
