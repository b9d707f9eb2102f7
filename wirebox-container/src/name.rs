//! Provider names.
//!
//! [`ProviderName`] identifies a provider within a container. Names are
//! plain strings; a dotted name such as `config.pgsql.host` addresses a
//! sub-path of the Configuration provider named `config` when no provider
//! is declared under the full dotted name.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name of a provider inside a container.
///
/// Cheap to clone (shared `Arc<str>`), hashes like `str` so maps keyed by
/// `ProviderName` can be queried with a `&str`.
///
/// # Examples
/// ```
/// use wirebox_container::name::ProviderName;
///
/// let name = ProviderName::new("config.pgsql.host");
/// assert_eq!(name.split_path(), Some(("config", "pgsql.host")));
///
/// let plain = ProviderName::from("database");
/// assert_eq!(plain.split_path(), None);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderName(Arc<str>);

impl ProviderName {
    /// Creates a name from anything string-like.
    #[inline]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits a dotted name into its head provider and the remaining path.
    ///
    /// Returns `None` for names without a dot, or when either side of the
    /// first dot is empty.
    pub fn split_path(&self) -> Option<(&str, &str)> {
        let (head, rest) = self.0.split_once('.')?;
        if head.is_empty() || rest.is_empty() {
            return None;
        }
        Some((head, rest))
    }
}

impl From<&str> for ProviderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ProviderName> for ProviderName {
    fn from(name: &ProviderName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for ProviderName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProviderName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ProviderName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderName({:?})", &*self.0)
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_content() {
        assert_eq!(ProviderName::new("database"), ProviderName::from(String::from("database")));
        assert_ne!(ProviderName::new("database"), ProviderName::new("redis"));
    }

    #[test]
    fn compares_with_str() {
        assert!(ProviderName::new("s3") == "s3");
    }

    #[test]
    fn map_lookup_by_str() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ProviderName::new("database"), 1);
        map.insert(ProviderName::new("redis"), 2);
        assert_eq!(map.get("redis"), Some(&2));
        assert_eq!(map.get("s3"), None);
    }

    #[test]
    fn split_dotted() {
        let name = ProviderName::new("config.s3");
        assert_eq!(name.split_path(), Some(("config", "s3")));
    }

    #[test]
    fn split_rejects_empty_segments() {
        assert_eq!(ProviderName::new(".pgsql").split_path(), None);
        assert_eq!(ProviderName::new("config.").split_path(), None);
    }

    #[test]
    fn display_is_bare() {
        assert_eq!(format!("{}", ProviderName::new("logger")), "logger");
        assert_eq!(format!("{:?}", ProviderName::new("logger")), "ProviderName(\"logger\")");
    }
}
