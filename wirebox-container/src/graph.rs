//! Dependency graph validation.
//!
//! Run by [`ContainerBuilder::build()`](crate::container::ContainerBuilder::build)
//! and [`Container::validate()`](crate::container::Container::validate):
//! - Every provider reference names a declared provider (dotted references
//!   must start with a declared Configuration provider)
//! - Every delegate reference names a declared provider
//! - Provider references contain no cycles
//!
//! Delegate references are not edges: a delegate is never built while its
//! receiver is being resolved, so it cannot close a cycle.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};
use wirebox_support::rendering::suggest_similar;

use crate::argument::Argument;
use crate::error::{CircularDependencyError, UnknownProviderError, WireboxError};
use crate::kind::ProviderKind;
use crate::name::ProviderName;

/// What validation needs to know about one provider.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    pub name: ProviderName,
    pub kind: ProviderKind,
    /// Providers resolved while building this one
    pub dependencies: Vec<ProviderName>,
    /// Providers handed over unbuilt
    pub delegates: Vec<ProviderName>,
}

impl DependencyInfo {
    pub fn new<'a>(
        name: ProviderName,
        kind: ProviderKind,
        arguments: impl Iterator<Item = &'a Argument>,
    ) -> Self {
        let mut dependencies = Vec::new();
        let mut delegates = Vec::new();
        for argument in arguments {
            match argument {
                Argument::Provider(target) => dependencies.push(target.clone()),
                Argument::Delegate(target) => delegates.push(target.clone()),
                Argument::Literal(_) => {}
            }
        }
        Self { name, kind, dependencies, delegates }
    }
}

/// Validates the provider graph.
///
/// # Algorithm
/// Depth-first search from every provider in declaration order, keeping
/// the current path to report the cycle that closes it.
pub(crate) struct GraphValidator {
    order: Vec<ProviderName>,
    providers: HashMap<ProviderName, DependencyInfo>,
    visiting: HashSet<ProviderName>,
    validated: HashSet<ProviderName>,
    path: Vec<ProviderName>,
}

impl GraphValidator {
    /// Creates a validator; `infos` is expected in declaration order.
    pub fn new(infos: Vec<DependencyInfo>) -> Self {
        let order = infos.iter().map(|info| info.name.clone()).collect();
        let providers = infos.into_iter().map(|info| (info.name.clone(), info)).collect();
        Self {
            order,
            providers,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates the whole graph.
    ///
    /// # Errors
    /// - [`WireboxError::UnknownProvider`]: dangling reference
    /// - [`WireboxError::CircularDependency`]: cycle through provider references
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), WireboxError> {
        debug!(provider_count = self.order.len(), "Starting provider graph validation");

        for name in self.order.clone() {
            self.validate_name(&name)?;
        }

        debug!("Provider graph validation passed ✓");
        Ok(())
    }

    fn validate_name(&mut self, name: &ProviderName) -> Result<(), WireboxError> {
        if self.validated.contains(name) {
            return Ok(());
        }

        if self.visiting.contains(name) {
            let cycle_start = self.path.iter().position(|n| n == name).unwrap_or(0);
            let mut chain: Vec<ProviderName> = self.path[cycle_start..].to_vec();
            chain.push(name.clone());

            warn!(cycle = ?chain, "Circular dependency detected!");
            return Err(WireboxError::CircularDependency(CircularDependencyError { chain }));
        }

        let Some(info) = self.providers.get(name).cloned() else {
            if self.is_configuration_path(name) {
                self.validated.insert(name.clone());
                return Ok(());
            }
            return Err(self.unknown(name));
        };

        self.visiting.insert(name.clone());
        self.path.push(name.clone());

        for delegate in &info.delegates {
            if !self.providers.contains_key(delegate) {
                return Err(self.unknown(delegate));
            }
        }

        for dependency in &info.dependencies {
            self.validate_name(dependency)?;
        }

        self.path.pop();
        self.visiting.remove(name);
        self.validated.insert(name.clone());

        Ok(())
    }

    fn is_configuration_path(&self, name: &ProviderName) -> bool {
        name.split_path()
            .and_then(|(head, _)| self.providers.get(head))
            .is_some_and(|info| info.kind == ProviderKind::Configuration)
    }

    fn unknown(&self, name: &ProviderName) -> WireboxError {
        let declared: Vec<&str> = self.order.iter().map(ProviderName::as_str).collect();
        WireboxError::UnknownProvider(UnknownProviderError {
            requested: name.clone(),
            required_by: self.path.last().cloned(),
            suggestions: suggest_similar(name.as_str(), &declared, 3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, kind: ProviderKind, args: Vec<Argument>) -> DependencyInfo {
        DependencyInfo::new(ProviderName::new(name), kind, args.iter())
    }

    fn validate(infos: Vec<DependencyInfo>) -> Result<(), WireboxError> {
        GraphValidator::new(infos).validate()
    }

    #[test]
    fn valid_simple_graph() {
        let result = validate(vec![
            info("database", ProviderKind::Singleton, vec![]),
            info("profile_mapper", ProviderKind::Singleton, vec![Argument::provider("database")]),
            info("web_handle", ProviderKind::Factory, vec![Argument::provider("profile_mapper")]),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn detect_circular_dependency() {
        let result = validate(vec![
            info("a", ProviderKind::Factory, vec![Argument::provider("b")]),
            info("b", ProviderKind::Factory, vec![Argument::provider("c")]),
            info("c", ProviderKind::Factory, vec![Argument::provider("a")]),
        ]);

        match result.unwrap_err() {
            WireboxError::CircularDependency(err) => {
                let chain: Vec<_> = err.chain.iter().map(|n| n.to_string()).collect();
                assert_eq!(chain, vec!["a", "b", "c", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn delegates_do_not_close_cycles() {
        let result = validate(vec![
            info("users_manager", ProviderKind::Singleton, vec![Argument::delegate("user")]),
            info("user", ProviderKind::Factory, vec![Argument::provider("users_manager")]),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn detect_missing_dependency() {
        let result = validate(vec![
            info("database", ProviderKind::Singleton, vec![]),
            info("photo_mapper", ProviderKind::Singleton, vec![Argument::provider("databse")]),
        ]);

        match result.unwrap_err() {
            WireboxError::UnknownProvider(err) => {
                assert_eq!(err.requested, "databse");
                assert_eq!(err.required_by.as_ref().map(|n| n.as_str()), Some("photo_mapper"));
                assert_eq!(err.suggestions, vec!["database"]);
            }
            other => panic!("Expected UnknownProvider, got: {other:?}"),
        }
    }

    #[test]
    fn detect_missing_delegate() {
        let result = validate(vec![info(
            "photo_mapper",
            ProviderKind::Singleton,
            vec![Argument::delegate("photo_model_factory")],
        )]);
        assert!(matches!(result, Err(WireboxError::UnknownProvider(_))));
    }

    #[test]
    fn configuration_paths_are_leaves() {
        let result = validate(vec![
            info("config", ProviderKind::Configuration, vec![]),
            info("database", ProviderKind::Singleton, vec![Argument::provider("config.pgsql")]),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn dotted_path_needs_configuration_head() {
        let result = validate(vec![
            info("settings", ProviderKind::Value, vec![]),
            info("database", ProviderKind::Singleton, vec![Argument::provider("settings.pgsql")]),
        ]);
        assert!(matches!(result, Err(WireboxError::UnknownProvider(_))));
    }

    #[test]
    fn diamond_dependency_ok() {
        //     a
        //    / \
        //   b   c
        //    \ /
        //     d
        let result = validate(vec![
            info("d", ProviderKind::Singleton, vec![]),
            info("b", ProviderKind::Singleton, vec![Argument::provider("d")]),
            info("c", ProviderKind::Factory, vec![Argument::provider("d")]),
            info("a", ProviderKind::Factory, vec![Argument::provider("b"), Argument::provider("c")]),
        ]);
        assert!(result.is_ok());
    }
}
