//! Error types for container operations.
//!
//! Every failure names the provider it happened in, and the common
//! wiring mistakes (typos, cycles, missing settings) come with a hint.

use std::fmt;

use wirebox_support::rendering::render_chain;

use crate::kind::ProviderKind;
use crate::name::ProviderName;

/// Boxed error returned by construction targets.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all wirebox operations.
#[derive(Debug, thiserror::Error)]
pub enum WireboxError {
    /// Requested provider was never declared.
    #[error("{}", .0)]
    UnknownProvider(UnknownProviderError),

    /// A provider was re-entered while it was still being resolved.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A configuration path has no value in any source and no default.
    #[error("{}", .0)]
    ConfigurationMissing(ConfigurationMissingError),

    /// The provider's target returned an error.
    #[error("Failed to construct {provider}: {source}")]
    ConstructionFailed {
        provider: ProviderName,
        #[source]
        source: BoxError,
    },

    /// A resolved instance is not of the requested type.
    #[error("Type mismatch for {provider}: expected {expected}")]
    TypeMismatch {
        provider: ProviderName,
        expected: &'static str,
    },

    /// A target asked for an argument that was never bound.
    #[error("Missing argument {argument} for {provider}")]
    MissingArgument {
        provider: ProviderName,
        argument: String,
    },

    /// Configuration could not be parsed or deserialized.
    #[error("Invalid configuration at {path:?}: {source}")]
    InvalidConfiguration {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Only providers with a target have arguments to override.
    #[error("Cannot override arguments of {provider}: {kind} providers have no bound arguments")]
    InvalidOverride {
        provider: ProviderName,
        kind: ProviderKind,
    },

    /// A delegate outlived the container it was resolved from.
    #[error("Delegate for {provider} was invoked after its container was dropped")]
    ContainerDropped { provider: ProviderName },
}

/// Error when a provider name is not declared.
///
/// Includes "did you mean" suggestions from the declared names.
#[derive(Debug)]
pub struct UnknownProviderError {
    /// The name that was requested
    pub requested: ProviderName,
    /// The provider whose arguments referenced it (if any)
    pub required_by: Option<ProviderName>,
    /// Declared names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnknownProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown provider: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(f, "\n  Hint: Did you forget to declare {:?}?", self.requested.as_str())
    }
}

/// Error when resolution runs into a cycle.
///
/// The chain starts and ends with the same provider.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: `["users_manager", "photos_manager", "users_manager"]`
    pub chain: Vec<ProviderName>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: Pass one side as a delegate (Argument::delegate) so it is built on demand"
        )
    }
}

/// Error when a configuration path has no value.
#[derive(Debug)]
pub struct ConfigurationMissingError {
    /// The Configuration provider that was consulted
    pub provider: ProviderName,
    /// Dotted path inside it; empty for the whole tree
    pub path: String,
}

impl fmt::Display for ConfigurationMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "Configuration {} has no values loaded", self.provider)?;
        } else {
            write!(f, "Configuration value missing: {}.{}", self.provider, self.path)?;
        }
        write!(
            f,
            "\n  Hint: Load a source before resolving, or call set_default({:?}, ..)",
            self.path
        )
    }
}

/// Convenient Result type for wirebox operations.
pub type Result<T> = std::result::Result<T, WireboxError>;
