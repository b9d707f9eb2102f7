//! Configuration providers.
//!
//! A [`Configuration`] is a shared handle over a layered
//! [`Figment`](figment::Figment): defaults underneath, then sources in the
//! order they were added (in-memory JSON, JSON strings, prefixed
//! environment variables, or any other figment provider). It is declared
//! like any other provider and can be loaded afterwards; nothing is read
//! until something resolves it.
//!
//! Dictionaries are merged key by key, anything else is replaced by the
//! later layer.
//!
//! # Examples
//! ```
//! use wirebox_container::configuration::Configuration;
//! use serde_json::json;
//!
//! let config = Configuration::new();
//! config.set_default("debug", json!(false));
//! config.set(json!({ "pgsql": { "host": "db", "port": 5432 } }));
//!
//! assert_eq!(config.get("pgsql.port"), Some(json!(5432)));
//! assert_eq!(config.get("debug"), Some(json!(false)));
//! assert_eq!(config.get("redis"), None);
//! ```

use std::fmt;
use std::sync::Arc;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigurationMissingError, Result, WireboxError};
use crate::name::ProviderName;

/// Something that can answer `get(path) -> value | missing`.
///
/// `path` is dotted; an empty path means the whole tree.
pub trait ConfigSource: Send + Sync {
    fn get(&self, path: &str) -> Option<Value>;
}

impl ConfigSource for Figment {
    fn get(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return self
                .extract::<Value>()
                .ok()
                .filter(|tree| tree.as_object().is_none_or(|map| !map.is_empty()));
        }
        self.find_value(path).ok()?.deserialize().ok()
    }
}

struct ConfigState {
    defaults: Figment,
    sources: Figment,
    labels: Vec<String>,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            defaults: Figment::new(),
            sources: Figment::new(),
            labels: Vec::new(),
        }
    }
}

/// Shared, late-bound configuration tree.
///
/// Clones share the same state, so a handle kept by application startup
/// code can be loaded after the provider was declared.
#[derive(Clone, Default)]
pub struct Configuration {
    state: Arc<RwLock<ConfigState>>,
}

impl Configuration {
    /// An empty configuration: every lookup misses until something is loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with one in-memory source.
    pub fn from_value(value: Value) -> Self {
        let config = Self::new();
        config.set(value);
        config
    }

    /// Replaces all sources with `value`. Defaults are kept.
    pub fn set(&self, value: Value) {
        let mut state = self.state.write();
        state.sources = Figment::new().merge(Serialized::defaults(value));
        state.labels = vec![String::from("json")];
        debug!("Configuration replaced");
    }

    /// Layers `value` over the current sources; dictionaries merge key by key.
    pub fn merge(&self, value: Value) {
        self.add_source("json", Serialized::defaults(value));
    }

    /// Adds any figment provider on top of the existing sources.
    ///
    /// ```rust,ignore
    /// config.add_source("settings.toml", figment::providers::Toml::file("settings.toml"));
    /// ```
    pub fn add_source(&self, label: impl Into<String>, provider: impl figment::Provider) {
        let label = label.into();
        let mut state = self.state.write();
        let sources = std::mem::replace(&mut state.sources, Figment::new());
        state.sources = sources.merge(provider);
        debug!(source = %label, "Configuration source added");
        state.labels.push(label);
    }

    /// Parses `json` and adds it as a source.
    pub fn load_json_str(&self, json: &str) -> Result<()> {
        serde_json::from_str::<Value>(json).map_err(|source| WireboxError::InvalidConfiguration {
            path: String::new(),
            source,
        })?;
        self.add_source("json", Json::string(json));
        Ok(())
    }

    /// Adds the process environment under `prefix` as a source.
    ///
    /// `PREFIX__PGSQL__HOST=db` answers the path `pgsql.host`. Variables
    /// are read once, by this call.
    pub fn load_env(&self, prefix: &str) {
        let marker = format!("{}__", prefix.to_uppercase());
        self.add_source(format!("env:{prefix}"), Env::prefixed(&marker).split("__"));
    }

    /// Sets a fallback used when no source has a value at `path`.
    pub fn set_default(&self, path: &str, value: Value) {
        let mut state = self.state.write();
        let defaults = std::mem::replace(&mut state.defaults, Figment::new());
        state.defaults = defaults.merge(Serialized::default(path, value));
    }

    /// Returns `true` once at least one source has been added.
    pub fn is_loaded(&self) -> bool {
        !self.state.read().labels.is_empty()
    }

    /// Defaults and sources merged into one figment, e.g. to extract a
    /// typed settings struct.
    pub fn figment(&self) -> Figment {
        let state = self.state.read();
        state.defaults.clone().merge(state.sources.clone())
    }

    /// Looks up a dotted path (empty for the whole tree).
    pub fn get(&self, path: &str) -> Option<Value> {
        ConfigSource::get(&self.figment(), path)
    }

    /// Like [`get`](Self::get), but a miss is a `ConfigurationMissing` error
    /// attributed to `provider`.
    pub(crate) fn require(&self, provider: &ProviderName, path: &str) -> Result<Value> {
        self.get(path).ok_or_else(|| {
            WireboxError::ConfigurationMissing(ConfigurationMissingError {
                provider: provider.clone(),
                path: path.to_string(),
            })
        })
    }
}

impl ConfigSource for Configuration {
    fn get(&self, path: &str) -> Option<Value> {
        Configuration::get(self, path)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Configuration")
            .field("sources", &state.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn empty_configuration_misses() {
        let config = Configuration::new();
        assert!(!config.is_loaded());
        assert_eq!(config.get(""), None);
        assert_eq!(config.get("pgsql"), None);
    }

    #[test]
    fn nested_lookup() {
        let config = Configuration::from_value(json!({
            "pgsql": { "host": "db", "port": 5432 },
            "hosts": ["a", "b"],
        }));

        assert_eq!(config.get("pgsql.host"), Some(json!("db")));
        assert_eq!(config.get("hosts"), Some(json!(["a", "b"])));
        assert_eq!(config.get("pgsql.user"), None);
        assert!(config.is_loaded());
    }

    #[test]
    fn later_sources_win_and_objects_merge() {
        let config = Configuration::from_value(json!({ "pgsql": { "host": "db", "port": 5432 } }));
        config.merge(json!({ "pgsql": { "host": "replica" } }));

        assert_eq!(config.get("pgsql"), Some(json!({ "host": "replica", "port": 5432 })));
    }

    #[test]
    fn defaults_fill_gaps() {
        let config = Configuration::new();
        config.set_default("debug", json!(false));
        config.set_default("s3.region", json!("eu-west-1"));
        config.set(json!({ "s3": { "bucket": "photos" } }));

        assert_eq!(config.get("debug"), Some(json!(false)));
        assert_eq!(config.get("s3"), Some(json!({ "region": "eu-west-1", "bucket": "photos" })));
    }

    #[test]
    fn set_replaces_sources() {
        let config = Configuration::from_value(json!({ "port": 80 }));
        config.set(json!({ "host": "0.0.0.0" }));
        assert_eq!(config.get("port"), None);
    }

    #[test]
    fn clones_share_state() {
        let config = Configuration::new();
        let handle = config.clone();
        handle.set(json!({ "debug": true }));
        assert_eq!(config.get("debug"), Some(json!(true)));
    }

    #[test]
    fn json_string_source() {
        let config = Configuration::new();
        config.load_json_str(r#"{ "redis": { "port": 6379 } }"#).unwrap();
        assert_eq!(config.get("redis.port"), Some(json!(6379)));

        let err = config.load_json_str("{ nope").unwrap_err();
        assert!(matches!(err, WireboxError::InvalidConfiguration { .. }));
    }

    #[test]
    fn env_overrides_json() {
        Jail::expect_with(|jail| {
            jail.set_env("APP__PGSQL__HOST", "prod-db");
            jail.set_env("APP__DEBUG", "true");
            jail.set_env("OTHER__DEBUG", "false");

            let config = Configuration::from_value(json!({ "pgsql": { "host": "db", "port": 5432 } }));
            config.load_env("app");

            assert_eq!(config.get("pgsql.host"), Some(json!("prod-db")));
            assert_eq!(config.get("pgsql.port"), Some(json!(5432)));
            assert_eq!(config.get("debug"), Some(json!(true)));
            assert_eq!(config.get("other"), None);
            Ok(())
        });
    }

    #[test]
    fn typed_extraction() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct PgSettings {
            host: String,
            port: u16,
        }

        let config = Configuration::new();
        config.set_default("pgsql.port", json!(5432));
        config.merge(json!({ "pgsql": { "host": "db" } }));

        let settings: PgSettings = config.figment().extract_inner("pgsql").unwrap();
        assert_eq!(settings, PgSettings { host: "db".into(), port: 5432 });
    }

    #[test]
    fn require_reports_path() {
        let config = Configuration::new();
        match config.require(&ProviderName::new("config"), "s3.bucket").unwrap_err() {
            WireboxError::ConfigurationMissing(err) => {
                assert_eq!(err.provider, "config");
                assert_eq!(err.path, "s3.bucket");
            }
            other => panic!("Expected ConfigurationMissing, got: {other:?}"),
        }
    }
}
