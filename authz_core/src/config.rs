//! Authorization plugin configuration.
//!
//! A catalog's authorization config names the catalog provider (which picks
//! the plugin) and carries a flat map of plugin properties:
//!
//! ```yaml
//! provider: hive
//! properties:
//!   authorization.ranger.admin.url: http://ranger:6080
//!   authorization.ranger.service.name: hiveDev
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use yaml_peg::serde as yaml;

use crate::error::AuthorizationError;

/// Config for one catalog's authorization plugin.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    /// The catalog provider, e.g. `hive` or `hadoop`.
    pub provider: String,
    /// Plugin-specific properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl AuthorizationConfig {
    /// Basic constructor
    pub fn new<S: Into<String>>(provider: S, properties: HashMap<String, String>) -> Self {
        Self {
            provider: provider.into(),
            properties,
        }
    }

    /// Read a config from a yaml file.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path).context("Reading file")?;
        Self::from_yaml(&raw)
    }

    /// Parse a config from yaml.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let mut config =
            yaml::from_str::<AuthorizationConfig>(raw).context("Deserializing config")?;
        config.pop().ok_or_else(|| anyhow!["empty authorization config"])
    }

    /// Get an optional property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    /// Get every listed property, failing with the full list of absent (or
    /// blank) keys if any are missing.
    pub fn required<'a>(&'a self, keys: &[&str]) -> Result<Vec<&'a str>> {
        let mut values = Vec::with_capacity(keys.len());
        let mut missing = vec![];
        for key in keys {
            match self.get(key) {
                Some(v) if !v.trim().is_empty() => values.push(v),
                _ => missing.push(key.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(AuthorizationError::Config { missing }.into());
        }
        Ok(values)
    }

    /// Parse an optional property, falling back to `default` when it is
    /// absent.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                AuthorizationError::InvalidConfig(format!("{key} = {raw:?}: {e}")).into()
            }),
        }
    }
}
