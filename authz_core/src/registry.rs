//! Compile-time plugin registry.
//!
//! Each plugin crate registers a factory per catalog provider it serves. The
//! registry hands back one fresh plugin instance per catalog configuration;
//! callers own that instance and pass it to whatever needs it.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::config::AuthorizationConfig;
use crate::error::AuthorizationError;
use crate::logging::debug;
use crate::plugin::AuthorizationPlugin;

/// Builds a plugin from a catalog's authorization config.
pub type PluginFactory = fn(&AuthorizationConfig) -> Result<Box<dyn AuthorizationPlugin>>;

/// Maps catalog provider names to plugin factories.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a factory for a provider. A later registration for the same
    /// provider replaces the earlier one.
    pub fn register<S: Into<String>>(&mut self, provider: S, factory: PluginFactory) {
        let provider = provider.into();
        debug!("registering authorization plugin for {provider}");
        self.factories.insert(provider, factory);
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut providers: Vec<_> = self.factories.keys().map(|p| p.as_str()).collect();
        providers.sort_unstable();
        providers
    }

    /// Build the plugin for the config's provider.
    pub fn create(&self, config: &AuthorizationConfig) -> Result<Box<dyn AuthorizationPlugin>> {
        let factory = self.factories.get(&config.provider).ok_or_else(|| {
            AuthorizationError::InvalidConfig(format!(
                "no authorization plugin for provider {:?}; known providers: {:?}",
                config.provider,
                self.providers()
            ))
        })?;
        factory(config).with_context(|| {
            format!(
                "creating authorization plugin for provider {}",
                config.provider
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::metadata::MetadataObject;
    use crate::role::{Group, Owner, Role, RoleChange, User};

    struct Noop;

    #[async_trait]
    impl AuthorizationPlugin for Noop {
        async fn on_role_created(&self, _: &Role) -> Result<bool> {
            Ok(true)
        }
        async fn on_role_acquired(&self, _: &Role) -> Result<bool> {
            Ok(true)
        }
        async fn on_role_deleted(&self, _: &Role) -> Result<bool> {
            Ok(true)
        }
        async fn on_role_updated(&self, _: &Role, _: &[RoleChange]) -> Result<bool> {
            Ok(true)
        }
        async fn on_owner_set(
            &self,
            _: &MetadataObject,
            _: Option<&Owner>,
            _: &Owner,
        ) -> Result<bool> {
            Ok(true)
        }
        async fn on_granted_roles_to_user(&self, _: &[Role], _: &User) -> Result<bool> {
            Ok(true)
        }
        async fn on_revoked_roles_from_user(&self, _: &[Role], _: &User) -> Result<bool> {
            Ok(true)
        }
        async fn on_granted_roles_to_group(&self, _: &[Role], _: &Group) -> Result<bool> {
            Ok(true)
        }
        async fn on_revoked_roles_from_group(&self, _: &[Role], _: &Group) -> Result<bool> {
            Ok(true)
        }
        async fn on_user_added(&self, _: &User) -> Result<bool> {
            Ok(true)
        }
        async fn on_user_removed(&self, _: &User) -> Result<bool> {
            Ok(true)
        }
        async fn on_user_acquired(&self, _: &User) -> Result<bool> {
            Ok(false)
        }
        async fn on_group_added(&self, _: &Group) -> Result<bool> {
            Ok(true)
        }
        async fn on_group_removed(&self, _: &Group) -> Result<bool> {
            Ok(true)
        }
        async fn on_group_acquired(&self, _: &Group) -> Result<bool> {
            Ok(true)
        }
    }

    fn noop(_: &AuthorizationConfig) -> Result<Box<dyn AuthorizationPlugin>> {
        Ok(Box::new(Noop))
    }

    #[tokio::test]
    async fn registered_provider_creates_a_plugin() -> Result<()> {
        let mut registry = PluginRegistry::new();
        registry.register("hive", noop);
        let plugin = registry.create(&AuthorizationConfig::new("hive", Default::default()))?;
        assert!(!plugin.on_user_acquired(&User::new("alice")).await?);
        Ok(())
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let mut registry = PluginRegistry::new();
        registry.register("hive", noop);
        registry.register("hadoop", noop);
        let err = registry
            .create(&AuthorizationConfig::new("kafka", Default::default()))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::InvalidConfig(_))
        ));
        assert_eq!(registry.providers(), vec!["hadoop", "hive"]);
    }
}
