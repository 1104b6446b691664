//! Ranger authorization plugin
//!
//! Reflects catalog roles, ownership and grants into Apache Ranger policies.
//! Every metadata object maps to at most one Ranger policy labeled as
//! managed by the catalog. Roles granting privileges on the same object
//! share that policy, and each item records which roles (or which
//! placeholder principal) it was granted for.
//!
//! ```no_run
//! use authz_core::{AuthorizationConfig, PluginRegistry};
//!
//! let mut registry = PluginRegistry::new();
//! authz_ranger::register(&mut registry);
//! let config = AuthorizationConfig::read_from_file("authorization.yaml").unwrap();
//! let plugin = registry.create(&config).unwrap();
//! ```

mod consts;
mod creds;
mod dialect;
mod grants;
mod locator;
mod memory;
mod model;
mod reconciler;
mod rest;
mod settings;
mod store;

pub use consts::{MANAGED_BY_CATALOG, OWNER_PLACEHOLDER};
pub use dialect::{PathTranslator, PrivilegeMapping, ServiceType};
pub use memory::InMemoryRangerStore;
pub use model::*;
pub use reconciler::format_policy_name;
pub use rest::RangerRestClient;
pub use settings::GrantMode;
pub use store::{Creation, Deletion, Principal, PrincipalKind, RangerStore};

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use authz_core::logging::{debug, info};
use authz_core::metadata::MetadataObject;
use authz_core::registry::PluginFactory;
use authz_core::role::{Group, Owner, Role, RoleChange, User};
use authz_core::{log_runtime, AuthorizationConfig, AuthorizationPlugin, PluginRegistry};

use rest::RangerRestConfig;
use settings::RangerSettings;

/// Catalog providers whose tables live in a hadoop SQL Ranger service.
const SQL_PROVIDERS: &[&str] = &[
    "hive",
    "lakehouse-iceberg",
    "lakehouse-paimon",
    "lakehouse-hudi",
];
/// Catalog providers whose filesets live in an HDFS Ranger service.
const HDFS_PROVIDERS: &[&str] = &["hadoop"];

fn hadoop_sql_plugin(config: &AuthorizationConfig) -> Result<Box<dyn AuthorizationPlugin>> {
    let plugin = RangerAuthorizationPlugin::from_config(config, ServiceType::HadoopSql)?;
    Ok(Box::new(plugin))
}

fn hdfs_plugin(config: &AuthorizationConfig) -> Result<Box<dyn AuthorizationPlugin>> {
    let plugin = RangerAuthorizationPlugin::from_config(config, ServiceType::Hdfs)?;
    Ok(Box::new(plugin))
}

/// Register the Ranger plugin for every catalog provider it serves.
pub fn register(registry: &mut PluginRegistry) {
    for provider in SQL_PROVIDERS {
        registry.register(*provider, hadoop_sql_plugin as PluginFactory);
    }
    for provider in HDFS_PROVIDERS {
        registry.register(*provider, hdfs_plugin as PluginFactory);
    }
}

/// The Ranger plugin.
///
/// Holds no state besides its configuration; Ranger is read before every
/// change and written back in the same call.
pub struct RangerAuthorizationPlugin {
    store: Arc<dyn RangerStore>,
    service_name: String,
    grant_mode: GrantMode,
    privileges: PrivilegeMapping,
    paths: PathTranslator,
    /// Recorded as the grantor of native role grants.
    grantor: String,
}

impl RangerAuthorizationPlugin {
    /// Validates the config and sets up a Ranger admin client.
    ///
    /// `default_service_type` applies when the config doesn't set
    /// `authorization.ranger.service.type`.
    pub fn from_config(
        config: &AuthorizationConfig,
        default_service_type: ServiceType,
    ) -> Result<Self> {
        let settings = RangerSettings::from_config(config, default_service_type)
            .context("reading Ranger authorization config")?;
        let client = RangerRestClient::new(
            settings.admin_url.clone(),
            settings.credentials.clone(),
            RangerRestConfig {
                timeout: settings.request_timeout,
                max_retries: settings.max_retries,
            },
        )?;
        debug!(
            "Ranger plugin for service {} ({}) at {}",
            settings.service_name, settings.service_type, settings.admin_url
        );
        Ok(Self::with_store(
            Arc::new(client),
            settings.service_name,
            settings.service_type,
            settings.grant_mode,
        )
        .with_hdfs_root(settings.hdfs_root)
        .with_grantor(settings.credentials.username))
    }

    /// A plugin over any store, e.g. an [`InMemoryRangerStore`].
    pub fn with_store<S: Into<String>>(
        store: Arc<dyn RangerStore>,
        service_name: S,
        service_type: ServiceType,
        grant_mode: GrantMode,
    ) -> Self {
        Self {
            store,
            service_name: service_name.into(),
            grant_mode,
            privileges: PrivilegeMapping::for_service(service_type),
            paths: PathTranslator::new(service_type, "/"),
            grantor: "admin".to_owned(),
        }
    }

    /// Set the directory HDFS schemas live under.
    pub fn with_hdfs_root<S: Into<String>>(mut self, root: S) -> Self {
        self.paths = self.paths.with_root(root);
        self
    }

    /// Set the grantor recorded on native role grants.
    pub fn with_grantor<S: Into<String>>(mut self, grantor: S) -> Self {
        self.grantor = grantor.into();
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn grant_mode(&self) -> GrantMode {
        self.grant_mode
    }

    /// Find the managed policy for an object, if there is one.
    pub async fn find_policy(&self, object: &MetadataObject) -> Result<Option<RangerPolicy>> {
        self.find_managed_policy(object).await
    }
}

#[async_trait]
impl AuthorizationPlugin for RangerAuthorizationPlugin {
    async fn on_role_created(&self, role: &Role) -> Result<bool> {
        if self.grant_mode == GrantMode::Role {
            self.ensure_native_role(&role.name).await?;
        }
        log_runtime!(format!("granting role {}", role.name), {
            for object in &role.securable_objects {
                self.add_securable_object(role, object)
                    .await
                    .with_context(|| {
                        format!("granting role {} on {}", role.name, object.full_name())
                    })?;
            }
        });
        Ok(true)
    }

    async fn on_role_acquired(&self, role: &Role) -> Result<bool> {
        for object in &role.securable_objects {
            if self
                .find_managed_policy(object.metadata_object())
                .await?
                .is_none()
            {
                info!(
                    "role {}: no managed policy for {}",
                    role.name,
                    object.full_name()
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn on_role_deleted(&self, role: &Role) -> Result<bool> {
        log_runtime!(format!("removing role {}", role.name), {
            for object in &role.securable_objects {
                self.remove_securable_object(role, object)
                    .await
                    .with_context(|| {
                        format!("removing role {} from {}", role.name, object.full_name())
                    })?;
            }
        });
        if self.grant_mode == GrantMode::Role {
            self.drop_native_role(&role.name).await?;
        }
        Ok(true)
    }

    async fn on_role_updated(&self, role: &Role, changes: &[RoleChange]) -> Result<bool> {
        for change in changes {
            self.apply_change(role, change).await.with_context(|| {
                format!(
                    "updating role {} on {}",
                    role.name,
                    change.metadata_object().full_name()
                )
            })?;
        }
        Ok(true)
    }

    async fn on_owner_set(
        &self,
        object: &MetadataObject,
        previous: Option<&Owner>,
        new: &Owner,
    ) -> Result<bool> {
        self.set_owner(object, previous, new)
            .await
            .with_context(|| format!("setting the owner of {} to {}", object, new.name))?;
        Ok(true)
    }

    async fn on_granted_roles_to_user(&self, roles: &[Role], user: &User) -> Result<bool> {
        self.grant_roles(roles, PrincipalKind::User, &user.name).await
    }

    async fn on_revoked_roles_from_user(&self, roles: &[Role], user: &User) -> Result<bool> {
        self.revoke_roles(roles, PrincipalKind::User, &user.name)
            .await
    }

    async fn on_granted_roles_to_group(&self, roles: &[Role], group: &Group) -> Result<bool> {
        self.grant_roles(roles, PrincipalKind::Group, &group.name)
            .await
    }

    async fn on_revoked_roles_from_group(&self, roles: &[Role], group: &Group) -> Result<bool> {
        self.revoke_roles(roles, PrincipalKind::Group, &group.name)
            .await
    }

    async fn on_user_added(&self, user: &User) -> Result<bool> {
        self.add_principal(PrincipalKind::User, &user.name).await
    }

    async fn on_user_removed(&self, user: &User) -> Result<bool> {
        self.remove_principal(PrincipalKind::User, &user.name).await
    }

    async fn on_user_acquired(&self, user: &User) -> Result<bool> {
        self.principal_exists(PrincipalKind::User, &user.name).await
    }

    async fn on_group_added(&self, group: &Group) -> Result<bool> {
        self.add_principal(PrincipalKind::Group, &group.name).await
    }

    async fn on_group_removed(&self, group: &Group) -> Result<bool> {
        self.remove_principal(PrincipalKind::Group, &group.name)
            .await
    }

    async fn on_group_acquired(&self, group: &Group) -> Result<bool> {
        self.principal_exists(PrincipalKind::Group, &group.name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn config(provider: &str) -> AuthorizationConfig {
        AuthorizationConfig::new(
            provider,
            hashmap! {
                consts::ADMIN_URL.to_owned() => "http://localhost:6080".to_owned(),
                consts::AUTH_TYPE.to_owned() => "simple".to_owned(),
                consts::USERNAME.to_owned() => "admin".to_owned(),
                consts::PASSWORD.to_owned() => "rangerR0cks!".to_owned(),
                consts::SERVICE_NAME.to_owned() => "hiveDev".to_owned(),
            },
        )
    }

    #[test]
    fn every_provider_is_registered() {
        let mut registry = PluginRegistry::new();
        register(&mut registry);
        assert_eq!(
            registry.providers(),
            vec![
                "hadoop",
                "hive",
                "lakehouse-hudi",
                "lakehouse-iceberg",
                "lakehouse-paimon"
            ]
        );
        assert!(registry.create(&config("hive")).is_ok());
        assert!(registry.create(&config("hadoop")).is_ok());
    }

    #[test]
    fn incomplete_config_fails_construction() {
        let mut registry = PluginRegistry::new();
        register(&mut registry);
        let config = AuthorizationConfig::new("hive", Default::default());
        assert!(registry.create(&config).is_err());
    }
}
