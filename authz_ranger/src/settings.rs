//! Plugin settings read from a catalog's authorization config.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Error, Result};
use authz_core::{AuthorizationConfig, AuthorizationError};
use url::Url;

use crate::consts;
use crate::creds::RangerCredentials;
use crate::dialect::ServiceType;

/// How catalog roles show up in policy items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrantMode {
    /// Items list the catalog roles that grant them, and every catalog role
    /// is mirrored into a native Ranger role.
    #[default]
    Role,
    /// Items carry the `{OWNER}` placeholder user instead of a role.
    OwnerPlaceholder,
}

impl FromStr for GrantMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "role" => Ok(GrantMode::Role),
            "owner-placeholder" => Ok(GrantMode::OwnerPlaceholder),
            other => bail!("unknown grant mode {other:?}; expected role or owner-placeholder"),
        }
    }
}

impl Display for GrantMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantMode::Role => write!(f, "role"),
            GrantMode::OwnerPlaceholder => write!(f, "owner-placeholder"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RangerSettings {
    pub(crate) admin_url: Url,
    pub(crate) credentials: RangerCredentials,
    pub(crate) service_name: String,
    pub(crate) service_type: ServiceType,
    pub(crate) request_timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) grant_mode: GrantMode,
    pub(crate) hdfs_root: String,
}

impl RangerSettings {
    /// Validate the config and pull out everything the plugin needs.
    ///
    /// Every missing required key is reported at once. `default_service_type`
    /// applies when the config doesn't name one.
    pub(crate) fn from_config(
        config: &AuthorizationConfig,
        default_service_type: ServiceType,
    ) -> Result<Self> {
        let required = config.required(&[
            consts::ADMIN_URL,
            consts::AUTH_TYPE,
            consts::USERNAME,
            consts::PASSWORD,
            consts::SERVICE_NAME,
        ])?;
        let [admin_url, auth_type, username, password, service_name] = required[..] else {
            bail!("config lookup returned the wrong number of values");
        };

        let admin_url = Url::parse(admin_url)
            .with_context(|| format!("parsing {}", consts::ADMIN_URL))?;
        if !matches!(admin_url.scheme(), "http" | "https") {
            return Err(AuthorizationError::InvalidConfig(format!(
                "{} must be an http(s) url, got {admin_url}",
                consts::ADMIN_URL
            ))
            .into());
        }
        if !auth_type.eq_ignore_ascii_case("simple") {
            return Err(AuthorizationError::InvalidConfig(format!(
                "{} {auth_type:?} is not supported; use simple",
                consts::AUTH_TYPE
            ))
            .into());
        }

        Ok(Self {
            admin_url,
            credentials: RangerCredentials::new(username, password),
            service_name: service_name.to_owned(),
            service_type: config.parse_or(consts::SERVICE_TYPE, default_service_type)?,
            request_timeout: Duration::from_secs(
                config.parse_or(consts::REQUEST_TIMEOUT_SECS, 30u64)?,
            ),
            max_retries: config.parse_or(consts::RETRY_MAX, 3u32)?,
            grant_mode: config.parse_or(consts::GRANT_MODE, GrantMode::default())?,
            hdfs_root: config.get(consts::HDFS_ROOT).unwrap_or("/").to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn config(extra: &[(&str, &str)]) -> AuthorizationConfig {
        let mut properties = hashmap! {
            consts::ADMIN_URL.to_owned() => "http://localhost:6080".to_owned(),
            consts::AUTH_TYPE.to_owned() => "simple".to_owned(),
            consts::USERNAME.to_owned() => "admin".to_owned(),
            consts::PASSWORD.to_owned() => "rangerR0cks!".to_owned(),
            consts::SERVICE_NAME.to_owned() => "hiveDev".to_owned(),
        };
        for (k, v) in extra {
            properties.insert(k.to_string(), v.to_string());
        }
        AuthorizationConfig::new("hive", properties)
    }

    #[test]
    fn defaults_fill_optional_settings() -> Result<()> {
        let settings = RangerSettings::from_config(&config(&[]), ServiceType::HadoopSql)?;
        assert_eq!(settings.service_name, "hiveDev");
        assert_eq!(settings.service_type, ServiceType::HadoopSql);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.grant_mode, GrantMode::Role);
        assert_eq!(settings.hdfs_root, "/");
        Ok(())
    }

    #[test]
    fn optional_settings_are_read() -> Result<()> {
        let settings = RangerSettings::from_config(&config(&[
            (consts::SERVICE_TYPE, "hdfs"),
            (consts::GRANT_MODE, "owner-placeholder"),
            (consts::RETRY_MAX, "0"),
            (consts::HDFS_ROOT, "/warehouse"),
        ]), ServiceType::HadoopSql)?;
        assert_eq!(settings.service_type, ServiceType::Hdfs);
        assert_eq!(settings.grant_mode, GrantMode::OwnerPlaceholder);
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.hdfs_root, "/warehouse");
        Ok(())
    }

    #[test]
    fn every_missing_key_is_reported() {
        let config = AuthorizationConfig::new(
            "hive",
            hashmap! { consts::ADMIN_URL.to_owned() => "http://localhost:6080".to_owned() },
        );
        let err = RangerSettings::from_config(&config, ServiceType::HadoopSql).unwrap_err();
        match err.downcast_ref::<AuthorizationError>() {
            Some(AuthorizationError::Config { missing }) => assert_eq!(missing.len(), 4),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn kerberos_is_rejected() {
        let err = RangerSettings::from_config(
            &config(&[(consts::AUTH_TYPE, "kerberos")]),
            ServiceType::HadoopSql,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        assert!(RangerSettings::from_config(
            &config(&[(consts::ADMIN_URL, "ftp://ranger")]),
            ServiceType::HadoopSql,
        )
        .is_err());
    }

    #[test]
    fn the_default_service_type_can_be_overridden() -> Result<()> {
        let hadoop = RangerSettings::from_config(&config(&[]), ServiceType::Hdfs)?;
        assert_eq!(hadoop.service_type, ServiceType::Hdfs);
        let sql = RangerSettings::from_config(
            &config(&[(consts::SERVICE_TYPE, "hadoopsql")]),
            ServiceType::Hdfs,
        )?;
        assert_eq!(sql.service_type, ServiceType::HadoopSql);
        Ok(())
    }
}
