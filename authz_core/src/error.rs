//! Typed failures surfaced by authorization plugins.
//!
//! Plugins return `anyhow::Result`; callers that need to distinguish failure
//! kinds can `downcast_ref::<AuthorizationError>()` on the error.

use thiserror::Error;

use crate::metadata::MetadataObjectType;
use crate::privileges::PrivilegeName;

/// The errors an authorization plugin raises on its own (as opposed to
/// transport failures from the external system, which are propagated as-is).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Required configuration values are absent.
    #[error("authorization config missing required fields: {missing:?}")]
    Config {
        /// Every missing key.
        missing: Vec<String>,
    },
    /// A configuration value is present but unusable.
    #[error("invalid authorization config: {0}")]
    InvalidConfig(String),
    /// More than one managed policy matched a metadata object.
    #[error("metadata object {object} matches {count} managed policies, expected at most one")]
    AmbiguousManagedPolicy {
        /// Full name of the metadata object.
        object: String,
        /// How many managed policies matched.
        count: usize,
    },
    /// A managed policy breaks the one-access-type-per-item rule.
    #[error("managed policy {policy} is corrupt: {reason}")]
    CorruptManagedPolicy {
        /// Name of the offending policy.
        policy: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The target system has no mapping for a privilege.
    #[error("privilege {privilege} is not supported{}", .object_type.map(|t| format!(" on {t}")).unwrap_or_default())]
    PrivilegeNotSupported {
        /// The privilege.
        privilege: PrivilegeName,
        /// The object type it was requested on, if that is what was wrong.
        object_type: Option<MetadataObjectType>,
    },
    /// A metadata object can't be expressed in the target system.
    #[error("metadata object {object} is not supported: {reason}")]
    UnsupportedObject {
        /// Full name of the metadata object.
        object: String,
        /// Why it can't be expressed.
        reason: String,
    },
    /// A malformed metadata object or securable object.
    #[error("invalid metadata object: {0}")]
    InvalidMetadataObject(String),
    /// A role change that breaks its construction invariants.
    #[error("invalid role change: {0}")]
    InvalidRoleChange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_not_supported_message_names_the_object_type() {
        let err = AuthorizationError::PrivilegeNotSupported {
            privilege: PrivilegeName::CreateTable,
            object_type: Some(MetadataObjectType::Table),
        };
        assert_eq!(
            err.to_string(),
            "privilege CREATE_TABLE is not supported on TABLE"
        );
    }

    #[test]
    fn errors_survive_a_trip_through_anyhow() {
        let err: anyhow::Error = AuthorizationError::AmbiguousManagedPolicy {
            object: "catalog.db1".to_owned(),
            count: 2,
        }
        .into();
        let err = err.context("finding policy");
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::AmbiguousManagedPolicy { count: 2, .. })
        ));
    }
}
