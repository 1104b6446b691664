//! Roles, the securable objects they hold privileges on, and the principals
//! roles are granted to.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::AuthorizationError;
use crate::metadata::{MetadataObject, MetadataObjectType};
use crate::privileges::Privilege;

/// A metadata object together with the privileges a role holds on it.
///
/// Securable objects are never changed in place. A change to the privileges
/// on an object is expressed as a replacement object (see
/// [`RoleChange::update_securable_object`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurableObject {
    #[serde(flatten)]
    object: MetadataObject,
    privileges: Vec<Privilege>,
}

impl SecurableObject {
    /// Create a securable object. Duplicate privileges are collapsed; the
    /// same privilege may not be both allowed and denied, and every
    /// privilege must be grantable on the object's type.
    pub fn new(object: MetadataObject, privileges: Vec<Privilege>) -> Result<Self> {
        let mut deduped: Vec<Privilege> = Vec::with_capacity(privileges.len());
        for privilege in privileges {
            if deduped.contains(&privilege) {
                continue;
            }
            if deduped.iter().any(|p| p.name == privilege.name) {
                return Err(AuthorizationError::InvalidMetadataObject(format!(
                    "{} is both allowed and denied on {}",
                    privilege.name,
                    object.full_name()
                ))
                .into());
            }
            if !privilege.name.can_bind_to(object.object_type()) {
                return Err(AuthorizationError::PrivilegeNotSupported {
                    privilege: privilege.name,
                    object_type: Some(object.object_type()),
                }
                .into());
            }
            deduped.push(privilege);
        }
        Ok(Self {
            object,
            privileges: deduped,
        })
    }

    /// Shorthand for parsing the metadata object and building the securable
    /// object in one go.
    pub fn parse(
        full_name: &str,
        object_type: MetadataObjectType,
        privileges: Vec<Privilege>,
    ) -> Result<Self> {
        Self::new(MetadataObject::new(full_name, object_type)?, privileges)
    }

    /// The object the privileges apply to.
    pub fn metadata_object(&self) -> &MetadataObject {
        &self.object
    }

    /// The dotted full name of the object.
    pub fn full_name(&self) -> &str {
        self.object.full_name()
    }

    /// The type of the object.
    pub fn object_type(&self) -> MetadataObjectType {
        self.object.object_type()
    }

    /// The privileges held on the object.
    pub fn privileges(&self) -> &[Privilege] {
        &self.privileges
    }

    fn privilege_set(&self) -> BTreeSet<Privilege> {
        self.privileges.iter().copied().collect()
    }
}

impl Display for SecurableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let privileges = self
            .privileges
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} [{}]", self.object, privileges)
    }
}

/// A catalog role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// The role name, unique within the metalake.
    pub name: String,
    /// The objects the role holds privileges on.
    #[serde(default)]
    pub securable_objects: Vec<SecurableObject>,
    /// Free-form properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Role {
    /// Basic constructor
    pub fn new<S: Into<String>>(name: S, securable_objects: Vec<SecurableObject>) -> Self {
        Self {
            name: name.into(),
            securable_objects,
            properties: HashMap::new(),
        }
    }
}

/// A change to a role's securable objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// Grant privileges on a new object.
    AddSecurableObject(SecurableObject),
    /// Drop every privilege on an object.
    RemoveSecurableObject(SecurableObject),
    /// Replace the privileges on an object.
    UpdateSecurableObject {
        /// The object as the role held it.
        old: SecurableObject,
        /// The object as the role should hold it.
        new: SecurableObject,
    },
}

impl RoleChange {
    /// Add a securable object to a role.
    pub fn add_securable_object(object: SecurableObject) -> Self {
        RoleChange::AddSecurableObject(object)
    }

    /// Remove a securable object from a role.
    pub fn remove_securable_object(object: SecurableObject) -> Self {
        RoleChange::RemoveSecurableObject(object)
    }

    /// Replace the privileges on a securable object. Both objects must name
    /// the same metadata object and carry different privileges.
    pub fn update_securable_object(old: SecurableObject, new: SecurableObject) -> Result<Self> {
        if old.metadata_object() != new.metadata_object() {
            return Err(AuthorizationError::InvalidRoleChange(format!(
                "the old and new securable objects differ: {} vs {}",
                old.metadata_object(),
                new.metadata_object()
            ))
            .into());
        }
        if old.privilege_set() == new.privilege_set() {
            return Err(AuthorizationError::InvalidRoleChange(format!(
                "the privileges on {} are unchanged",
                old.full_name()
            ))
            .into());
        }
        Ok(RoleChange::UpdateSecurableObject { old, new })
    }

    /// The metadata object the change applies to.
    pub fn metadata_object(&self) -> &MetadataObject {
        match self {
            RoleChange::AddSecurableObject(o) | RoleChange::RemoveSecurableObject(o) => {
                o.metadata_object()
            }
            RoleChange::UpdateSecurableObject { old, .. } => old.metadata_object(),
        }
    }
}

/// A catalog user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User name
    pub name: String,
    /// Names of the roles granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// Basic constructor
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            roles: vec![],
        }
    }
}

/// A catalog group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Names of the roles granted to the group.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Group {
    /// Basic constructor
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            roles: vec![],
        }
    }
}

/// Whether an owner is a user or a group.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    /// A single user.
    User,
    /// A group of users.
    Group,
}

/// The owner of a metadata object.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Principal name
    pub name: String,
    /// User or group
    #[serde(rename = "type")]
    pub owner_type: OwnerType,
}

impl Owner {
    /// A user owner.
    pub fn user<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            owner_type: OwnerType::User,
        }
    }

    /// A group owner.
    pub fn group<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            owner_type: OwnerType::Group,
        }
    }
}
