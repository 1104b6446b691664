//! Catalog privileges.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::metadata::MetadataObjectType;

/// Every privilege the catalog can grant.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegeName {
    /// Create catalogs in a metalake.
    CreateCatalog,
    /// Use (list and load) a catalog.
    UseCatalog,
    /// Create schemas.
    CreateSchema,
    /// Use (list and load) a schema.
    UseSchema,
    /// Create tables.
    CreateTable,
    /// Write to and alter tables.
    ModifyTable,
    /// Read tables.
    SelectTable,
    /// Create filesets.
    CreateFileset,
    /// Read filesets.
    ReadFileset,
    /// Write filesets.
    WriteFileset,
    /// Create topics.
    CreateTopic,
    /// Produce to topics.
    ProduceTopic,
    /// Consume from topics.
    ConsumeTopic,
    /// Manage the users of a metalake.
    ManageUsers,
    /// Manage the groups of a metalake.
    ManageGroups,
    /// Create roles.
    CreateRole,
    /// Grant and revoke roles.
    ManageGrants,
}

impl PrivilegeName {
    /// Whether the privilege can be granted on an object of the given type.
    pub fn can_bind_to(&self, object_type: MetadataObjectType) -> bool {
        use MetadataObjectType::*;
        match self {
            PrivilegeName::CreateCatalog
            | PrivilegeName::ManageUsers
            | PrivilegeName::ManageGroups
            | PrivilegeName::CreateRole
            | PrivilegeName::ManageGrants => object_type == Metalake,
            PrivilegeName::UseCatalog | PrivilegeName::CreateSchema => {
                matches!(object_type, Metalake | Catalog)
            }
            PrivilegeName::UseSchema
            | PrivilegeName::CreateTable
            | PrivilegeName::CreateFileset
            | PrivilegeName::CreateTopic => matches!(object_type, Metalake | Catalog | Schema),
            PrivilegeName::ModifyTable | PrivilegeName::SelectTable => {
                matches!(object_type, Metalake | Catalog | Schema | Table | Column)
            }
            PrivilegeName::ReadFileset | PrivilegeName::WriteFileset => {
                matches!(object_type, Metalake | Catalog | Schema | Fileset)
            }
            PrivilegeName::ProduceTopic | PrivilegeName::ConsumeTopic => {
                matches!(object_type, Metalake | Catalog | Schema | Topic)
            }
        }
    }
}

impl Display for PrivilegeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrivilegeName::CreateCatalog => "CREATE_CATALOG",
            PrivilegeName::UseCatalog => "USE_CATALOG",
            PrivilegeName::CreateSchema => "CREATE_SCHEMA",
            PrivilegeName::UseSchema => "USE_SCHEMA",
            PrivilegeName::CreateTable => "CREATE_TABLE",
            PrivilegeName::ModifyTable => "MODIFY_TABLE",
            PrivilegeName::SelectTable => "SELECT_TABLE",
            PrivilegeName::CreateFileset => "CREATE_FILESET",
            PrivilegeName::ReadFileset => "READ_FILESET",
            PrivilegeName::WriteFileset => "WRITE_FILESET",
            PrivilegeName::CreateTopic => "CREATE_TOPIC",
            PrivilegeName::ProduceTopic => "PRODUCE_TOPIC",
            PrivilegeName::ConsumeTopic => "CONSUME_TOPIC",
            PrivilegeName::ManageUsers => "MANAGE_USERS",
            PrivilegeName::ManageGroups => "MANAGE_GROUPS",
            PrivilegeName::CreateRole => "CREATE_ROLE",
            PrivilegeName::ManageGrants => "MANAGE_GRANTS",
        };
        write!(f, "{name}")
    }
}

/// Whether a privilege grants or denies access.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    /// Grant the access.
    #[default]
    Allow,
    /// Deny the access.
    Deny,
}

/// A privilege with its condition. Immutable value.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Privilege {
    /// The privilege being granted or denied.
    pub name: PrivilegeName,
    /// Allow or deny.
    pub condition: Condition,
}

impl Privilege {
    /// An allowed privilege.
    pub fn allow(name: PrivilegeName) -> Self {
        Self {
            name,
            condition: Condition::Allow,
        }
    }

    /// A denied privilege.
    pub fn deny(name: PrivilegeName) -> Self {
        Self {
            name,
            condition: Condition::Deny,
        }
    }
}

impl Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.condition {
            Condition::Allow => write!(f, "ALLOW {}", self.name),
            Condition::Deny => write!(f, "DENY {}", self.name),
        }
    }
}
