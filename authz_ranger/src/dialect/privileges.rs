use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use authz_core::privileges::{Condition, Privilege, PrivilegeName};
use authz_core::role::SecurableObject;
use authz_core::AuthorizationError;

use super::ServiceType;

/// Ranger access types for every catalog privilege a service type supports,
/// plus the access types an owner receives.
#[derive(Debug, Clone)]
pub struct PrivilegeMapping {
    mapping: HashMap<PrivilegeName, BTreeSet<String>>,
    owner: BTreeSet<String>,
}

fn set(accesses: &[&str]) -> BTreeSet<String> {
    accesses.iter().map(|a| a.to_string()).collect()
}

impl PrivilegeMapping {
    /// The fixed mapping table for a service type.
    pub fn for_service(service_type: ServiceType) -> Self {
        use PrivilegeName::*;
        match service_type {
            ServiceType::HadoopSql => Self {
                mapping: HashMap::from([
                    (CreateCatalog, set(&["create"])),
                    (UseCatalog, set(&["select"])),
                    (CreateSchema, set(&["create"])),
                    (UseSchema, set(&["select"])),
                    (CreateTable, set(&["create"])),
                    (ModifyTable, set(&["update", "alter", "write"])),
                    (SelectTable, set(&["read", "select"])),
                ]),
                owner: set(&["all"]),
            },
            ServiceType::Hdfs => Self {
                mapping: HashMap::from([
                    (UseCatalog, set(&["execute"])),
                    (UseSchema, set(&["execute"])),
                    (CreateFileset, set(&["write", "execute"])),
                    (ReadFileset, set(&["read", "execute"])),
                    (WriteFileset, set(&["write", "execute"])),
                ]),
                owner: set(&["read", "write", "execute"]),
            },
        }
    }

    pub fn supports(&self, name: PrivilegeName) -> bool {
        self.mapping.contains_key(&name)
    }

    /// Access types for a privilege. Empty when the privilege isn't
    /// supported.
    pub fn translate(&self, name: PrivilegeName) -> BTreeSet<String> {
        self.mapping.get(&name).cloned().unwrap_or_default()
    }

    /// The union of the access types of every privilege with the given
    /// condition. Unsupported privileges are skipped.
    pub fn accesses(&self, privileges: &[Privilege], condition: Condition) -> BTreeSet<String> {
        privileges
            .iter()
            .filter(|p| p.condition == condition)
            .flat_map(|p| self.translate(p.name))
            .collect()
    }

    pub fn owner_access_types(&self) -> &BTreeSet<String> {
        &self.owner
    }

    /// Fail on the first privilege of the object the service can't express.
    pub fn validate(&self, object: &SecurableObject) -> Result<()> {
        match object.privileges().iter().find(|p| !self.supports(p.name)) {
            Some(p) => Err(AuthorizationError::PrivilegeNotSupported {
                privilege: p.name,
                object_type: None,
            }
            .into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_core::metadata::MetadataObjectType;

    #[test]
    fn select_table_maps_to_read_and_select() {
        let mapping = PrivilegeMapping::for_service(ServiceType::HadoopSql);
        assert_eq!(
            mapping.translate(PrivilegeName::SelectTable),
            set(&["read", "select"])
        );
        assert_eq!(mapping.owner_access_types(), &set(&["all"]));
    }

    #[test]
    fn accesses_are_split_by_condition() {
        let mapping = PrivilegeMapping::for_service(ServiceType::HadoopSql);
        let privileges = [
            Privilege::allow(PrivilegeName::SelectTable),
            Privilege::deny(PrivilegeName::ModifyTable),
            Privilege::allow(PrivilegeName::CreateFileset),
        ];
        assert_eq!(
            mapping.accesses(&privileges, Condition::Allow),
            set(&["read", "select"])
        );
        assert_eq!(
            mapping.accesses(&privileges, Condition::Deny),
            set(&["alter", "update", "write"])
        );
    }

    #[test]
    fn validation_rejects_unsupported_privileges() -> Result<()> {
        let mapping = PrivilegeMapping::for_service(ServiceType::Hdfs);
        let object = SecurableObject::parse(
            "catalog.db1",
            MetadataObjectType::Schema,
            vec![
                Privilege::allow(PrivilegeName::ReadFileset),
                Privilege::allow(PrivilegeName::CreateTable),
            ],
        )?;
        let err = mapping.validate(&object).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthorizationError>(),
            Some(&AuthorizationError::PrivilegeNotSupported {
                privilege: PrivilegeName::CreateTable,
                object_type: None,
            })
        );
        Ok(())
    }
}
