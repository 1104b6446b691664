//! Turning role changes into edits of managed policy items.
//!
//! Items carry exactly one access type each. In role mode an item lists
//! every catalog role that grants its access, so roles sharing a policy
//! never disturb each other's grants; users and groups reach those items
//! through native role membership only. In owner-placeholder mode items
//! carry the `{OWNER}` placeholder user instead. Owner items are never
//! touched here.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use authz_core::logging::{debug, info};
use authz_core::metadata::MetadataObject;
use authz_core::privileges::Condition;
use authz_core::role::{Role, RoleChange, SecurableObject};

use crate::consts;
use crate::model::{RangerPolicy, RangerPolicyItem};
use crate::settings::GrantMode;
use crate::store::Deletion;
use crate::RangerAuthorizationPlugin;

/// The deterministic name of the policy a role creates for an object.
pub fn format_policy_name(role_name: &str, full_name: &str) -> String {
    format!("{role_name}-{full_name}")
}

/// Who an item edit is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemPrincipal<'a> {
    Role(&'a str),
    OwnerPlaceholder,
}

impl ItemPrincipal<'_> {
    /// Whether the item is granted on this principal's behalf.
    fn owns(&self, item: &RangerPolicyItem) -> bool {
        if item.is_owner_item() {
            return false;
        }
        match self {
            ItemPrincipal::Role(role) => item.roles.iter().any(|r| r == role),
            ItemPrincipal::OwnerPlaceholder => {
                item.users.iter().any(|u| u == consts::OWNER_PLACEHOLDER)
            }
        }
    }
}

fn items_mut(
    policy: &mut RangerPolicy,
    condition: Condition,
) -> &mut Vec<RangerPolicyItem> {
    match condition {
        Condition::Allow => &mut policy.policy_items,
        Condition::Deny => &mut policy.deny_policy_items,
    }
}

/// Grant each access to the principal. Returns whether anything changed.
pub(crate) fn add_accesses(
    items: &mut Vec<RangerPolicyItem>,
    accesses: &BTreeSet<String>,
    principal: ItemPrincipal,
) -> bool {
    let mut changed = false;
    for access in accesses {
        if let Some(item) = items
            .iter_mut()
            .find(|i| !i.is_owner_item() && i.single_access() == Some(access.as_str()))
        {
            // Any item for the access already covers the placeholder.
            if let ItemPrincipal::Role(role) = principal {
                if !item.roles.iter().any(|r| r == role) {
                    item.roles.push(role.to_owned());
                    changed = true;
                }
            }
            continue;
        }
        let mut item = RangerPolicyItem::with_access(access);
        match principal {
            ItemPrincipal::Role(role) => item.roles.push(role.to_owned()),
            ItemPrincipal::OwnerPlaceholder => {
                item.users.push(consts::OWNER_PLACEHOLDER.to_owned())
            }
        }
        items.push(item);
        changed = true;
    }
    changed
}

/// Take each access away from the principal. A role item goes once no role
/// holds it; a placeholder item goes along with everyone granted through
/// it. Returns whether anything changed.
pub(crate) fn remove_accesses(
    items: &mut Vec<RangerPolicyItem>,
    accesses: &BTreeSet<String>,
    principal: ItemPrincipal,
) -> bool {
    let before = items.len();
    let mut detached = false;
    items.retain_mut(|item| {
        let matches = item
            .single_access()
            .map(|a| accesses.contains(a))
            .unwrap_or(false);
        if !matches || !principal.owns(item) {
            return true;
        }
        match principal {
            ItemPrincipal::Role(role) => {
                item.roles.retain(|r| r != role);
                detached = true;
                !item.roles.is_empty()
            }
            ItemPrincipal::OwnerPlaceholder => false,
        }
    });
    detached || items.len() != before
}

impl RangerAuthorizationPlugin {
    pub(crate) fn item_principal<'a>(&self, role: &'a Role) -> ItemPrincipal<'a> {
        match self.grant_mode {
            GrantMode::Role => ItemPrincipal::Role(&role.name),
            GrantMode::OwnerPlaceholder => ItemPrincipal::OwnerPlaceholder,
        }
    }

    /// A fresh managed policy for the object, named after the role creating it.
    pub(crate) fn new_policy(
        &self,
        role_name: &str,
        object: &MetadataObject,
    ) -> Result<RangerPolicy> {
        let resources = self.paths.resources(object)?;
        Ok(RangerPolicy::new_managed(
            self.service_name.clone(),
            format_policy_name(role_name, object.full_name()),
            &resources,
        ))
    }

    async fn located_or_new(&self, role: &Role, object: &MetadataObject) -> Result<RangerPolicy> {
        match self.find_managed_policy(object).await? {
            Some(policy) => Ok(policy),
            None => self.new_policy(&role.name, object),
        }
    }

    fn grant_in(&self, policy: &mut RangerPolicy, role: &Role, object: &SecurableObject) -> bool {
        let principal = self.item_principal(role);
        let mut changed = false;
        for condition in [Condition::Allow, Condition::Deny] {
            let accesses = self.privileges.accesses(object.privileges(), condition);
            changed |= add_accesses(items_mut(policy, condition), &accesses, principal);
        }
        changed
    }

    fn revoke_in(&self, policy: &mut RangerPolicy, role: &Role, object: &SecurableObject) -> bool {
        let principal = self.item_principal(role);
        let mut changed = false;
        for condition in [Condition::Allow, Condition::Deny] {
            let accesses = self.privileges.accesses(object.privileges(), condition);
            changed |= remove_accesses(items_mut(policy, condition), &accesses, principal);
        }
        changed
    }

    /// Write an edited policy back: delete it once it has no items, create
    /// it if Ranger hasn't seen it yet, update it otherwise.
    pub(crate) async fn persist(&self, policy: RangerPolicy) -> Result<()> {
        match (policy.id, policy.has_no_items()) {
            (Some(id), true) => match self
                .store
                .delete_policy(id)
                .await
                .with_context(|| format!("deleting policy {}", policy.name))?
            {
                Deletion::Deleted => debug!("deleted empty policy {}", policy.name),
                Deletion::NotFound => info!("policy {} was already deleted", policy.name),
            },
            (None, true) => debug!("policy {} has no items; not creating it", policy.name),
            (None, false) => {
                let created = self
                    .store
                    .create_policy(&policy)
                    .await
                    .with_context(|| format!("creating policy {}", policy.name))?;
                debug!("created policy {} with id {:?}", created.name, created.id);
            }
            (Some(id), false) => {
                self.store
                    .update_policy(id, &policy)
                    .await
                    .with_context(|| format!("updating policy {}", policy.name))?;
                debug!("updated policy {}", policy.name);
            }
        }
        Ok(())
    }

    /// Grant the role's privileges on the object.
    pub(crate) async fn add_securable_object(
        &self,
        role: &Role,
        object: &SecurableObject,
    ) -> Result<()> {
        self.privileges.validate(object)?;
        let mut policy = self.located_or_new(role, object.metadata_object()).await?;
        if !self.grant_in(&mut policy, role, object) {
            info!("{object} is already granted to role {}", role.name);
            return Ok(());
        }
        self.persist(policy).await
    }

    /// Take the role's privileges on the object away. A missing policy or
    /// grant counts as already removed.
    pub(crate) async fn remove_securable_object(
        &self,
        role: &Role,
        object: &SecurableObject,
    ) -> Result<()> {
        let Some(mut policy) = self.find_managed_policy(object.metadata_object()).await? else {
            info!("no managed policy for {}; nothing to remove", object.full_name());
            return Ok(());
        };
        if !self.revoke_in(&mut policy, role, object) {
            info!("{object} is not granted to role {}", role.name);
            return Ok(());
        }
        self.persist(policy).await
    }

    /// Swap the old privileges for the new ones in a single write.
    pub(crate) async fn update_securable_object(
        &self,
        role: &Role,
        old: &SecurableObject,
        new: &SecurableObject,
    ) -> Result<()> {
        self.privileges.validate(new)?;
        let mut policy = self.located_or_new(role, new.metadata_object()).await?;
        let removed = self.revoke_in(&mut policy, role, old);
        let added = self.grant_in(&mut policy, role, new);
        if !removed && !added {
            info!("{new} is already granted to role {}", role.name);
            return Ok(());
        }
        self.persist(policy).await
    }

    pub(crate) async fn apply_change(&self, role: &Role, change: &RoleChange) -> Result<()> {
        match change {
            RoleChange::AddSecurableObject(object) => self.add_securable_object(role, object).await,
            RoleChange::RemoveSecurableObject(object) => {
                self.remove_securable_object(role, object).await
            }
            RoleChange::UpdateSecurableObject { old, new } => {
                self.update_securable_object(role, old, new).await
            }
        }
    }
}
