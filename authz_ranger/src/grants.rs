//! Ownership, role grants to users and groups, and the principals and
//! native roles backing them.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use authz_core::logging::{debug, info, warn};
use authz_core::metadata::MetadataObject;
use authz_core::privileges::Condition;
use authz_core::role::{Owner, OwnerType, Role, SecurableObject};

use crate::consts;
use crate::model::{GrantRevokeRoleRequest, RangerPolicy, RangerPolicyItem, RangerRole};
use crate::settings::GrantMode;
use crate::store::{Creation, Deletion, PrincipalKind};
use crate::RangerAuthorizationPlugin;

fn owner_kind(owner: &Owner) -> PrincipalKind {
    match owner.owner_type {
        OwnerType::User => PrincipalKind::User,
        OwnerType::Group => PrincipalKind::Group,
    }
}

fn principals_mut(item: &mut RangerPolicyItem, kind: PrincipalKind) -> &mut Vec<String> {
    match kind {
        PrincipalKind::User => &mut item.users,
        PrincipalKind::Group => &mut item.groups,
    }
}

fn attach(item: &mut RangerPolicyItem, kind: PrincipalKind, name: &str) -> bool {
    let principals = principals_mut(item, kind);
    if principals.iter().any(|p| p == name) {
        return false;
    }
    principals.push(name.to_owned());
    true
}

fn detach(item: &mut RangerPolicyItem, kind: PrincipalKind, name: &str) -> bool {
    let principals = principals_mut(item, kind);
    let before = principals.len();
    principals.retain(|p| p != name);
    principals.len() != before
}

/// Hand the owner accesses of a policy to a new owner.
///
/// Only owner items change hands: they lose the previous owner and the
/// placeholder and gain the new owner. Owner accesses without an owner item
/// get one. Grants the previous owner holds through roles stay put.
pub(crate) fn transfer_ownership(
    policy: &mut RangerPolicy,
    owner_accesses: &BTreeSet<String>,
    previous: Option<&Owner>,
    new: &Owner,
) {
    let mut covered = BTreeSet::new();
    for item in policy.policy_items.iter_mut().filter(|i| i.is_owner_item()) {
        let access = match item.single_access() {
            Some(a) if owner_accesses.contains(a) => a.to_owned(),
            _ => continue,
        };
        if let Some(previous) = previous {
            detach(item, owner_kind(previous), &previous.name);
        }
        detach(item, PrincipalKind::User, consts::OWNER_PLACEHOLDER);
        attach(item, owner_kind(new), &new.name);
        covered.insert(access);
    }
    for access in owner_accesses.difference(&covered) {
        let mut item = RangerPolicyItem::owner_access(access);
        attach(&mut item, owner_kind(new), &new.name);
        policy.policy_items.push(item);
    }
}

impl RangerAuthorizationPlugin {
    /// Make sure the principal exists in Ranger.
    pub(crate) async fn ensure_principal(&self, kind: PrincipalKind, name: &str) -> Result<()> {
        match self
            .store
            .create_principal(kind, name)
            .await
            .with_context(|| format!("creating {kind} {name}"))?
        {
            Creation::Created => debug!("created {kind} {name}"),
            Creation::AlreadyExists => debug!("{kind} {name} already exists"),
        }
        Ok(())
    }

    /// Make sure the catalog role has a native Ranger role.
    pub(crate) async fn ensure_native_role(&self, name: &str) -> Result<()> {
        let role = RangerRole {
            name: name.to_owned(),
            description: Some(format!("catalog role {name}")),
            ..Default::default()
        };
        match self
            .store
            .create_role(&self.service_name, &role)
            .await
            .with_context(|| format!("creating native role {name}"))?
        {
            Creation::Created => debug!("created native role {name}"),
            Creation::AlreadyExists => debug!("native role {name} already exists"),
        }
        Ok(())
    }

    pub(crate) async fn drop_native_role(&self, name: &str) -> Result<()> {
        match self
            .store
            .delete_role(&self.service_name, name)
            .await
            .with_context(|| format!("deleting native role {name}"))?
        {
            Deletion::Deleted => debug!("deleted native role {name}"),
            Deletion::NotFound => info!("native role {name} was already deleted"),
        }
        Ok(())
    }

    /// Give ownership of an object to a new owner.
    pub(crate) async fn set_owner(
        &self,
        object: &MetadataObject,
        previous: Option<&Owner>,
        new: &Owner,
    ) -> Result<()> {
        self.ensure_principal(owner_kind(new), &new.name).await?;
        let owner_accesses = self.privileges.owner_access_types();
        let mut policy = match self.find_managed_policy(object).await? {
            Some(policy) => policy,
            None => self.new_policy(consts::OWNER_ROLE_NAME, object)?,
        };
        let before = policy.clone();
        transfer_ownership(&mut policy, owner_accesses, previous, new);
        if policy == before {
            info!("{} already owns {object}", new.name);
            return Ok(());
        }
        self.persist(policy).await
    }

    /// Placeholder items of the object's policy that its privileges grant.
    fn placeholder_items<'p>(
        &self,
        policy: &'p mut RangerPolicy,
        object: &SecurableObject,
    ) -> Vec<&'p mut RangerPolicyItem> {
        let mut granted = vec![];
        let allow = self.privileges.accesses(object.privileges(), Condition::Allow);
        let deny = self.privileges.accesses(object.privileges(), Condition::Deny);
        let (allow_items, deny_items) = (&mut policy.policy_items, &mut policy.deny_policy_items);
        for (items, accesses) in [(allow_items, allow), (deny_items, deny)] {
            for item in items {
                let matches = item
                    .single_access()
                    .map(|a| accesses.contains(a))
                    .unwrap_or(false);
                let placeholder = !item.is_owner_item()
                    && item.users.iter().any(|u| u == consts::OWNER_PLACEHOLDER);
                if matches && placeholder {
                    granted.push(item);
                }
            }
        }
        granted
    }

    fn role_request(
        &self,
        role: &Role,
        kind: PrincipalKind,
        name: &str,
    ) -> GrantRevokeRoleRequest {
        let mut request = GrantRevokeRoleRequest {
            grantor: self.grantor.clone(),
            target_roles: vec![role.name.clone()],
            ..Default::default()
        };
        match kind {
            PrincipalKind::User => request.users.push(name.to_owned()),
            PrincipalKind::Group => request.groups.push(name.to_owned()),
        }
        request
    }

    /// Grant roles to a user or group. Declines with `Ok(false)`, before
    /// changing anything for that role, when one of its securable objects
    /// has no managed policy.
    ///
    /// In role mode the principal joins the native role, and role items
    /// reach it through that membership. In owner-placeholder mode it is
    /// attached to the placeholder items.
    pub(crate) async fn grant_roles(
        &self,
        roles: &[Role],
        kind: PrincipalKind,
        name: &str,
    ) -> Result<bool> {
        self.ensure_principal(kind, name).await?;
        for role in roles {
            let mut policies = Vec::with_capacity(role.securable_objects.len());
            for object in &role.securable_objects {
                let Some(policy) = self
                    .find_managed_policy(object.metadata_object())
                    .await
                    .with_context(|| format!("granting {} on {}", role.name, object.full_name()))?
                else {
                    warn!(
                        "no managed policy for {}; can't grant role {} to {kind} {name}",
                        object.full_name(),
                        role.name
                    );
                    return Ok(false);
                };
                policies.push((object, policy));
            }
            match self.grant_mode {
                GrantMode::Role => {
                    self.ensure_native_role(&role.name).await?;
                    self.store
                        .grant_role(&self.service_name, &self.role_request(role, kind, name))
                        .await
                        .with_context(|| {
                            format!("granting native role {} to {kind} {name}", role.name)
                        })?;
                }
                GrantMode::OwnerPlaceholder => {
                    for (object, mut policy) in policies {
                        let mut changed = false;
                        for item in self.placeholder_items(&mut policy, object) {
                            changed |= attach(item, kind, name);
                        }
                        if changed {
                            self.persist(policy).await?;
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// Revoke roles from a user or group. Never deletes a policy; a missing
    /// policy or native role has nothing to revoke.
    pub(crate) async fn revoke_roles(
        &self,
        roles: &[Role],
        kind: PrincipalKind,
        name: &str,
    ) -> Result<bool> {
        for role in roles {
            if self.grant_mode == GrantMode::Role {
                if self.store.get_role(&role.name).await?.is_none() {
                    info!("native role {} doesn't exist; nothing to revoke", role.name);
                    continue;
                }
                self.store
                    .revoke_role(&self.service_name, &self.role_request(role, kind, name))
                    .await
                    .with_context(|| {
                        format!("revoking native role {} from {kind} {name}", role.name)
                    })?;
                continue;
            }
            for object in &role.securable_objects {
                let Some(mut policy) = self
                    .find_managed_policy(object.metadata_object())
                    .await
                    .with_context(|| format!("revoking {} on {}", role.name, object.full_name()))?
                else {
                    info!(
                        "no managed policy for {}; nothing to revoke from {kind} {name}",
                        object.full_name()
                    );
                    continue;
                };
                let mut changed = false;
                for item in self.placeholder_items(&mut policy, object) {
                    changed |= detach(item, kind, name);
                }
                if changed {
                    self.persist(policy).await?;
                }
            }
        }
        Ok(true)
    }

    /// Create a principal. `Ok(false)` when it already exists.
    pub(crate) async fn add_principal(&self, kind: PrincipalKind, name: &str) -> Result<bool> {
        if !self.store.search_principals(kind, name).await?.is_empty() {
            warn!("{kind} {name} already exists in Ranger");
            return Ok(false);
        }
        match self.store.create_principal(kind, name).await? {
            Creation::Created => Ok(true),
            Creation::AlreadyExists => {
                warn!("{kind} {name} already exists in Ranger");
                Ok(false)
            }
        }
    }

    /// Delete a principal. `Ok(false)` when it doesn't exist.
    pub(crate) async fn remove_principal(&self, kind: PrincipalKind, name: &str) -> Result<bool> {
        let found = self.store.search_principals(kind, name).await?;
        let Some(principal) = found.first() else {
            warn!("{kind} {name} doesn't exist in Ranger");
            return Ok(false);
        };
        match self.store.delete_principal(kind, principal.id).await? {
            Deletion::Deleted => Ok(true),
            Deletion::NotFound => {
                warn!("{kind} {name} was already deleted from Ranger");
                Ok(false)
            }
        }
    }

    pub(crate) async fn principal_exists(&self, kind: PrincipalKind, name: &str) -> Result<bool> {
        if self.store.search_principals(kind, name).await?.is_empty() {
            warn!("{kind} {name} doesn't exist in Ranger");
            return Ok(false);
        }
        Ok(true)
    }
}
