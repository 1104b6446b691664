//! The seam between the catalog's role management and an external
//! access-control system.

use anyhow::Result;
use async_trait::async_trait;

use crate::metadata::MetadataObject;
use crate::role::{Group, Owner, Role, RoleChange, User};

/// Lifecycle hooks an authorization plugin reflects into its target system.
///
/// Every hook returns `Ok(true)` on success, `Ok(false)` when the plugin
/// declined the change without failing (an already existing user, for
/// instance), and `Err` when reconciliation failed. Callers retry a failed
/// hook as a whole.
#[async_trait]
pub trait AuthorizationPlugin: Send + Sync {
    /// A role was created. Grant each of its securable objects.
    async fn on_role_created(&self, role: &Role) -> Result<bool>;

    /// A role was loaded. Check that its grants are present.
    async fn on_role_acquired(&self, role: &Role) -> Result<bool>;

    /// A role was deleted. Remove each of its securable objects.
    async fn on_role_deleted(&self, role: &Role) -> Result<bool>;

    /// A role changed. Changes are applied in order and the batch stops at
    /// the first failure.
    async fn on_role_updated(&self, role: &Role, changes: &[RoleChange]) -> Result<bool>;

    /// The owner of a metadata object changed. `previous` is `None` on the
    /// first assignment.
    async fn on_owner_set(
        &self,
        object: &MetadataObject,
        previous: Option<&Owner>,
        new: &Owner,
    ) -> Result<bool>;

    /// Roles were granted to a user.
    async fn on_granted_roles_to_user(&self, roles: &[Role], user: &User) -> Result<bool>;

    /// Roles were revoked from a user.
    async fn on_revoked_roles_from_user(&self, roles: &[Role], user: &User) -> Result<bool>;

    /// Roles were granted to a group.
    async fn on_granted_roles_to_group(&self, roles: &[Role], group: &Group) -> Result<bool>;

    /// Roles were revoked from a group.
    async fn on_revoked_roles_from_group(&self, roles: &[Role], group: &Group) -> Result<bool>;

    /// A user was added to the metalake.
    async fn on_user_added(&self, user: &User) -> Result<bool>;

    /// A user was removed from the metalake.
    async fn on_user_removed(&self, user: &User) -> Result<bool>;

    /// A user was loaded. Check that it exists in the target system.
    async fn on_user_acquired(&self, user: &User) -> Result<bool>;

    /// A group was added to the metalake.
    async fn on_group_added(&self, group: &Group) -> Result<bool>;

    /// A group was removed from the metalake.
    async fn on_group_removed(&self, group: &Group) -> Result<bool>;

    /// A group was loaded. Check that it exists in the target system.
    async fn on_group_acquired(&self, group: &Group) -> Result<bool>;
}
