//! The Ranger admin operations the plugin needs, independent of transport.

use std::collections::HashMap;
use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{GrantRevokeRoleRequest, RangerPolicy, RangerRole};

/// Whether a principal is a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    User,
    Group,
}

impl Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Group => write!(f, "group"),
        }
    }
}

/// A user or group known to Ranger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub kind: PrincipalKind,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    /// The target was already gone.
    NotFound,
}

/// Outcome of a create that may race with an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    Created,
    AlreadyExists,
}

/// Policy, principal and native role operations against a Ranger admin
/// server.
///
/// Implementations classify "not found" and "already exists" outcomes
/// explicitly; every other failure is an error.
#[async_trait]
pub trait RangerStore: Send + Sync {
    /// Search policies. Resource values in `filter` are matched against
    /// stored values that may contain `*` and `?` wildcards, so callers get
    /// back a superset of the exact matches.
    async fn find_policies(&self, filter: &HashMap<String, String>) -> Result<Vec<RangerPolicy>>;

    /// Create a policy, returning it with its assigned id.
    async fn create_policy(&self, policy: &RangerPolicy) -> Result<RangerPolicy>;

    async fn update_policy(&self, id: i64, policy: &RangerPolicy) -> Result<RangerPolicy>;

    async fn delete_policy(&self, id: i64) -> Result<Deletion>;

    /// Principals whose name matches exactly.
    async fn search_principals(&self, kind: PrincipalKind, name: &str) -> Result<Vec<Principal>>;

    async fn create_principal(&self, kind: PrincipalKind, name: &str) -> Result<Creation>;

    async fn delete_principal(&self, kind: PrincipalKind, id: i64) -> Result<Deletion>;

    async fn get_role(&self, name: &str) -> Result<Option<RangerRole>>;

    async fn create_role(&self, service_name: &str, role: &RangerRole) -> Result<Creation>;

    async fn delete_role(&self, service_name: &str, name: &str) -> Result<Deletion>;

    async fn grant_role(&self, service_name: &str, request: &GrantRevokeRoleRequest)
        -> Result<()>;

    async fn revoke_role(
        &self,
        service_name: &str,
        request: &GrantRevokeRoleRequest,
    ) -> Result<()>;
}
