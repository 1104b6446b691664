//! An in-process Ranger store, for tests and dry runs.
//!
//! Searches follow Ranger's semantics: a stored resource value is a pattern
//! (`*` and `?` are wildcards) matched against the searched value, so a
//! search for `db1` also returns policies on `db*` and `*`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;
use glob::Pattern;

use crate::consts;
use crate::model::{GrantRevokeRoleRequest, RangerPolicy, RangerRole, RoleMember};
use crate::store::{Creation, Deletion, Principal, PrincipalKind, RangerStore};

#[derive(Default)]
struct State {
    next_id: i64,
    policies: BTreeMap<i64, RangerPolicy>,
    principals: Vec<Principal>,
    roles: BTreeMap<String, RangerRole>,
    writes: usize,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_conflicts(&self, id: Option<i64>, policy: &RangerPolicy) -> Result<()> {
        for (other_id, other) in &self.policies {
            if Some(*other_id) == id || other.service != policy.service {
                continue;
            }
            if other.name == policy.name {
                bail!(
                    "another policy already exists with name {} (id {other_id})",
                    policy.name
                );
            }
            if other.resources == policy.resources {
                bail!(
                    "another policy already exists for matching resource: policy {} (id {other_id})",
                    other.name
                );
            }
        }
        Ok(())
    }
}

/// A [`RangerStore`] that keeps everything in memory.
#[derive(Default)]
pub struct InMemoryRangerStore {
    state: Mutex<State>,
}

fn value_matches(stored: &str, searched: &str) -> bool {
    match Pattern::new(stored) {
        Ok(pattern) => pattern.matches(searched),
        Err(_) => stored == searched,
    }
}

fn policy_matches(policy: &RangerPolicy, filter: &HashMap<String, String>) -> bool {
    filter.iter().all(|(key, value)| {
        if key == consts::SEARCH_SERVICE_NAME {
            policy.service == *value
        } else if key == consts::SEARCH_POLICY_LABELS {
            policy.policy_labels.iter().any(|l| l.contains(value.as_str()))
        } else if let Some(level) = key.strip_prefix(consts::SEARCH_RESOURCE_PREFIX) {
            policy
                .resources
                .get(level)
                .map(|r| r.values.iter().any(|v| value_matches(v, value)))
                .unwrap_or(false)
        } else {
            true
        }
    })
}

impl InMemoryRangerStore {
    pub fn new() -> Self {
        Default::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a policy as if someone had created it out of band. Doesn't
    /// count as a write.
    pub fn insert_policy(&self, mut policy: RangerPolicy) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        policy.id = Some(id);
        state.policies.insert(id, policy);
        id
    }

    /// Every stored policy, by id.
    pub fn policies(&self) -> Vec<RangerPolicy> {
        self.state().policies.values().cloned().collect()
    }

    /// Number of successful policy creates, updates and deletes.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Names of the stored principals of a kind.
    pub fn principal_names(&self, kind: PrincipalKind) -> Vec<String> {
        self.state()
            .principals
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn role(&self, name: &str) -> Option<RangerRole> {
        self.state().roles.get(name).cloned()
    }
}

#[async_trait]
impl RangerStore for InMemoryRangerStore {
    async fn find_policies(&self, filter: &HashMap<String, String>) -> Result<Vec<RangerPolicy>> {
        Ok(self
            .state()
            .policies
            .values()
            .filter(|p| policy_matches(p, filter))
            .cloned()
            .collect())
    }

    async fn create_policy(&self, policy: &RangerPolicy) -> Result<RangerPolicy> {
        let mut state = self.state();
        state.check_conflicts(None, policy)?;
        let id = state.next_id();
        let mut created = policy.clone();
        created.id = Some(id);
        state.policies.insert(id, created.clone());
        state.writes += 1;
        Ok(created)
    }

    async fn update_policy(&self, id: i64, policy: &RangerPolicy) -> Result<RangerPolicy> {
        let mut state = self.state();
        if !state.policies.contains_key(&id) {
            bail!("no policy with id {id}");
        }
        state.check_conflicts(Some(id), policy)?;
        let mut updated = policy.clone();
        updated.id = Some(id);
        state.policies.insert(id, updated.clone());
        state.writes += 1;
        Ok(updated)
    }

    async fn delete_policy(&self, id: i64) -> Result<Deletion> {
        let mut state = self.state();
        match state.policies.remove(&id) {
            Some(_) => {
                state.writes += 1;
                Ok(Deletion::Deleted)
            }
            None => Ok(Deletion::NotFound),
        }
    }

    async fn search_principals(&self, kind: PrincipalKind, name: &str) -> Result<Vec<Principal>> {
        Ok(self
            .state()
            .principals
            .iter()
            .filter(|p| p.kind == kind && p.name == name)
            .cloned()
            .collect())
    }

    async fn create_principal(&self, kind: PrincipalKind, name: &str) -> Result<Creation> {
        let mut state = self.state();
        if state
            .principals
            .iter()
            .any(|p| p.kind == kind && p.name == name)
        {
            return Ok(Creation::AlreadyExists);
        }
        let id = state.next_id();
        state.principals.push(Principal {
            id,
            name: name.to_owned(),
            kind,
        });
        Ok(Creation::Created)
    }

    async fn delete_principal(&self, kind: PrincipalKind, id: i64) -> Result<Deletion> {
        let mut state = self.state();
        let before = state.principals.len();
        state.principals.retain(|p| !(p.kind == kind && p.id == id));
        Ok(if state.principals.len() < before {
            Deletion::Deleted
        } else {
            Deletion::NotFound
        })
    }

    async fn get_role(&self, name: &str) -> Result<Option<RangerRole>> {
        Ok(self.role(name))
    }

    async fn create_role(&self, _service_name: &str, role: &RangerRole) -> Result<Creation> {
        let mut state = self.state();
        if state.roles.contains_key(&role.name) {
            return Ok(Creation::AlreadyExists);
        }
        let id = state.next_id();
        let mut created = role.clone();
        created.id = Some(id);
        state.roles.insert(role.name.clone(), created);
        Ok(Creation::Created)
    }

    async fn delete_role(&self, _service_name: &str, name: &str) -> Result<Deletion> {
        Ok(match self.state().roles.remove(name) {
            Some(_) => Deletion::Deleted,
            None => Deletion::NotFound,
        })
    }

    async fn grant_role(&self, _service_name: &str, request: &GrantRevokeRoleRequest) -> Result<()> {
        let mut state = self.state();
        for target in &request.target_roles {
            let Some(role) = state.roles.get_mut(target) else {
                bail!("role {target} does not exist");
            };
            for user in &request.users {
                if !role.users.iter().any(|m| &m.name == user) {
                    role.users.push(RoleMember {
                        name: user.clone(),
                        is_admin: false,
                    });
                }
            }
            for group in &request.groups {
                if !role.groups.iter().any(|m| &m.name == group) {
                    role.groups.push(RoleMember {
                        name: group.clone(),
                        is_admin: false,
                    });
                }
            }
        }
        Ok(())
    }

    async fn revoke_role(
        &self,
        _service_name: &str,
        request: &GrantRevokeRoleRequest,
    ) -> Result<()> {
        let mut state = self.state();
        for target in &request.target_roles {
            let Some(role) = state.roles.get_mut(target) else {
                bail!("role {target} does not exist");
            };
            role.users.retain(|m| !request.users.contains(&m.name));
            role.groups.retain(|m| !request.groups.contains(&m.name));
        }
        Ok(())
    }
}
