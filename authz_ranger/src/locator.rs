//! Finding the one managed policy for a metadata object.
//!
//! Ranger's policy search treats stored resource values as wildcard
//! patterns, so a search for `db1` also returns policies on `db*` or `*`.
//! Search results are re-filtered client-side down to policies whose
//! resources are exactly the object's path.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use authz_core::logging::debug;
use authz_core::metadata::MetadataObject;
use authz_core::AuthorizationError;
use indexmap::IndexMap;

use crate::consts;
use crate::model::RangerPolicy;
use crate::RangerAuthorizationPlugin;

/// The search filter for a resource path: service, management label and one
/// `resource:<level>` key per level.
pub(crate) fn search_filter(
    service_name: &str,
    resources: &IndexMap<String, String>,
) -> HashMap<String, String> {
    let mut filter = HashMap::from([
        (
            consts::SEARCH_SERVICE_NAME.to_owned(),
            service_name.to_owned(),
        ),
        (
            consts::SEARCH_POLICY_LABELS.to_owned(),
            consts::MANAGED_BY_CATALOG.to_owned(),
        ),
    ]);
    for (level, value) in resources {
        filter.insert(
            format!("{}{level}", consts::SEARCH_RESOURCE_PREFIX),
            value.to_owned(),
        );
    }
    filter
}

/// True when the policy addresses exactly these levels, each with the one
/// queried value.
pub(crate) fn precise_match(policy: &RangerPolicy, resources: &IndexMap<String, String>) -> bool {
    policy.resources.len() == resources.len()
        && resources.iter().all(|(level, value)| {
            policy
                .resources
                .get(level)
                .map(|r| !r.is_excludes && r.values.len() == 1 && r.values[0] == *value)
                .unwrap_or(false)
        })
}

/// Every item of a managed policy carries exactly one access type, and no
/// access type appears twice in the same item list. Owner items are counted
/// apart from grant items.
pub(crate) fn validate_managed_policy(policy: &RangerPolicy) -> Result<()> {
    let corrupt = |reason: String| -> anyhow::Error {
        AuthorizationError::CorruptManagedPolicy {
            policy: policy.name.clone(),
            reason,
        }
        .into()
    };
    for (list, items) in policy.item_lists() {
        let mut seen = BTreeSet::new();
        for item in items {
            let access = item.single_access().ok_or_else(|| {
                corrupt(format!(
                    "an item in {list} has {} access types",
                    item.accesses.len()
                ))
            })?;
            if !seen.insert((item.is_owner_item(), access)) {
                let kind = if item.is_owner_item() { "owner" } else { "grant" };
                return Err(corrupt(format!(
                    "access type {access} appears in more than one {kind} item in {list}"
                )));
            }
        }
    }
    Ok(())
}

impl RangerAuthorizationPlugin {
    /// The managed policy whose resources are exactly the object's path, if
    /// any. Never writes.
    pub(crate) async fn find_managed_policy(
        &self,
        object: &MetadataObject,
    ) -> Result<Option<RangerPolicy>> {
        let resources = self.paths.resources(object)?;
        let filter = search_filter(&self.service_name, &resources);
        let candidates = self
            .store
            .find_policies(&filter)
            .await
            .with_context(|| format!("searching policies for {object}"))?;
        let found = candidates.len();
        let mut managed: Vec<_> = candidates
            .into_iter()
            .filter(|p| p.is_managed() && precise_match(p, &resources))
            .collect();
        debug!(
            "{object}: {found} policies found, {} managed with an exact path",
            managed.len()
        );
        if managed.len() > 1 {
            return Err(AuthorizationError::AmbiguousManagedPolicy {
                object: object.full_name().to_owned(),
                count: managed.len(),
            }
            .into());
        }
        match managed.pop() {
            Some(policy) => {
                validate_managed_policy(&policy)?;
                Ok(Some(policy))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use authz_core::metadata::MetadataObjectType;

    use crate::model::{RangerPolicyItem, RangerPolicyItemAccess};
    use crate::{GrantMode, InMemoryRangerStore, ServiceType};

    fn resources(values: &[(&str, &str)]) -> IndexMap<String, String> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn managed(name: &str, values: &[(&str, &str)]) -> RangerPolicy {
        let mut policy = RangerPolicy::new_managed("hiveDev", name, &resources(values));
        policy
            .policy_items
            .push(RangerPolicyItem::with_access("select"));
        policy
    }

    fn plugin(store: Arc<InMemoryRangerStore>) -> RangerAuthorizationPlugin {
        RangerAuthorizationPlugin::with_store(
            store,
            "hiveDev",
            ServiceType::HadoopSql,
            GrantMode::Role,
        )
    }

    fn db1() -> MetadataObject {
        MetadataObject::new("catalog.db1", MetadataObjectType::Schema).unwrap()
    }

    #[test]
    fn filter_carries_service_label_and_levels() {
        let filter = search_filter("hiveDev", &resources(&[("database", "db1")]));
        assert_eq!(filter["serviceName"], "hiveDev");
        assert_eq!(filter["policyLabelsPartial"], consts::MANAGED_BY_CATALOG);
        assert_eq!(filter["resource:database"], "db1");
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn precise_match_needs_the_same_levels() {
        let query = resources(&[("database", "db1")]);
        assert!(precise_match(&managed("a", &[("database", "db1")]), &query));
        assert!(!precise_match(&managed("b", &[("database", "db*")]), &query));
        assert!(!precise_match(
            &managed("c", &[("database", "db1"), ("table", "tab1")]),
            &query
        ));

        let mut multi = managed("d", &[("database", "db1")]);
        multi.resources["database"].values.push("db2".to_owned());
        assert!(!precise_match(&multi, &query));
    }

    #[tokio::test]
    async fn lookup_ignores_wildcard_policies() -> Result<()> {
        let store = Arc::new(InMemoryRangerStore::new());
        store.insert_policy(managed("exact", &[("database", "db1")]));
        store.insert_policy(managed("prefix", &[("database", "db*")]));
        store.insert_policy(managed("all", &[("database", "*")]));

        let found = plugin(store).find_managed_policy(&db1()).await?;
        assert_eq!(found.map(|p| p.name), Some("exact".to_owned()));
        Ok(())
    }

    #[tokio::test]
    async fn unmanaged_policies_are_invisible() -> Result<()> {
        let store = Arc::new(InMemoryRangerStore::new());
        let mut unmanaged = managed("external", &[("database", "db1")]);
        unmanaged.policy_labels.clear();
        store.insert_policy(unmanaged);

        assert_eq!(plugin(store).find_managed_policy(&db1()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn two_managed_policies_are_ambiguous() {
        let store = Arc::new(InMemoryRangerStore::new());
        store.insert_policy(managed("one", &[("database", "db1")]));
        store.insert_policy(managed("two", &[("database", "db1")]));

        let err = plugin(store).find_managed_policy(&db1()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthorizationError>(),
            Some(&AuthorizationError::AmbiguousManagedPolicy {
                object: "catalog.db1".to_owned(),
                count: 2
            })
        );
    }

    #[tokio::test]
    async fn duplicate_access_types_are_corrupt() {
        let store = Arc::new(InMemoryRangerStore::new());
        let mut policy = managed("dup", &[("database", "db1")]);
        policy
            .policy_items
            .push(RangerPolicyItem::with_access("select"));
        store.insert_policy(policy);

        let err = plugin(store).find_managed_policy(&db1()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthorizationError>(),
            Some(AuthorizationError::CorruptManagedPolicy { .. })
        ));
    }

    #[test]
    fn multi_access_items_are_corrupt() {
        let mut policy = managed("multi", &[("database", "db1")]);
        policy.deny_policy_items.push(RangerPolicyItem {
            accesses: vec![
                RangerPolicyItemAccess::new("read"),
                RangerPolicyItemAccess::new("select"),
            ],
            ..Default::default()
        });
        assert!(validate_managed_policy(&policy).is_err());
    }

    #[test]
    fn same_access_may_be_allowed_and_denied() {
        let mut policy = managed("both", &[("database", "db1")]);
        policy
            .deny_policy_items
            .push(RangerPolicyItem::with_access("select"));
        assert!(validate_managed_policy(&policy).is_ok());
    }

    #[test]
    fn owner_items_are_counted_apart() {
        let mut policy = managed("owned", &[("database", "db1")]);
        policy
            .policy_items
            .push(RangerPolicyItem::owner_access("select"));
        assert!(validate_managed_policy(&policy).is_ok());

        policy
            .policy_items
            .push(RangerPolicyItem::owner_access("select"));
        assert!(validate_managed_policy(&policy).is_err());
    }
}
