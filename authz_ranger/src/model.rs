//! Serde model of the Ranger admin API objects the plugin reads and writes.
//!
//! Fields the plugin doesn't interpret are kept in `extra` maps so that a
//! read-modify-write cycle never drops them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts;

fn default_true() -> bool {
    true
}

/// A Ranger policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerPolicy {
    /// Assigned by Ranger. Absent until the policy is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub service: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub policy_labels: Vec<String>,
    /// Resource level to resource values, in the service's level order.
    #[serde(default)]
    pub resources: IndexMap<String, RangerPolicyResource>,
    #[serde(default)]
    pub policy_items: Vec<RangerPolicyItem>,
    #[serde(default)]
    pub deny_policy_items: Vec<RangerPolicyItem>,
    #[serde(default)]
    pub allow_exceptions: Vec<RangerPolicyItem>,
    #[serde(default)]
    pub deny_exceptions: Vec<RangerPolicyItem>,
    #[serde(default)]
    pub row_filter_policy_items: Vec<RangerPolicyItem>,
    #[serde(default)]
    pub data_mask_policy_items: Vec<RangerPolicyItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RangerPolicy {
    /// A new, not yet persisted policy labeled as managed by the catalog.
    pub fn new_managed<S: Into<String>>(
        service: S,
        name: S,
        resources: &IndexMap<String, String>,
    ) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            is_enabled: true,
            policy_labels: vec![consts::MANAGED_BY_CATALOG.to_owned()],
            resources: resources
                .iter()
                .map(|(k, v)| (k.to_owned(), RangerPolicyResource::new(v)))
                .collect(),
            ..Default::default()
        }
    }

    /// Whether the policy carries the management label.
    pub fn is_managed(&self) -> bool {
        self.policy_labels
            .iter()
            .any(|l| l == consts::MANAGED_BY_CATALOG)
    }

    /// Every item list, with the name Ranger gives it.
    pub fn item_lists(&self) -> [(&'static str, &Vec<RangerPolicyItem>); 6] {
        [
            ("policyItems", &self.policy_items),
            ("denyPolicyItems", &self.deny_policy_items),
            ("allowExceptions", &self.allow_exceptions),
            ("denyExceptions", &self.deny_exceptions),
            ("rowFilterPolicyItems", &self.row_filter_policy_items),
            ("dataMaskPolicyItems", &self.data_mask_policy_items),
        ]
    }

    /// True when no item list holds any item.
    pub fn has_no_items(&self) -> bool {
        self.item_lists().iter().all(|(_, items)| items.is_empty())
    }
}

/// The values a policy holds for one resource level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerPolicyResource {
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub is_excludes: bool,
    #[serde(default)]
    pub is_recursive: bool,
}

impl RangerPolicyResource {
    /// A single-valued, non-excluding, non-recursive resource.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            values: vec![value.into()],
            ..Default::default()
        }
    }
}

/// One access in a policy item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerPolicyItemAccess {
    #[serde(rename = "type")]
    pub access_type: String,
    #[serde(default = "default_true")]
    pub is_allowed: bool,
}

impl RangerPolicyItemAccess {
    pub fn new<S: Into<String>>(access_type: S) -> Self {
        Self {
            access_type: access_type.into(),
            is_allowed: true,
        }
    }
}

/// Principals granted (or denied) a set of accesses.
///
/// Row filter and data mask items share this shape; their filter and mask
/// definitions land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerPolicyItem {
    #[serde(default)]
    pub accesses: Vec<RangerPolicyItemAccess>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub delegate_admin: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RangerPolicyItem {
    /// An item carrying exactly one access type.
    pub fn with_access<S: Into<String>>(access_type: S) -> Self {
        Self {
            accesses: vec![RangerPolicyItemAccess::new(access_type)],
            ..Default::default()
        }
    }

    /// The access type, when the item carries exactly one.
    pub fn single_access(&self) -> Option<&str> {
        match self.accesses.as_slice() {
            [access] => Some(&access.access_type),
            _ => None,
        }
    }

    /// An owner item. Owners may administer the resource, and the
    /// `delegateAdmin` flag keeps their items apart from role grants.
    pub fn owner_access<S: Into<String>>(access_type: S) -> Self {
        Self {
            delegate_admin: true,
            ..Self::with_access(access_type)
        }
    }

    pub fn is_owner_item(&self) -> bool {
        self.delegate_admin
    }
}

/// A Ranger user (`VXUser`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VXUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A page of users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VXUserList {
    #[serde(rename = "vXUsers", default)]
    pub users: Vec<VXUser>,
}

/// A Ranger group (`VXGroup`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VXGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A page of groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VXGroupList {
    #[serde(rename = "vXGroups", default)]
    pub groups: Vec<VXGroup>,
}

/// A member of a native Ranger role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// A native Ranger role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub users: Vec<RoleMember>,
    #[serde(default)]
    pub groups: Vec<RoleMember>,
    #[serde(default)]
    pub roles: Vec<RoleMember>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the native role grant and revoke endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRevokeRoleRequest {
    /// The user on whose behalf the grant is made.
    pub grantor: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Names of the native roles being granted or revoked.
    pub target_roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"{
        "id": 7,
        "guid": "1b4a",
        "service": "hiveDev",
        "name": "analyst-catalog.db1",
        "isEnabled": true,
        "isAuditEnabled": true,
        "policyLabels": ["MANAGED_BY_CATALOG"],
        "resources": {
            "database": {"values": ["db1"], "isExcludes": false, "isRecursive": false},
            "table": {"values": ["*"]}
        },
        "policyItems": [
            {"accesses": [{"type": "select", "isAllowed": true}], "roles": ["analyst"], "conditions": []}
        ]
    }"#;

    #[test]
    fn unknown_fields_survive_a_read_modify_write() -> anyhow::Result<()> {
        let mut policy: RangerPolicy = serde_json::from_str(POLICY)?;
        assert!(policy.is_managed());
        assert_eq!(policy.resources.keys().collect::<Vec<_>>(), ["database", "table"]);
        policy.policy_items[0].roles.push("auditor".to_owned());

        let written = serde_json::to_value(&policy)?;
        assert_eq!(written["isAuditEnabled"], Value::Bool(true));
        assert_eq!(written["policyItems"][0]["conditions"], serde_json::json!([]));
        assert_eq!(
            written["policyItems"][0]["roles"],
            serde_json::json!(["analyst", "auditor"])
        );
        Ok(())
    }

    #[test]
    fn new_policies_are_labeled_and_have_no_id() -> anyhow::Result<()> {
        let resources: IndexMap<String, String> =
            [("database".to_owned(), "db1".to_owned())].into_iter().collect();
        let policy = RangerPolicy::new_managed("hiveDev", "analyst-catalog.db1", &resources);
        assert!(policy.is_managed());
        assert!(policy.has_no_items());

        let written = serde_json::to_value(&policy)?;
        assert!(written.get("id").is_none());
        assert_eq!(written["resources"]["database"]["values"], serde_json::json!(["db1"]));
        Ok(())
    }

    #[test]
    fn single_access_requires_exactly_one() {
        let mut item = RangerPolicyItem::with_access("select");
        assert_eq!(item.single_access(), Some("select"));
        item.accesses.push(RangerPolicyItemAccess::new("read"));
        assert_eq!(item.single_access(), None);
    }

    #[test]
    fn owner_items_delegate_admin() -> anyhow::Result<()> {
        let item = RangerPolicyItem::owner_access("all");
        assert!(item.is_owner_item());
        assert!(!RangerPolicyItem::with_access("all").is_owner_item());

        let written = serde_json::to_value(&item)?;
        assert_eq!(written["delegateAdmin"], serde_json::json!(true));
        Ok(())
    }
}
