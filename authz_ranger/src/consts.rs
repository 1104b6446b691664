// Configuration keys
pub const ADMIN_URL: &str = "authorization.ranger.admin.url";
pub const AUTH_TYPE: &str = "authorization.ranger.auth.type";
pub const USERNAME: &str = "authorization.ranger.username";
pub const PASSWORD: &str = "authorization.ranger.password";
pub const SERVICE_NAME: &str = "authorization.ranger.service.name";
pub const SERVICE_TYPE: &str = "authorization.ranger.service.type";
pub const REQUEST_TIMEOUT_SECS: &str = "authorization.ranger.request.timeout.secs";
pub const RETRY_MAX: &str = "authorization.ranger.retry.max";
pub const GRANT_MODE: &str = "authorization.ranger.grant.mode";
pub const HDFS_ROOT: &str = "authorization.ranger.hdfs.root";

/// Label that marks a policy as managed by the catalog.
pub const MANAGED_BY_CATALOG: &str = "MANAGED_BY_CATALOG";
/// Placeholder user carried by items before a concrete owner is known.
pub const OWNER_PLACEHOLDER: &str = "{OWNER}";
/// Role name used when naming policies created for ownership.
pub const OWNER_ROLE_NAME: &str = "OWNER";

// Policy search filter keys
pub const SEARCH_SERVICE_NAME: &str = "serviceName";
pub const SEARCH_POLICY_LABELS: &str = "policyLabelsPartial";
pub const SEARCH_RESOURCE_PREFIX: &str = "resource:";

// Admin REST endpoints
pub const POLICY_ENDPOINT: &str = "service/public/v2/api/policy";
pub const ROLES_ENDPOINT: &str = "service/public/v2/api/roles";
pub const USERS_SEARCH_ENDPOINT: &str = "service/xusers/users";
pub const USERS_SECURE_ENDPOINT: &str = "service/xusers/secure/users";
pub const GROUPS_SEARCH_ENDPOINT: &str = "service/xusers/groups";
pub const GROUPS_SECURE_ENDPOINT: &str = "service/xusers/secure/groups";

pub const ACCEPT_HEADER: &str = "Accept";
pub const USER_AGENT_HEADER: &str = "User-Agent";
