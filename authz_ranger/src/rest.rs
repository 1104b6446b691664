//! Rest API interface for the Ranger admin server
//!

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use authz_core::logging::{debug, error};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use url::Url;

use crate::consts;
use crate::creds::RangerCredentials;
use crate::model::{
    GrantRevokeRoleRequest, RangerPolicy, RangerRole, VXGroup, VXGroupList, VXUser, VXUserList,
};
use crate::store::{Creation, Deletion, Principal, PrincipalKind, RangerStore};

pub(crate) struct RangerRestConfig {
    /// Per-request timeout.
    pub(crate) timeout: Duration,
    /// Retries for transient failures. Zero disables retrying.
    pub(crate) max_retries: u32,
}

impl Default for RangerRestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Wrapper struct for http functionality
pub struct RangerRestClient {
    base_url: Url,
    /// The credentials used to authenticate into Ranger.
    credentials: RangerCredentials,
    http_client: ClientWithMiddleware,
}

/// Outcome of a request whose failure may be an expected state.
enum Expected<T> {
    Ok(T),
    NotFound,
    AlreadyExists,
}

impl RangerRestClient {
    pub(crate) fn new(
        mut base_url: Url,
        credentials: RangerCredentials,
        config: RangerRestConfig,
    ) -> Result<Self> {
        credentials.validate()?;
        // Relative joins replace the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building http client")?;
        let mut client_builder = ClientBuilder::new(inner);
        if config.max_retries > 0 {
            let retry_policy =
                ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
            client_builder =
                client_builder.with(RetryTransientMiddleware::new_with_policy(retry_policy))
        }
        Ok(Self {
            base_url,
            credentials,
            http_client: client_builder.build(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("building url for {path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(consts::ACCEPT_HEADER, "application/json")
            .header(consts::USER_AGENT_HEADER, "authz-ranger")
    }

    /// Send a request, mapping 404 and "already exists" rejections to
    /// their own outcomes and every other failure to an error.
    async fn send(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Expected<reqwest::Response>> {
        let response = self
            .authenticated(request)
            .send()
            .await
            .with_context(|| format!("couldn't send request to {what}"))?;
        let status = response.status();
        if status.is_success() {
            return Ok(Expected::Ok(response));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(Expected::NotFound);
        }
        let body = response.text().await.unwrap_or_default();
        if (status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT)
            && body.to_ascii_lowercase().contains("already exist")
        {
            return Ok(Expected::AlreadyExists);
        }
        error!("{what} failed with {status}: {body}");
        bail!("{what} failed with {status}: {body}")
    }

    /// Send a request that must succeed.
    async fn send_ok(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        match self.send(request, what).await? {
            Expected::Ok(response) => Ok(response),
            Expected::NotFound => Err(anyhow!("{what} failed: not found")),
            Expected::AlreadyExists => Err(anyhow!("{what} failed: already exists")),
        }
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .with_context(|| format!("couldn't parse the response to {what}"))
    }

    async fn delete(&self, url: Url, what: &str) -> Result<Deletion> {
        match self.send(self.http_client.delete(url), what).await? {
            Expected::Ok(_) => Ok(Deletion::Deleted),
            Expected::NotFound => Ok(Deletion::NotFound),
            Expected::AlreadyExists => Err(anyhow!("{what} failed: unexpected response")),
        }
    }

    async fn create<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<Creation> {
        match self.send(self.http_client.post(url).json(body), what).await? {
            Expected::Ok(_) => Ok(Creation::Created),
            Expected::AlreadyExists => Ok(Creation::AlreadyExists),
            Expected::NotFound => Err(anyhow!("{what} failed: not found")),
        }
    }

    fn principal_endpoints(kind: PrincipalKind) -> (&'static str, &'static str) {
        match kind {
            PrincipalKind::User => (consts::USERS_SEARCH_ENDPOINT, consts::USERS_SECURE_ENDPOINT),
            PrincipalKind::Group => (
                consts::GROUPS_SEARCH_ENDPOINT,
                consts::GROUPS_SECURE_ENDPOINT,
            ),
        }
    }
}

#[async_trait]
impl RangerStore for RangerRestClient {
    async fn find_policies(&self, filter: &HashMap<String, String>) -> Result<Vec<RangerPolicy>> {
        let query: Vec<(&str, &str)> = filter
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let url = self.url(consts::POLICY_ENDPOINT, &query)?;
        debug!("searching policies: {url}");
        let response = self
            .send_ok(self.http_client.get(url), "search policies")
            .await?;
        Self::json(response, "search policies").await
    }

    async fn create_policy(&self, policy: &RangerPolicy) -> Result<RangerPolicy> {
        let what = format!("create policy {}", policy.name);
        let url = self.url(consts::POLICY_ENDPOINT, &[])?;
        let response = self
            .send_ok(self.http_client.post(url).json(policy), &what)
            .await?;
        Self::json(response, &what).await
    }

    async fn update_policy(&self, id: i64, policy: &RangerPolicy) -> Result<RangerPolicy> {
        let what = format!("update policy {}", policy.name);
        let url = self.url(&format!("{}/{id}", consts::POLICY_ENDPOINT), &[])?;
        let response = self
            .send_ok(self.http_client.put(url).json(policy), &what)
            .await?;
        Self::json(response, &what).await
    }

    async fn delete_policy(&self, id: i64) -> Result<Deletion> {
        let url = self.url(&format!("{}/{id}", consts::POLICY_ENDPOINT), &[])?;
        self.delete(url, &format!("delete policy {id}")).await
    }

    async fn search_principals(&self, kind: PrincipalKind, name: &str) -> Result<Vec<Principal>> {
        let (search, _) = Self::principal_endpoints(kind);
        let url = self.url(search, &[("name", name)])?;
        let what = format!("search {kind} {name}");
        let response = self.send_ok(self.http_client.get(url), &what).await?;
        // Ranger's name search is a partial match.
        let found: Vec<(Option<i64>, String)> = match kind {
            PrincipalKind::User => Self::json::<VXUserList>(response, &what)
                .await?
                .users
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect(),
            PrincipalKind::Group => Self::json::<VXGroupList>(response, &what)
                .await?
                .groups
                .into_iter()
                .map(|g| (g.id, g.name))
                .collect(),
        };
        Ok(found
            .into_iter()
            .filter(|(_, n)| n == name)
            .filter_map(|(id, name)| id.map(|id| Principal { id, name, kind }))
            .collect())
    }

    async fn create_principal(&self, kind: PrincipalKind, name: &str) -> Result<Creation> {
        let (_, secure) = Self::principal_endpoints(kind);
        let url = self.url(secure, &[])?;
        let what = format!("create {kind} {name}");
        match kind {
            PrincipalKind::User => {
                let user = VXUser {
                    name: name.to_owned(),
                    description: Some(name.to_owned()),
                    ..Default::default()
                };
                self.create(url, &user, &what).await
            }
            PrincipalKind::Group => {
                let group = VXGroup {
                    name: name.to_owned(),
                    ..Default::default()
                };
                self.create(url, &group, &what).await
            }
        }
    }

    async fn delete_principal(&self, kind: PrincipalKind, id: i64) -> Result<Deletion> {
        let (_, secure) = Self::principal_endpoints(kind);
        let url = self.url(&format!("{secure}/id/{id}"), &[("forceDelete", "true")])?;
        self.delete(url, &format!("delete {kind} {id}")).await
    }

    async fn get_role(&self, name: &str) -> Result<Option<RangerRole>> {
        let url = self.url(
            &format!("{}/name/{}", consts::ROLES_ENDPOINT, urlencoding::encode(name)),
            &[],
        )?;
        let what = format!("get role {name}");
        match self.send(self.http_client.get(url), &what).await? {
            Expected::Ok(response) => Ok(Some(Self::json(response, &what).await?)),
            Expected::NotFound => Ok(None),
            Expected::AlreadyExists => Err(anyhow!("{what} failed: unexpected response")),
        }
    }

    async fn create_role(&self, service_name: &str, role: &RangerRole) -> Result<Creation> {
        let url = self.url(consts::ROLES_ENDPOINT, &[("serviceName", service_name)])?;
        self.create(url, role, &format!("create role {}", role.name))
            .await
    }

    async fn delete_role(&self, service_name: &str, name: &str) -> Result<Deletion> {
        let url = self.url(
            &format!("{}/name/{}", consts::ROLES_ENDPOINT, urlencoding::encode(name)),
            &[
                ("serviceName", service_name),
                ("execUser", self.credentials.username.as_str()),
            ],
        )?;
        self.delete(url, &format!("delete role {name}")).await
    }

    async fn grant_role(&self, service_name: &str, request: &GrantRevokeRoleRequest) -> Result<()> {
        let url = self.url(
            &format!(
                "{}/grant/{}",
                consts::ROLES_ENDPOINT,
                urlencoding::encode(service_name)
            ),
            &[],
        )?;
        self.send_ok(
            self.http_client.put(url).json(request),
            &format!("grant roles {:?}", request.target_roles),
        )
        .await?;
        Ok(())
    }

    async fn revoke_role(
        &self,
        service_name: &str,
        request: &GrantRevokeRoleRequest,
    ) -> Result<()> {
        let url = self.url(
            &format!(
                "{}/revoke/{}",
                consts::ROLES_ENDPOINT,
                urlencoding::encode(service_name)
            ),
            &[],
        )?;
        self.send_ok(
            self.http_client.put(url).json(request),
            &format!("revoke roles {:?}", request.target_roles),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use maplit::hashmap;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RangerRestClient {
        RangerRestClient::new(
            Url::parse(&server.uri()).unwrap(),
            RangerCredentials::new("admin", "rangerR0cks!"),
            RangerRestConfig {
                max_retries: 0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_creds_fail_to_load() {
        assert!(RangerRestClient::new(
            Url::parse("http://localhost:6080").unwrap(),
            RangerCredentials::default(),
            RangerRestConfig::default(),
        )
        .is_err());
    }

    #[tokio::test]
    async fn policy_search_sends_the_filter() -> Result<()> {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("GET"))
            .and(path("/service/public/v2/api/policy"))
            .and(basic_auth("admin", "rangerR0cks!"))
            .and(query_param("serviceName", "hiveDev"))
            .and(query_param("resource:database", "db1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 3,
                "service": "hiveDev",
                "name": "analyst-catalog.db1",
                "resources": {"database": {"values": ["db1"]}}
            }])))
            .named("search policies")
            .mount_as_scoped(&server)
            .await;

        let policies = client(&server)
            .find_policies(&hashmap! {
                "serviceName".to_owned() => "hiveDev".to_owned(),
                "resource:database".to_owned() => "db1".to_owned(),
            })
            .await?;
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].id, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn missing_policy_deletes_as_not_found() -> Result<()> {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("DELETE"))
            .and(path("/service/public/v2/api/policy/9"))
            .respond_with(ResponseTemplate::new(404))
            .mount_as_scoped(&server)
            .await;
        assert_eq!(client(&server).delete_policy(9).await?, Deletion::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn existing_user_creates_as_already_exists() -> Result<()> {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("POST"))
            .and(path("/service/xusers/secure/users"))
            .and(body_partial_json(json!({"name": "alice"})))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"msgDesc": "XUser already exists with name alice"}"#),
            )
            .mount_as_scoped(&server)
            .await;
        assert_eq!(
            client(&server)
                .create_principal(PrincipalKind::User, "alice")
                .await?,
            Creation::AlreadyExists
        );
        Ok(())
    }

    #[tokio::test]
    async fn principal_search_keeps_exact_names() -> Result<()> {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("GET"))
            .and(path("/service/xusers/groups"))
            .and(query_param("name", "eng"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vXGroups": [{"id": 4, "name": "eng"}, {"id": 5, "name": "engineering"}]
            })))
            .mount_as_scoped(&server)
            .await;
        let found = client(&server)
            .search_principals(PrincipalKind::Group, "eng")
            .await?;
        assert_eq!(
            found,
            vec![Principal {
                id: 4,
                name: "eng".to_owned(),
                kind: PrincipalKind::Group
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_role_is_none() -> Result<()> {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("GET"))
            .and(path("/service/public/v2/api/roles/name/analyst"))
            .respond_with(ResponseTemplate::new(404))
            .mount_as_scoped(&server)
            .await;
        assert_eq!(client(&server).get_role("analyst").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_propagate() {
        let server = MockServer::start().await;
        let _guard = Mock::given(method("PUT"))
            .and(path("/service/public/v2/api/policy/3"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .named("500 server error")
            .mount_as_scoped(&server)
            .await;
        let policy = RangerPolicy {
            id: Some(3),
            name: "analyst-catalog.db1".to_owned(),
            ..Default::default()
        };
        let err = client(&server)
            .update_policy(3, &policy)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
