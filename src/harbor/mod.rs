// ldapsynctool/src/harbor/mod.rs
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::HarborConfig;
use crate::config::ldap::SettingsMap;
use crate::errors::{Result, SyncError};

const LDAP_USERS_SEARCH_PATH: &str = "api/v2.0/ldap/users/search";
const LDAP_USERS_IMPORT_PATH: &str = "api/v2.0/ldap/users/import";
const USERS_PATH: &str = "api/v2.0/users";
const USER_GROUPS_PATH: &str = "api/v2.0/usergroups";
const CONFIGURATIONS_PATH: &str = "api/v2.0/configurations";

/// `group_type` Harbor uses for LDAP-backed user groups.
pub const LDAP_GROUP_TYPE: i32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserGroupRecord {
    /// Empty for groups that are not LDAP-backed.
    #[serde(default)]
    pub ldap_group_dn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUserGroup {
    pub group_name: String,
    pub ldap_group_dn: String,
    pub group_type: i32,
}

impl NewUserGroup {
    pub fn ldap(group_name: String, ldap_group_dn: String) -> Self {
        NewUserGroup {
            group_name,
            ldap_group_dn,
            group_type: LDAP_GROUP_TYPE,
        }
    }
}

#[derive(Debug, Serialize)]
struct LdapImportRequest<'a> {
    ldap_uid_list: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Authenticated client for the Harbor REST API.
///
/// Uses basic auth on every request and keeps no cookies, so the client holds
/// no state between calls.
#[derive(Clone)]
pub struct HarborClient {
    http: reqwest::Client,
    base_url: Url,
    login: String,
    password: String,
}

impl HarborClient {
    pub fn new(config: &HarborConfig) -> Result<Self> {
        let mut base = config.url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SyncError::transport("HTTP client setup", e))?;

        Ok(HarborClient {
            http,
            base_url,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self
            .http
            .get(self.endpoint(path)?)
            .basic_auth(&self.login, Some(&self.password)))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self
            .http
            .post(self.endpoint(path)?)
            .basic_auth(&self.login, Some(&self.password)))
    }

    /// Every user the LDAP integration can see, in one unpaginated call.
    pub async fn search_ldap_users(&self) -> Result<Vec<UserRecord>> {
        fetch_list(self.get(LDAP_USERS_SEARCH_PATH)?, "LDAP user search").await
    }

    pub async fn list_users(&self, page: u32, page_size: usize) -> Result<Vec<UserRecord>> {
        let request = self.get(USERS_PATH)?.query(&page_query(page, page_size));
        fetch_list(request, "user list").await
    }

    pub async fn import_ldap_users(&self, uids: &[String]) -> Result<()> {
        let request = self
            .post(LDAP_USERS_IMPORT_PATH)?
            .json(&LdapImportRequest { ldap_uid_list: uids });
        let (status, body) = send(request, "LDAP user import").await?;
        expect_status(status, body, &[StatusCode::OK], "LDAP user import")?;
        Ok(())
    }

    pub async fn configurations(&self) -> Result<SettingsMap> {
        fetch_json(self.get(CONFIGURATIONS_PATH)?, "configuration fetch").await
    }

    pub async fn list_user_groups(&self, page: u32, page_size: usize) -> Result<Vec<UserGroupRecord>> {
        let request = self.get(USER_GROUPS_PATH)?.query(&page_query(page, page_size));
        fetch_list(request, "user group list").await
    }

    /// Creates a user group. A 409 means Harbor already has it and is not an error.
    pub async fn create_user_group(&self, group: &NewUserGroup) -> Result<CreateOutcome> {
        let request = self.post(USER_GROUPS_PATH)?.json(group);
        let (status, body) = send(request, "user group insert").await?;
        let (status, _) = expect_status(
            status,
            body,
            &[StatusCode::CREATED, StatusCode::CONFLICT],
            "user group insert",
        )?;
        if status == StatusCode::CREATED {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }
}

fn page_query(page: u32, page_size: usize) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("page_size", page_size.to_string())]
}

async fn send(request: RequestBuilder, context: &str) -> Result<(StatusCode, String)> {
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::transport(context, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SyncError::transport(context, e))?;
    Ok((status, body))
}

fn expect_status(
    status: StatusCode,
    body: String,
    accepted: &[StatusCode],
    context: &str,
) -> Result<(StatusCode, String)> {
    if accepted.contains(&status) {
        Ok((status, body))
    } else {
        Err(SyncError::UnexpectedStatus {
            context: context.to_string(),
            status,
            body,
        })
    }
}

async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, context: &str) -> Result<T> {
    let (status, body) = send(request, context).await?;
    let (_, body) = expect_status(status, body, &[StatusCode::OK], context)?;
    serde_json::from_str(&body).map_err(|source| SyncError::Decode {
        context: context.to_string(),
        source,
    })
}

/// Like [`fetch_json`] for list endpoints; a `null` body is an empty list.
async fn fetch_list<T: DeserializeOwned>(request: RequestBuilder, context: &str) -> Result<Vec<T>> {
    let items: Option<Vec<T>> = fetch_json(request, context).await?;
    Ok(items.unwrap_or_default())
}
