//! GCP service-account keys.
//!
//! Key resource names have the shape
//! `projects/{PROJECT}/serviceAccounts/{EMAIL}/keys/{KEY}`; `account`,
//! `full_account` and `id` are cut out of it, and create/delete build it back
//! from `(scope, full_account, id)`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::constants;
use crate::core::normalize;
use crate::error::{KeysError, Result};
use crate::models::key::{Key, KeyStatus, NewKey};
use crate::models::provider::Provider;
use crate::providers::KeyProvider;
use crate::util::http::{join_url, HttpClient};

const SERVICE_ACCOUNT_PREFIX: &str = "serviceAccounts/";
const SERVICE_ACCOUNT_SUFFIX: &str = "@";
const KEY_SEGMENT: &str = "/keys/";
const KEY_SUFFIX: &str = "";
const USER_MANAGED: &str = "USER_MANAGED";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub email: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountPage {
    #[serde(default)]
    pub accounts: Vec<ServiceAccount>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    pub name: String,
    #[serde(default)]
    pub valid_after_time: String,
    #[serde(default)]
    pub valid_before_time: String,
    #[serde(default)]
    pub key_type: String,
    #[serde(default)]
    pub disabled: bool,
}

impl ServiceAccountKey {
    /// Keys of unknown type are treated as user-managed.
    fn is_user_managed(&self) -> bool {
        self.key_type.is_empty() || self.key_type == USER_MANAGED
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedServiceAccountKey {
    pub name: String,
    #[serde(default)]
    pub private_key_data: String,
}

/// The IAM v1 operations the adapter needs.
pub trait GcpIamApi: Send + Sync {
    /// One page of service accounts under `project_name`; an empty
    /// `page_token` requests the first page.
    fn list_service_accounts(
        &self,
        project_name: &str,
        page_token: &str,
        credential: &str,
    ) -> Result<ServiceAccountPage>;
    /// User-managed keys of a service account.
    fn list_keys(&self, service_account_name: &str, credential: &str) -> Result<Vec<ServiceAccountKey>>;
    fn create_key(&self, service_account_name: &str, credential: &str) -> Result<CreatedServiceAccountKey>;
    fn delete_key(&self, key_name: &str, credential: &str) -> Result<()>;
}

/// `projects/{PROJECT}`
pub fn project_name(project: &str) -> String {
    format!("projects/{}", project)
}

/// `projects/{PROJECT}/serviceAccounts/{SA}`
pub fn service_account_name(project: &str, service_account: &str) -> String {
    format!("{}/serviceAccounts/{}", project_name(project), service_account)
}

/// `projects/{PROJECT}/serviceAccounts/{SA}/keys/{KEY}`
pub fn service_account_key_name(project: &str, service_account: &str, key: &str) -> String {
    format!("{}/keys/{}", service_account_name(project, service_account), key)
}

/// Parts of a key resource name: `(account, full_account, id)`.
///
/// The id is read after the service account segment, so a project id that
/// itself contains `keys` does not shift it.
pub fn split_key_name(name: &str) -> Result<(String, String, String)> {
    let account = normalize::extract(name, SERVICE_ACCOUNT_PREFIX, SERVICE_ACCOUNT_SUFFIX)?;
    let full_account = normalize::extract(name, SERVICE_ACCOUNT_PREFIX, KEY_SEGMENT)?;
    let key_start = format!("{}{}{}", SERVICE_ACCOUNT_PREFIX, full_account, KEY_SEGMENT);
    let id = normalize::extract(name, &key_start, KEY_SUFFIX)?;
    Ok((account, full_account, id))
}

fn validate_project(project: &str) -> Result<()> {
    if project.is_empty() {
        return Err(KeysError::Configuration("GCP project string needs to be set".into()));
    }
    Ok(())
}

pub struct GcpKeys<C = GcpHttpClient> {
    client: C,
}

impl<C: GcpIamApi> GcpKeys<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Every service account in the project, following page tokens.
    fn service_accounts(&self, project: &str, credential: &str) -> Result<Vec<ServiceAccount>> {
        let name = project_name(project);
        let mut accounts = Vec::new();
        let mut page_token = String::new();
        loop {
            let page = self.client.list_service_accounts(&name, &page_token, credential)?;
            accounts.extend(page.accounts);
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }
        debug!(project, count = accounts.len(), "listed service accounts");
        Ok(accounts)
    }

    fn user_managed_keys(&self, project: &str, account: &str, credential: &str) -> Result<Vec<ServiceAccountKey>> {
        let keys = self
            .client
            .list_keys(&service_account_name(project, account), credential)?;
        Ok(keys.into_iter().filter(ServiceAccountKey::is_user_managed).collect())
    }
}

fn key_from_gcp_key(gcp_key: &ServiceAccountKey, project: &str, credential: &str) -> Result<Key> {
    let created = normalize::parse_timestamp(constants::GCP_TIME_FORMAT, &gcp_key.valid_after_time)?;
    let expires = normalize::parse_timestamp(constants::GCP_TIME_FORMAT, &gcp_key.valid_before_time)?;
    let (account, full_account, id) = split_key_name(&gcp_key.name)?;
    Ok(Key {
        name: normalize::display_name(&account, &id),
        account,
        full_account,
        age: normalize::age_minutes(created),
        id,
        life_remaining: normalize::life_remaining_minutes(expires),
        provider: Provider::new(constants::GCP_PROVIDER, project).with_credential(credential),
        status: KeyStatus::from_active(!gcp_key.disabled),
    })
}

impl<C: GcpIamApi> KeyProvider for GcpKeys<C> {
    fn keys(&self, scope: &str, include_inactive: bool, credential: &str) -> Result<Vec<Key>> {
        validate_project(scope)?;
        let mut keys = Vec::new();
        for account in self.service_accounts(scope, credential)? {
            if account.disabled && !include_inactive {
                continue;
            }
            for gcp_key in self.user_managed_keys(scope, &account.email, credential)? {
                let mut key = key_from_gcp_key(&gcp_key, scope, credential)?;
                if account.disabled {
                    key.status = KeyStatus::Inactive;
                }
                if include_inactive || key.status.is_active() {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    fn create_key(&self, scope: &str, account: &str, credential: &str) -> Result<NewKey> {
        validate_project(scope)?;
        let existing = self.user_managed_keys(scope, account, credential)?;
        if existing.len() >= constants::GCP_ACCESS_KEY_LIMIT {
            return Err(KeysError::KeyLimit {
                account: account.to_string(),
                limit: constants::GCP_ACCESS_KEY_LIMIT,
            });
        }
        let created = self
            .client
            .create_key(&service_account_name(scope, account), credential)?;
        let (_, _, id) = split_key_name(&created.name)?;
        Ok(NewKey::new(id, created.private_key_data))
    }

    fn delete_key(&self, scope: &str, account: &str, key_id: &str, credential: &str) -> Result<()> {
        validate_project(scope)?;
        self.client
            .delete_key(&service_account_key_name(scope, account, key_id), credential)
    }
}

/// IAM v1 REST client authenticating with an OAuth2 bearer token.
pub struct GcpHttpClient {
    http: HttpClient,
    endpoint: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct KeyList {
    #[serde(default)]
    keys: Vec<ServiceAccountKey>,
}

impl GcpHttpClient {
    pub fn new(http: HttpClient, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    fn url(&self, resource: &str) -> String {
        join_url(&self.endpoint, &format!("v1/{}", resource))
    }

    fn bearer(credential: &str) -> Result<&str> {
        if credential.is_empty() {
            return Err(KeysError::Configuration(
                "gcp requests need an OAuth2 access token credential".into(),
            ));
        }
        Ok(credential)
    }

    fn send<T: DeserializeOwned>(&self, request: reqwest::blocking::RequestBuilder) -> Result<T> {
        let (status, body) = self.http.send(request)?;
        if !status.is_success() {
            return Err(gcp_error(status.as_u16(), &body));
        }
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| KeysError::decode(constants::GCP_PROVIDER, e))
    }
}

fn gcp_error(status: u16, body: &str) -> KeysError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "{} {}: {}",
            envelope.error.code, envelope.error.status, envelope.error.message
        ),
        Err(_) => format!("http {}: {}", status, body.trim()),
    };
    KeysError::api(constants::GCP_PROVIDER, message)
}

impl GcpIamApi for GcpHttpClient {
    fn list_service_accounts(
        &self,
        project_name: &str,
        page_token: &str,
        credential: &str,
    ) -> Result<ServiceAccountPage> {
        let mut request = self
            .http
            .client()
            .get(self.url(&format!("{}/serviceAccounts", project_name)))
            .bearer_auth(Self::bearer(credential)?);
        if !page_token.is_empty() {
            request = request.query(&[("pageToken", page_token)]);
        }
        self.send(request)
    }

    fn list_keys(&self, service_account_name: &str, credential: &str) -> Result<Vec<ServiceAccountKey>> {
        let request = self
            .http
            .client()
            .get(self.url(&format!("{}/keys", service_account_name)))
            .query(&[("keyTypes", USER_MANAGED)])
            .bearer_auth(Self::bearer(credential)?);
        let list: KeyList = self.send(request)?;
        Ok(list.keys)
    }

    fn create_key(&self, service_account_name: &str, credential: &str) -> Result<CreatedServiceAccountKey> {
        let request = self
            .http
            .client()
            .post(self.url(&format!("{}/keys", service_account_name)))
            .bearer_auth(Self::bearer(credential)?)
            .json(&serde_json::json!({}));
        self.send(request)
    }

    fn delete_key(&self, key_name: &str, credential: &str) -> Result<()> {
        let request = self
            .http
            .client()
            .delete(self.url(key_name))
            .bearer_auth(Self::bearer(credential)?);
        let _: serde_json::Value = self.send(request)?;
        Ok(())
    }
}
