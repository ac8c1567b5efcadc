//! AWS IAM access keys.
//!
//! Access keys never expire, so `life_remaining` is always `0`. The key's
//! `full_account` is the IAM user name.

use std::collections::BTreeMap;

use chrono::Utc;
use reqwest::Url;
use tracing::debug;

use crate::constants;
use crate::core::normalize;
use crate::error::{KeysError, Result};
use crate::models::key::{Key, KeyStatus, NewKey};
use crate::models::provider::Provider;
use crate::providers::KeyProvider;
use crate::util::http::HttpClient;
use crate::util::sigv4::{AwsCredentials, Signer};
use crate::util::xml;

/// Access key metadata as IAM reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeyMetadata {
    pub user_name: String,
    pub access_key_id: String,
    pub status: String,
    pub create_date: String,
}

/// The IAM operations the adapter needs.
pub trait IamApi: Send + Sync {
    /// Names of every IAM user, across all pages.
    fn list_users(&self, credential: &str) -> Result<Vec<String>>;
    fn list_access_keys(&self, user: &str, credential: &str) -> Result<Vec<AccessKeyMetadata>>;
    fn create_access_key(&self, user: &str, credential: &str) -> Result<NewKey>;
    fn delete_access_key(&self, user: &str, key_id: &str, credential: &str) -> Result<()>;
}

pub struct AwsKeys<C = IamHttpClient> {
    client: C,
}

impl<C: IamApi> AwsKeys<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    fn key_from_metadata(&self, meta: &AccessKeyMetadata, scope: &str, credential: &str) -> Result<Key> {
        let created = normalize::parse_timestamp(constants::AWS_TIME_FORMAT, &meta.create_date)?;
        Ok(Key {
            account: meta.user_name.clone(),
            full_account: meta.user_name.clone(),
            age: normalize::age_minutes(created),
            id: meta.access_key_id.clone(),
            life_remaining: 0.0,
            name: normalize::display_name(&meta.user_name, &meta.access_key_id),
            provider: Provider::new(constants::AWS_PROVIDER, scope).with_credential(credential),
            status: status(&meta.status),
        })
    }
}

fn status(iam_status: &str) -> KeyStatus {
    KeyStatus::from_active(iam_status == "Active")
}

impl<C: IamApi> KeyProvider for AwsKeys<C> {
    fn keys(&self, scope: &str, include_inactive: bool, credential: &str) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        for user in self.client.list_users(credential)? {
            for meta in self.client.list_access_keys(&user, credential)? {
                if !include_inactive && !status(&meta.status).is_active() {
                    continue;
                }
                keys.push(self.key_from_metadata(&meta, scope, credential)?);
            }
        }
        Ok(keys)
    }

    fn create_key(&self, _scope: &str, account: &str, credential: &str) -> Result<NewKey> {
        let existing = self.client.list_access_keys(account, credential)?;
        if existing.len() >= constants::AWS_ACCESS_KEY_LIMIT {
            return Err(KeysError::KeyLimit {
                account: account.to_string(),
                limit: constants::AWS_ACCESS_KEY_LIMIT,
            });
        }
        self.client.create_access_key(account, credential)
    }

    fn delete_key(&self, _scope: &str, account: &str, key_id: &str, credential: &str) -> Result<()> {
        self.client.delete_access_key(account, key_id, credential)
    }
}

/// IAM Query API client signing `GET` requests with SigV4.
pub struct IamHttpClient {
    http: HttpClient,
    endpoint: String,
    region: String,
}

impl IamHttpClient {
    pub fn new(http: HttpClient, endpoint: &str, region: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: region.to_string(),
        }
    }

    fn host(&self) -> Result<String> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| KeysError::Configuration(format!("aws endpoint {}: {}", self.endpoint, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| KeysError::Configuration(format!("aws endpoint {} has no host", self.endpoint)))?;
        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    fn call(&self, action: &str, mut params: BTreeMap<String, String>, credential: &str) -> Result<String> {
        let credentials = AwsCredentials::resolve(credential)?;
        params.insert("Action".into(), action.into());
        params.insert("Version".into(), constants::AWS_IAM_API_VERSION.into());

        let signer = Signer {
            credentials: &credentials,
            region: &self.region,
            service: "iam",
        };
        let signed = signer.sign_get(&self.host()?, &params, Utc::now())?;

        debug!(action, "iam request");
        let mut request = self
            .http
            .client()
            .get(format!("{}/?{}", self.endpoint, signed.query));
        for (name, value) in signed.headers {
            request = request.header(name, value);
        }
        let (status, body) = self.http.send(request)?;
        if !status.is_success() {
            return Err(iam_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Follow `Marker`/`IsTruncated` and collect every member of `container`.
    fn paged(
        &self,
        action: &str,
        params: BTreeMap<String, String>,
        container: &str,
        credential: &str,
    ) -> Result<Vec<BTreeMap<String, String>>> {
        let mut members = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut page_params = params.clone();
            page_params.insert("MaxItems".into(), constants::AWS_MAX_ITEMS.to_string());
            if let Some(m) = marker.take() {
                page_params.insert("Marker".into(), m);
            }
            let body = self.call(action, page_params, credential)?;
            members.extend(xml::members(&body, container).map_err(|e| decode_error(&e))?);

            let truncated = xml::first_text(&body, "IsTruncated").map_err(|e| decode_error(&e))?;
            if truncated.as_deref() != Some("true") {
                break;
            }
            marker = xml::first_text(&body, "Marker").map_err(|e| decode_error(&e))?;
            if marker.is_none() {
                return Err(KeysError::decode(
                    constants::AWS_PROVIDER,
                    format!("{} response truncated without a marker", action),
                ));
            }
        }
        Ok(members)
    }
}

fn field(member: &BTreeMap<String, String>, name: &str) -> Result<String> {
    member
        .get(name)
        .cloned()
        .ok_or_else(|| KeysError::decode(constants::AWS_PROVIDER, format!("missing {}", name)))
}

fn decode_error(e: &quick_xml::Error) -> KeysError {
    KeysError::decode(constants::AWS_PROVIDER, e)
}

fn iam_error(status: u16, body: &str) -> KeysError {
    let code = xml::first_text(body, "Code").ok().flatten();
    let message = xml::first_text(body, "Message").ok().flatten();
    let message = match (code, message) {
        (Some(code), Some(message)) => format!("{}: {} (http {})", code, message, status),
        (Some(code), None) => format!("{} (http {})", code, status),
        _ => format!("http {}: {}", status, body.trim()),
    };
    KeysError::api(constants::AWS_PROVIDER, message)
}

impl IamApi for IamHttpClient {
    fn list_users(&self, credential: &str) -> Result<Vec<String>> {
        self.paged("ListUsers", BTreeMap::new(), "Users", credential)?
            .iter()
            .map(|member| field(member, "UserName"))
            .collect()
    }

    fn list_access_keys(&self, user: &str, credential: &str) -> Result<Vec<AccessKeyMetadata>> {
        let mut params = BTreeMap::new();
        params.insert("UserName".to_string(), user.to_string());
        self.paged("ListAccessKeys", params, "AccessKeyMetadata", credential)?
            .iter()
            .map(|member| {
                Ok(AccessKeyMetadata {
                    user_name: field(member, "UserName")?,
                    access_key_id: field(member, "AccessKeyId")?,
                    status: field(member, "Status")?,
                    create_date: field(member, "CreateDate")?,
                })
            })
            .collect()
    }

    fn create_access_key(&self, user: &str, credential: &str) -> Result<NewKey> {
        let mut params = BTreeMap::new();
        params.insert("UserName".to_string(), user.to_string());
        let body = self.call("CreateAccessKey", params, credential)?;
        let text = |tag: &str| -> Result<String> {
            xml::first_text(&body, tag)
                .map_err(|e| decode_error(&e))?
                .ok_or_else(|| KeysError::decode(constants::AWS_PROVIDER, format!("missing {}", tag)))
        };
        Ok(NewKey::new(text("AccessKeyId")?, text("SecretAccessKey")?))
    }

    fn delete_access_key(&self, user: &str, key_id: &str, credential: &str) -> Result<()> {
        let mut params = BTreeMap::new();
        params.insert("UserName".to_string(), user.to_string());
        params.insert("AccessKeyId".to_string(), key_id.to_string());
        self.call("DeleteAccessKey", params, credential)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIam {
        keys: Vec<AccessKeyMetadata>,
        created: Mutex<Vec<String>>,
        deleted: Mutex<Vec<(String, String)>>,
    }

    fn meta(user: &str, id: &str, status: &str, created: &str) -> AccessKeyMetadata {
        AccessKeyMetadata {
            user_name: user.into(),
            access_key_id: id.into(),
            status: status.into(),
            create_date: created.into(),
        }
    }

    impl IamApi for FakeIam {
        fn list_users(&self, _credential: &str) -> Result<Vec<String>> {
            let mut users: Vec<String> = self.keys.iter().map(|k| k.user_name.clone()).collect();
            users.dedup();
            Ok(users)
        }

        fn list_access_keys(&self, user: &str, _credential: &str) -> Result<Vec<AccessKeyMetadata>> {
            Ok(self.keys.iter().filter(|k| k.user_name == user).cloned().collect())
        }

        fn create_access_key(&self, user: &str, _credential: &str) -> Result<NewKey> {
            self.created.lock().unwrap().push(user.to_string());
            Ok(NewKey::new("AKIANEW", "secret"))
        }

        fn delete_access_key(&self, user: &str, key_id: &str, _credential: &str) -> Result<()> {
            self.deleted
                .lock()
                .unwrap()
                .push((user.to_string(), key_id.to_string()));
            Ok(())
        }
    }

    fn adapter() -> AwsKeys<FakeIam> {
        AwsKeys::new(FakeIam {
            keys: vec![
                meta("alice", "AKIAALICE0000001", "Active", "2020-01-01T00:00:00Z"),
                meta("alice", "AKIAALICE0000002", "Inactive", "2020-02-01T00:00:00Z"),
                meta("bob", "AKIABOB000000001", "Active", "2021-06-15T12:30:00Z"),
            ],
            ..Default::default()
        })
    }

    #[test]
    fn test_keys_excludes_inactive() {
        let keys = adapter().keys("", false, "cred").unwrap();
        let ids: Vec<_> = keys.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["AKIAALICE0000001", "AKIABOB000000001"]);
    }

    #[test]
    fn test_keys_include_inactive() {
        let keys = adapter().keys("", true, "cred").unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1].status, KeyStatus::Inactive);
    }

    #[test]
    fn test_key_normalization() {
        let keys = adapter().keys("", false, "cred").unwrap();
        let key = &keys[0];
        assert_eq!(key.account, "alice");
        assert_eq!(key.full_account, "alice");
        assert_eq!(key.name, "alice_000001");
        assert_eq!(key.life_remaining, 0.0);
        assert!(key.age > 0.0);
        assert_eq!(key.provider.provider, "aws");
        assert_eq!(key.provider.credential, "cred");
        assert_eq!(key.status, KeyStatus::Active);
    }

    #[test]
    fn test_unparseable_create_date_fails_whole_call() {
        let adapter = AwsKeys::new(FakeIam {
            keys: vec![
                meta("alice", "AKIA1", "Active", "2020-01-01T00:00:00Z"),
                meta("bob", "AKIA2", "Active", "yesterday"),
            ],
            ..Default::default()
        });
        let err = adapter.keys("", false, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Normalization);
    }

    #[test]
    fn test_create_key_enforces_limit() {
        let adapter = adapter();
        let err = adapter.create_key("", "alice", "").unwrap_err();
        assert!(matches!(err, KeysError::KeyLimit { limit: 2, .. }));
        assert!(adapter.client.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_create_key_below_limit() {
        let adapter = adapter();
        let created = adapter.create_key("", "bob", "").unwrap();
        assert_eq!(created.id, "AKIANEW");
        assert_eq!(created.secret.as_str(), "secret");
        assert_eq!(adapter.client.created.lock().unwrap().as_slice(), &["bob".to_string()]);
    }

    #[test]
    fn test_delete_key() {
        let adapter = adapter();
        adapter.delete_key("", "bob", "AKIABOB000000001", "").unwrap();
        assert_eq!(
            adapter.client.deleted.lock().unwrap().as_slice(),
            &[("bob".to_string(), "AKIABOB000000001".to_string())]
        );
    }

    #[test]
    fn test_iam_error_message() {
        let body = r#"<ErrorResponse><Error><Type>Sender</Type><Code>NoSuchEntity</Code><Message>The user with name carol cannot be found.</Message></Error></ErrorResponse>"#;
        let err = iam_error(404, body);
        assert_eq!(err.kind(), ErrorKind::ProviderApi);
        assert!(err
            .to_string()
            .contains("NoSuchEntity: The user with name carol cannot be found. (http 404)"));
    }
}
