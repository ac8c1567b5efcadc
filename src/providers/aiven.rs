//! Aiven API tokens.
//!
//! Only tokens with a description are managed: the description is the
//! identifier used to track a token for rotation, and tokens created outside
//! this tool usually have none. `full_account` is `"<token_prefix>-<description>"`.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::constants;
use crate::core::normalize;
use crate::error::{KeysError, Result};
use crate::models::key::{Key, KeyStatus, NewKey};
use crate::models::provider::Provider;
use crate::providers::KeyProvider;
use crate::util::http::{join_url, HttpClient};

const TOKEN_PATH: &str = "v1/access_token";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub more_info: String,
    #[serde(default)]
    pub status: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Token {
    pub create_time: String,
    #[serde(default)]
    pub currently_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expiry_time: Option<String>,
    pub token_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListTokensResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateTokenResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub full_token: String,
    #[serde(default)]
    pub token_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RevokeTokenResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default)]
    pub message: String,
}

/// Responses that may carry an embedded `errors` list.
pub trait TokenResponse {
    fn errors(&self) -> &[ApiError];
    fn message(&self) -> &str;
}

macro_rules! token_response {
    ($($ty:ty),*) => {
        $(impl TokenResponse for $ty {
            fn errors(&self) -> &[ApiError] {
                &self.errors
            }

            fn message(&self) -> &str {
                &self.message
            }
        })*
    };
}

token_response!(ListTokensResponse, CreateTokenResponse, RevokeTokenResponse);

/// The token endpoints the adapter needs. Responses are returned with their
/// embedded `errors` untouched.
pub trait TokenApi: Send + Sync {
    fn list_tokens(&self, credential: &str) -> Result<ListTokensResponse>;
    fn create_token(&self, description: &str, credential: &str) -> Result<CreateTokenResponse>;
    fn revoke_token(&self, token_prefix: &str, credential: &str) -> Result<RevokeTokenResponse>;
}

/// Collapse every embedded API error into one.
fn check_errors(errors: &[ApiError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| format!("msg: {}, status: {}", e.message, e.status))
        .collect::<Vec<_>>()
        .join(",");
    Err(KeysError::api(constants::AIVEN_PROVIDER, message))
}

fn split_full_account(full_account: &str) -> Result<(&str, &str)> {
    full_account
        .split_once('-')
        .ok_or_else(|| KeysError::MalformedName(full_account.to_string()))
}

/// Description part of `"<prefix>-<description>"`. Tokens without a
/// description are not listed, so an empty one is rejected.
pub fn description_from_full_account(full_account: &str) -> Result<&str> {
    match split_full_account(full_account)? {
        (_, "") => Err(KeysError::MalformedName(full_account.to_string())),
        (_, description) => Ok(description),
    }
}

/// Prefix part of `"<prefix>-<description>"`.
pub fn prefix_from_full_account(full_account: &str) -> Result<&str> {
    split_full_account(full_account).map(|(prefix, _)| prefix)
}

pub struct AivenKeys<C = TokenHttpClient> {
    client: C,
}

impl<C: TokenApi> AivenKeys<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

fn key_from_token(token: &Token, description: &str, scope: &str, credential: &str) -> Result<Key> {
    let created = normalize::parse_timestamp(constants::AIVEN_TIME_FORMAT, &token.create_time)?;
    let life_remaining = match token.expiry_time.as_deref() {
        Some(expiry) => normalize::life_remaining_minutes(normalize::parse_timestamp(
            constants::AIVEN_TIME_FORMAT,
            expiry,
        )?),
        None => 0.0,
    };
    Ok(Key {
        account: description.to_string(),
        full_account: format!("{}-{}", token.token_prefix, description),
        age: normalize::age_minutes(created),
        id: token.token_prefix.clone(),
        life_remaining,
        name: description.to_string(),
        provider: Provider::new(constants::AIVEN_PROVIDER, scope).with_credential(credential),
        status: KeyStatus::from_active(token.currently_active),
    })
}

impl<C: TokenApi> KeyProvider for AivenKeys<C> {
    fn keys(&self, scope: &str, include_inactive: bool, credential: &str) -> Result<Vec<Key>> {
        let response = self.client.list_tokens(credential)?;
        check_errors(&response.errors)?;

        let mut keys = Vec::new();
        for token in &response.tokens {
            let description = match token.description.as_deref() {
                Some(d) if !d.is_empty() => d,
                _ => continue,
            };
            let key = key_from_token(token, description, scope, credential)?;
            if include_inactive || key.status.is_active() {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn create_key(&self, _scope: &str, account: &str, credential: &str) -> Result<NewKey> {
        let description = description_from_full_account(account)?;
        let response = self.client.create_token(description, credential)?;
        check_errors(&response.errors)?;
        Ok(NewKey::new(response.token_prefix, response.full_token))
    }

    fn delete_key(&self, _scope: &str, account: &str, _key_id: &str, credential: &str) -> Result<()> {
        let prefix = prefix_from_full_account(account)?;
        let response = self.client.revoke_token(prefix, credential)?;
        check_errors(&response.errors)
    }
}

/// Client for the `/v1/access_token` endpoints.
pub struct TokenHttpClient {
    http: HttpClient,
    endpoint: String,
}

impl TokenHttpClient {
    pub fn new(http: HttpClient, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    fn token_url(&self) -> String {
        join_url(&self.endpoint, TOKEN_PATH)
    }

    /// Decode a response. A failure status is returned as-is when the body
    /// carries embedded errors, and as an api error otherwise.
    fn send<T: DeserializeOwned + TokenResponse>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T> {
        let (status, body) = self.http.send(request)?;
        match serde_json::from_str::<T>(&body) {
            Ok(decoded) if status.is_success() || !decoded.errors().is_empty() => Ok(decoded),
            Ok(decoded) => {
                let detail = if decoded.message().is_empty() {
                    body.trim().to_string()
                } else {
                    decoded.message().to_string()
                };
                Err(KeysError::api(
                    constants::AIVEN_PROVIDER,
                    format!("http {}: {}", status.as_u16(), detail),
                ))
            }
            Err(_) if !status.is_success() => Err(KeysError::api(
                constants::AIVEN_PROVIDER,
                format!("http {}: {}", status.as_u16(), body.trim()),
            )),
            Err(e) => Err(KeysError::decode(
                constants::AIVEN_PROVIDER,
                format!("{}, response: {}", e, body.trim()),
            )),
        }
    }
}

impl TokenApi for TokenHttpClient {
    fn list_tokens(&self, credential: &str) -> Result<ListTokensResponse> {
        let request = self.http.client().get(self.token_url()).bearer_auth(credential);
        self.send(request)
    }

    fn create_token(&self, description: &str, credential: &str) -> Result<CreateTokenResponse> {
        let request = self
            .http
            .client()
            .post(self.token_url())
            .bearer_auth(credential)
            .json(&serde_json::json!({ "description": description }));
        self.send(request)
    }

    fn revoke_token(&self, token_prefix: &str, credential: &str) -> Result<RevokeTokenResponse> {
        let invalid = |detail: String| KeysError::Configuration(format!("aiven endpoint {}: {}", self.endpoint, detail));
        let mut url = Url::parse(&self.token_url()).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base url".into()))?
            .push(token_prefix);
        let request = self.http.client().delete(url).bearer_auth(credential);
        self.send(request)
    }
}
