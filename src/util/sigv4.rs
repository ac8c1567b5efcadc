//! AWS Signature Version 4 for IAM Query API `GET` requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{KeysError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// RFC 3986 unreserved characters stay literal; everything else is encoded.
const AWS_QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const QUERY_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Credentials used to sign IAM requests.
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: Zeroizing<String>,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Parse `ACCESS_KEY_ID:SECRET_ACCESS_KEY[:SESSION_TOKEN]`, falling back
    /// to the standard AWS environment variables when `credential` is empty.
    pub fn resolve(credential: &str) -> Result<Self> {
        if credential.is_empty() {
            return Self::from_env();
        }
        let mut parts = credential.splitn(3, ':');
        let access_key_id = parts.next().unwrap_or_default();
        let secret = parts.next().unwrap_or_default();
        if access_key_id.is_empty() || secret.is_empty() {
            return Err(KeysError::Configuration(
                "aws credential must be ACCESS_KEY_ID:SECRET_ACCESS_KEY[:SESSION_TOKEN]".into(),
            ));
        }
        Ok(Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: Zeroizing::new(secret.to_string()),
            session_token: parts.next().filter(|t| !t.is_empty()).map(str::to_string),
        })
    }

    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| KeysError::Configuration(format!("{} is not set", name)))
        };
        Ok(Self {
            access_key_id: read("AWS_ACCESS_KEY_ID")?,
            secret_access_key: Zeroizing::new(read("AWS_SECRET_ACCESS_KEY")?),
            session_token: std::env::var("AWS_SESSION_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}

/// Query string and headers of a signed request.
#[derive(Debug)]
pub struct SignedRequest {
    pub query: String,
    pub headers: Vec<(&'static str, String)>,
    pub signature: String,
}

pub struct Signer<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
}

impl Signer<'_> {
    pub fn sign_get(
        &self,
        host: &str,
        params: &BTreeMap<String, String>,
        at: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let date = at.format("%Y%m%d").to_string();
        let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
        let query = canonical_query(params);

        let mut canonical_headers = format!(
            "content-type:{}\nhost:{}\nx-amz-date:{}\n",
            QUERY_CONTENT_TYPE, host, amz_date
        );
        let mut signed_headers = String::from("content-type;host;x-amz-date");
        if let Some(token) = &self.credentials.session_token {
            canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token));
            signed_headers.push_str(";x-amz-security-token");
        }

        let canonical_request = format!(
            "GET\n/\n{}\n{}\n{}\n{}",
            query,
            canonical_headers,
            signed_headers,
            hex::encode(Sha256::digest(b""))
        );
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = Zeroizing::new(format!("AWS4{}", self.credentials.secret_access_key.as_str()));
        let k_date = hmac(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        let k_signing = hmac(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        );
        let mut headers = vec![
            ("content-type", QUERY_CONTENT_TYPE.to_string()),
            ("x-amz-date", amz_date),
            ("authorization", authorization),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }
        Ok(SignedRequest {
            query,
            headers,
            signature,
        })
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| KeysError::Configuration(format!("signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Parameters sorted by name, names and values URI-encoded.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(s: &str) -> String {
    utf8_percent_encode(s, AWS_QUERY).to_string()
}
