//! Configuration file model (`cloud-keys.toml`).

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::core::dispatch::FanOut;
use crate::error::{KeysError, Result};
use crate::models::provider::Provider;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Default for `list --include-inactive`.
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub fan_out: FanOut,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_inactive: false,
            fan_out: FanOut::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECS
}

/// Base URLs of the provider APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_aws_iam")]
    pub aws_iam: String,
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    #[serde(default = "default_gcp_iam")]
    pub gcp_iam: String,
    #[serde(default = "default_aiven")]
    pub aiven: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            aws_iam: default_aws_iam(),
            aws_region: default_aws_region(),
            gcp_iam: default_gcp_iam(),
            aiven: default_aiven(),
        }
    }
}

fn default_aws_iam() -> String {
    constants::DEFAULT_AWS_IAM_ENDPOINT.to_string()
}

fn default_aws_region() -> String {
    constants::DEFAULT_AWS_REGION.to_string()
}

fn default_gcp_iam() -> String {
    constants::DEFAULT_GCP_IAM_ENDPOINT.to_string()
}

fn default_aiven() -> String {
    constants::DEFAULT_AIVEN_ENDPOINT.to_string()
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub provider: String,
    #[serde(default)]
    pub scope: String,
    /// Environment variable holding the credential used to query the provider.
    #[serde(default)]
    pub credential_env: Option<String>,
}

impl ProviderEntry {
    /// Build the request, reading the credential from the environment.
    pub fn to_request(&self) -> Result<Provider> {
        let credential = match &self.credential_env {
            Some(var) => std::env::var(var).map_err(|_| {
                KeysError::Configuration(format!(
                    "credential variable {} for provider '{}' is not set",
                    var, self.provider
                ))
            })?,
            None => String::new(),
        };
        Ok(Provider::new(&self.provider, &self.scope).with_credential(credential))
    }
}

impl ConfigFile {
    pub fn requests(&self) -> Result<Vec<Provider>> {
        self.providers.iter().map(ProviderEntry::to_request).collect()
    }
}
