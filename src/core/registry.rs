//! Provider registry.
//!
//! Maps a provider name to one shared adapter instance. The registry is an
//! ordinary value owned by the caller; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::constants;
use crate::error::{KeysError, Result};
use crate::models::config::Endpoints;
use crate::providers::aiven::{AivenKeys, TokenHttpClient};
use crate::providers::aws::{AwsKeys, IamHttpClient};
use crate::providers::gcp::{GcpKeys, GcpHttpClient};
use crate::providers::KeyProvider;
use crate::util::http::HttpClient;

#[derive(Clone, Default)]
pub struct Registry {
    adapters: HashMap<String, Arc<dyn KeyProvider>>,
}

impl Registry {
    /// A registry with no adapters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry seeded with the AWS, GCP and Aiven adapters.
    pub fn builtin(endpoints: &Endpoints, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(timeout)?;
        let mut registry = Self::empty();
        registry.register(
            constants::AWS_PROVIDER,
            AwsKeys::new(IamHttpClient::new(
                http.clone(),
                &endpoints.aws_iam,
                &endpoints.aws_region,
            )),
        );
        registry.register(
            constants::GCP_PROVIDER,
            GcpKeys::new(GcpHttpClient::new(http.clone(), &endpoints.gcp_iam)),
        );
        registry.register(
            constants::AIVEN_PROVIDER,
            AivenKeys::new(TokenHttpClient::new(http, &endpoints.aiven)),
        );
        Ok(registry)
    }

    /// Register `adapter` under `name`, replacing any earlier registration.
    pub fn register<P>(&mut self, name: impl Into<String>, adapter: P) -> Option<Arc<dyn KeyProvider>>
    where
        P: KeyProvider + 'static,
    {
        self.register_shared(name, Arc::new(adapter))
    }

    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        adapter: Arc<dyn KeyProvider>,
    ) -> Option<Arc<dyn KeyProvider>> {
        let name = name.into();
        debug!(provider = %name, "registering key provider");
        self.adapters.insert(name, adapter)
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn KeyProvider> {
        self.adapters
            .get(name)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| KeysError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.names())
            .finish()
    }
}
