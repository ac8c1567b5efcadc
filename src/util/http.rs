//! Shared blocking HTTP client for provider APIs.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;

use crate::constants;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(constants::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send `request` and return the status with the full body.
    ///
    /// Non-2xx statuses are not errors here; each provider decodes its own
    /// error payloads.
    pub fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        Ok((status, body))
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.io/", "/v1/x"), "https://a.io/v1/x");
        assert_eq!(join_url("https://a.io", "v1/x"), "https://a.io/v1/x");
    }
}
