//! Configuration file discovery and loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::constants;
use crate::models::config::ConfigFile;

/// Resolve the configuration path from CLI arg, env var, or working directory.
pub fn resolve_path(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Ok(path) = env::var(constants::CONFIG_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(constants::DEFAULT_CONFIG_FILE)
}

/// Load a configuration file. A missing file yields the default configuration.
pub fn load(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse(&content).with_context(|| format!("parse config {}", path.display()))
}

pub fn parse(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    for (idx, entry) in config.providers.iter().enumerate() {
        if entry.provider.trim().is_empty() {
            bail!("providers[{}]: provider name cannot be empty", idx);
        }
    }
    if config.settings.http_timeout_secs == 0 {
        bail!("settings.http_timeout_secs must be greater than zero");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::FanOut;

    #[test]
    fn test_parse_full() {
        let config = parse(
            r#"
            [settings]
            include_inactive = true
            fan_out = "concurrent"
            http_timeout_secs = 10

            [endpoints]
            gcp_iam = "http://localhost:9000"

            [[providers]]
            provider = "gcp"
            scope = "my-project"
            credential_env = "GCP_TOKEN"

            [[providers]]
            provider = "aws"
            "#,
        )
        .unwrap();
        assert!(config.settings.include_inactive);
        assert_eq!(config.settings.fan_out, FanOut::Concurrent);
        assert_eq!(config.endpoints.gcp_iam, "http://localhost:9000");
        assert_eq!(config.endpoints.aws_iam, constants::DEFAULT_AWS_IAM_ENDPOINT);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].scope, "");
        assert_eq!(config.providers[1].credential_env, None);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = parse("").unwrap();
        assert!(!config.settings.include_inactive);
        assert_eq!(config.settings.fan_out, FanOut::Sequential);
        assert_eq!(config.settings.http_timeout_secs, constants::DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_provider() {
        assert!(parse("[[providers]]\nprovider = \"\"\n").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_fan_out() {
        assert!(parse("[settings]\nfan_out = \"sideways\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_requests_read_credential_env() {
        let config = parse(
            r#"
            [[providers]]
            provider = "aiven"
            credential_env = "CLOUD_KEYS_TEST_AIVEN_TOKEN"
            "#,
        )
        .unwrap();
        env::set_var("CLOUD_KEYS_TEST_AIVEN_TOKEN", "tok");
        let requests = config.requests().unwrap();
        assert_eq!(requests[0].credential, "tok");
        env::remove_var("CLOUD_KEYS_TEST_AIVEN_TOKEN");
    }

    #[test]
    fn test_requests_unset_credential_env_is_error() {
        let config = parse(
            r#"
            [[providers]]
            provider = "gcp"
            scope = "p"
            credential_env = "CLOUD_KEYS_TEST_DEFINITELY_UNSET"
            "#,
        )
        .unwrap();
        let err = config.requests().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_resolve_path_prefers_arg() {
        let path = resolve_path(Some(PathBuf::from("/tmp/x.toml")));
        assert_eq!(path, PathBuf::from("/tmp/x.toml"));
    }
}
