//! Centralized constants for provider names, formats, endpoints, and limits.

/// Registry name of the AWS IAM access key adapter.
pub const AWS_PROVIDER: &str = "aws";

/// Registry name of the GCP service-account key adapter.
pub const GCP_PROVIDER: &str = "gcp";

/// Registry name of the Aiven API token adapter.
pub const AIVEN_PROVIDER: &str = "aiven";

/// Timestamp format of IAM `CreateDate` and GCP `validAfterTime`/`validBeforeTime`.
pub const AWS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const GCP_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Aiven `create_time`; fractional seconds are optional.
pub const AIVEN_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Trailing characters of a key id appended to the account in display names.
pub const NUM_ID_VALUES_IN_NAME: usize = 6;

/// Live access keys IAM allows per user.
pub const AWS_ACCESS_KEY_LIMIT: usize = 2;

/// User-managed keys GCP allows per service account.
pub const GCP_ACCESS_KEY_LIMIT: usize = 10;

pub const DEFAULT_AWS_IAM_ENDPOINT: &str = "https://iam.amazonaws.com";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const AWS_IAM_API_VERSION: &str = "2010-05-08";

pub const DEFAULT_GCP_IAM_ENDPOINT: &str = "https://iam.googleapis.com";

pub const DEFAULT_AIVEN_ENDPOINT: &str = "https://api.aiven.io";

/// Page size requested from IAM list calls.
pub const AWS_MAX_ITEMS: u32 = 1000;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const USER_AGENT: &str = concat!("cloud-keys/", env!("CARGO_PKG_VERSION"));

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cloud-keys.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "CLOUD_KEYS_CONFIG";

/// Permission mode for secret files written by `create --output`.
pub const SECRET_FILE_MODE: u32 = 0o600;
