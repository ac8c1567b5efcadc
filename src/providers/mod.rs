//! Provider adapters.
//!
//! Every adapter implements [`KeyProvider`], and is generic over a small
//! client trait describing the provider-native API it needs. The default
//! clients talk HTTP; tests plug in in-memory fakes.

pub mod aiven;
pub mod aws;
pub mod gcp;

use crate::error::Result;
use crate::models::key::{Key, NewKey};

pub use aiven::AivenKeys;
pub use aws::AwsKeys;
pub use gcp::GcpKeys;

/// Capability set every provider adapter exposes.
///
/// Implementations hold no mutable state between calls and are shared across
/// threads by the registry.
pub trait KeyProvider: Send + Sync {
    /// List every credential visible under `scope`.
    ///
    /// With `include_inactive == false`, inactive credentials are dropped
    /// before returning. A record is only emitted once all of its fields have
    /// been derived; any normalization failure fails the whole call.
    fn keys(&self, scope: &str, include_inactive: bool, credential: &str) -> Result<Vec<Key>>;

    /// Create one credential for `account`, honouring the provider's
    /// per-account limit.
    fn create_key(&self, scope: &str, account: &str, credential: &str) -> Result<NewKey>;

    /// Revoke one credential. Deleting a missing credential is an error.
    fn delete_key(&self, scope: &str, account: &str, key_id: &str, credential: &str) -> Result<()>;
}
