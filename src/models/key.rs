use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::models::provider::Provider;

/// Liveness of a credential as reported by its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("Active"),
            Self::Inactive => f.write_str("Inactive"),
        }
    }
}

/// A normalized credential record.
///
/// `age` and `life_remaining` are in minutes and derived at query time.
/// `full_account` carries what the owning adapter needs to re-address the
/// credential for create/delete without another lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub account: String,
    pub full_account: String,
    pub age: f64,
    pub id: String,
    pub life_remaining: f64,
    pub name: String,
    pub provider: Provider,
    pub status: KeyStatus,
}

/// Identifier and secret material of a freshly created credential.
///
/// The secret is only available here; providers never return it again.
pub struct NewKey {
    pub id: String,
    pub secret: Zeroizing<String>,
}

impl NewKey {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl fmt::Debug for NewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_as_provider_strings() {
        assert_eq!(serde_json::to_string(&KeyStatus::Active).unwrap(), "\"Active\"");
        assert_eq!(KeyStatus::from_active(false).to_string(), "Inactive");
        assert!(!KeyStatus::Inactive.is_active());
    }

    #[test]
    fn test_new_key_debug_redacts_secret() {
        let key = NewKey::new("AKIA123", "super-secret");
        let debug = format!("{:?}", key);
        assert!(debug.contains("AKIA123"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_key_json_uses_camel_case_and_hides_credential() {
        let key = Key {
            account: "sa".into(),
            full_account: "sa@p.iam.gserviceaccount.com".into(),
            age: 1.5,
            id: "abc".into(),
            life_remaining: 0.0,
            name: "sa_abc".into(),
            provider: Provider::new("gcp", "p").with_credential("bearer"),
            status: KeyStatus::Active,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["fullAccount"], "sa@p.iam.gserviceaccount.com");
        assert_eq!(json["lifeRemaining"], 0.0);
        assert!(json["provider"].get("credential").is_none());
    }
}
