use std::fmt;

use serde::{Deserialize, Serialize};

/// Addressing tuple for one provider request.
///
/// `credential` authenticates the query itself and is never serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing)]
    pub credential: String,
}

impl Provider {
    pub fn new(provider: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            scope: scope.into(),
            credential: String::new(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = credential.into();
        self
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = if self.credential.is_empty() {
            "<none>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Provider")
            .field("provider", &self.provider)
            .field("scope", &self.scope)
            .field("credential", &credential)
            .finish()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            write!(f, "{}", self.provider)
        } else {
            write!(f, "{}/{}", self.provider, self.scope)
        }
    }
}
