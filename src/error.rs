//! Library error type.

use thiserror::Error;

/// Broad category of a [`KeysError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Normalization,
    ProviderApi,
    Policy,
}

#[derive(Debug, Error)]
pub enum KeysError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no provider registered under '{0}'")]
    UnknownProvider(String),

    #[error("delimiter '{delimiter}' not found in '{target}'")]
    DelimiterNotFound { delimiter: String, target: String },

    #[error("cannot parse timestamp '{value}' with format '{format}': {source}")]
    Timestamp {
        value: String,
        format: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    #[error("malformed identifier '{0}'")]
    MalformedName(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} api error: {message}")]
    Api { provider: String, message: String },

    #[error("cannot decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("number of keys for {account} is already at its limit ({limit})")]
    KeyLimit { account: String, limit: usize },

    #[error("{provider} request (scope '{scope}') failed: {source}")]
    Request {
        provider: String,
        scope: String,
        #[source]
        source: Box<KeysError>,
    },
}

impl KeysError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::UnknownProvider(_) => ErrorKind::Configuration,
            Self::DelimiterNotFound { .. } | Self::Timestamp { .. } | Self::MalformedName(_) => {
                ErrorKind::Normalization
            }
            Self::Http(_) | Self::Api { .. } | Self::Decode { .. } => ErrorKind::ProviderApi,
            Self::KeyLimit { .. } => ErrorKind::Policy,
            Self::Request { source, .. } => source.kind(),
        }
    }

    pub(crate) fn api(provider: &str, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn decode(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeysError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_follows_source() {
        let err = KeysError::Request {
            provider: "gcp".into(),
            scope: "p".into(),
            source: Box::new(KeysError::KeyLimit {
                account: "sa".into(),
                limit: 10,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::Policy);
        assert!(err.to_string().contains("gcp request (scope 'p')"));
    }

    #[test]
    fn test_unknown_provider_is_configuration() {
        let err = KeysError::UnknownProvider("azure".into());
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
