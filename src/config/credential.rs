use crate::ConfigError;
use std::fmt;

/// The single secret used to authenticate against the extraction endpoint
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Reads the credential from the named environment variable
    ///
    /// A missing variable and a blank one are the same fatal error.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        let value = std::env::var(var).unwrap_or_default();
        Self::new(value).ok_or_else(|| ConfigError::MissingCredential {
            var: var.to_string(),
        })
    }

    /// Wraps a raw value, rejecting blank input
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
