//! Credentials for hosted providers
//!
//! Keys are looked up when a request is made, not when the client is built,
//! so a key exported after startup is picked up by the next call.

use crate::{EdgeLinkError, Result};

/// Where a provider credential comes from
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Read from the named environment variable at call time
    Env(String),
    /// Fixed value supplied by the caller
    Static(String),
    /// Provider does not need a credential
    None,
}

impl Credential {
    pub fn env(var: impl Into<String>) -> Self {
        Self::Env(var.into())
    }

    /// Resolve the credential value.
    ///
    /// Returns `ServiceMisconfigured` when the variable is unset or blank.
    pub fn resolve(&self) -> Result<Option<String>> {
        match self {
            Self::Env(var) => match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
                _ => Err(EdgeLinkError::ServiceMisconfigured(format!(
                    "{var} environment variable is not set"
                ))),
            },
            Self::Static(value) if value.trim().is_empty() => Err(
                EdgeLinkError::ServiceMisconfigured("empty API key".to_string()),
            ),
            Self::Static(value) => Ok(Some(value.clone())),
            Self::None => Ok(None),
        }
    }

    /// Resolve a credential that must exist
    pub fn require(&self) -> Result<String> {
        self.resolve()?.ok_or_else(|| {
            EdgeLinkError::ServiceMisconfigured("provider requires an API key".to_string())
        })
    }

    pub fn is_present(&self) -> bool {
        self.resolve().is_ok()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_is_misconfigured() {
        let credential = Credential::env("EDGELINK_TEST_CREDENTIAL_THAT_IS_NEVER_SET");
        let err = credential.require().unwrap_err();
        assert!(matches!(err, EdgeLinkError::ServiceMisconfigured(_)));
        assert!(!credential.is_present());
    }

    #[test]
    fn test_static_credential() {
        assert_eq!(
            Credential::Static("sk-test".into()).require().unwrap(),
            "sk-test"
        );
        assert!(Credential::Static("  ".into()).require().is_err());
    }

    #[test]
    fn test_none_credential() {
        assert_eq!(Credential::None.resolve().unwrap(), None);
        assert!(Credential::None.require().is_err());
    }

    #[test]
    fn test_debug_redacts_static_value() {
        let rendered = format!("{:?}", Credential::Static("sk-secret".into()));
        assert!(!rendered.contains("sk-secret"));
    }
}
