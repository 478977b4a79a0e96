use std::env;

use crate::ProductResearchError;

/// Wrapper around sensitive values to reduce accidental logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***redacted***")
    }
}

/// Require that a given environment variable is set and non-empty.
pub fn require_env(var: &str) -> Result<SecretValue, ProductResearchError> {
    require_with(var, |name| env::var(name).ok())
}

/// Same as [`require_env`] but resolves the variable through `lookup`.
pub fn require_with<F>(var: &str, lookup: F) -> Result<SecretValue, ProductResearchError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(SecretValue(value.trim().to_string())),
        _ => Err(ProductResearchError::MissingSecret(var.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_with_success() {
        let secret = require_with("TEST_SECRET", |_| Some(" value ".to_string()))
            .expect("secret should load");
        assert_eq!(secret.expose(), "value");
    }

    #[test]
    fn require_with_missing_or_blank() {
        let err = require_with("TEST_SECRET_MISSING", |_| None).unwrap_err();
        assert!(matches!(err, ProductResearchError::MissingSecret(ref name) if name == "TEST_SECRET_MISSING"));

        let err = require_with("TEST_SECRET_BLANK", |_| Some("   ".into())).unwrap_err();
        assert!(matches!(err, ProductResearchError::MissingSecret(_)));
    }

    #[test]
    fn debug_output_is_redacted() {
        let secret = SecretValue::new("sk-live-123");
        assert_eq!(format!("{secret:?}"), "***redacted***");
    }
}
