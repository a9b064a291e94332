use std::collections::HashMap;

use serde::Serialize;
use validator::{ValidateEmail, ValidationError};

pub(crate) mod analytics;
pub(crate) mod assessment;
pub(crate) mod attempt;
pub(crate) mod auth;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Email check on the trimmed value, matching what handlers store.
pub(crate) fn trimmed_email(value: &str) -> Result<(), ValidationError> {
    if !value.trim().validate_email() {
        return Err(ValidationError::new("email").with_message("must be a valid address".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_rejects_whitespace() {
        assert!(non_blank("ada").is_ok());
        assert!(non_blank("   ").is_err());
        assert!(non_blank("").is_err());
    }

    #[test]
    fn trimmed_email_ignores_surrounding_whitespace() {
        assert!(trimmed_email(" ada@example.com ").is_ok());
        assert!(trimmed_email("ada@example.com").is_ok());
        assert!(trimmed_email("  ").is_err());
        assert!(trimmed_email("ada at example").is_err());
    }
}
