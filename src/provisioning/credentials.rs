//! Cloud credentials injected into every terraform subprocess.

use std::fmt;

use crate::config::CredentialsConfig;

/// Variable terraform's AWS provider reads the access key from.
pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";

/// Variable terraform's AWS provider reads the secret key from.
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Optional access/secret key pair, stored trimmed.
///
/// Blank values count as absent so they are never injected as empty strings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
}

impl Credentials {
    /// Creates credentials from optional raw values.
    #[must_use]
    pub fn new(access_key_id: Option<&str>, secret_access_key: Option<&str>) -> Self {
        Self {
            access_key_id: normalize(access_key_id),
            secret_access_key: normalize(secret_access_key),
        }
    }

    /// Creates credentials from the configuration section.
    #[must_use]
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
        )
    }

    /// True when neither value is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_key_id.is_none() && self.secret_access_key.is_none()
    }

    /// Variables to add to a subprocess environment.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::with_capacity(2);
        if let Some(key) = &self.access_key_id {
            vars.push((ACCESS_KEY_VAR.to_string(), key.clone()));
        }
        if let Some(secret) = &self.secret_access_key {
            vars.push((SECRET_KEY_VAR.to_string(), secret.clone()));
        }
        vars
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id.is_some())
            .field("secret_access_key", &self.secret_access_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_trimmed() {
        let creds = Credentials::new(Some("  AKIAEXAMPLE\n"), Some("\tsecret "));
        assert_eq!(
            creds.env_vars(),
            vec![
                (ACCESS_KEY_VAR.to_string(), "AKIAEXAMPLE".to_string()),
                (SECRET_KEY_VAR.to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_absent_values_are_omitted() {
        let creds = Credentials::new(None, Some("secret"));
        assert_eq!(
            creds.env_vars(),
            vec![(SECRET_KEY_VAR.to_string(), "secret".to_string())]
        );

        assert!(Credentials::default().env_vars().is_empty());
        assert!(Credentials::default().is_empty());
    }

    #[test]
    fn test_blank_values_are_omitted() {
        let creds = Credentials::new(Some("   "), Some(""));
        assert!(creds.is_empty());
        assert!(creds.env_vars().is_empty());
    }

    #[test]
    fn test_debug_hides_values() {
        let creds = Credentials::new(Some("AKIAEXAMPLE"), Some("topsecret"));
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("AKIAEXAMPLE"));
        assert!(!rendered.contains("topsecret"));
    }
}
