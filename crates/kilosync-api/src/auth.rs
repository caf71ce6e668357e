use secrecy::{ExposeSecret, SecretString};

/// Username/password pair shared by both device generations.
///
/// The legacy API sends these as HTTP Basic credentials on every call; the
/// token API exchanges them once for a session token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Build credentials only when both halves are present and non-empty.
    pub fn from_parts(username: Option<&str>, password: Option<&SecretString>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        let password = password.filter(|p| !p.expose_secret().is_empty())?;
        Some(Self::new(username, password.clone()))
    }

    /// Attach these credentials as HTTP Basic auth.
    pub(crate) fn apply_basic(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}
