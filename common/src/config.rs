use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("manager host is not set (FMG_IP)")]
    MissingHost,
    #[error("configuration domain is not set (FMG_ADOM)")]
    MissingDomain,
    #[error("no credentials: set FMG_API_TOKEN, or both FMG_USERNAME and FMG_PASSWORD")]
    MissingCredentials,
}

/// How the session authenticates against the manager.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued API token, sent with every request. No login round-trip.
    Token(String),
    /// Interactive login; the session must be logged out afterwards.
    Password { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Settings for one provisioning run.
///
/// Built once at startup and passed by reference to the session and the
/// batch executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Manager address. A bare host gets `https://`; a full URL is used as is.
    pub host: String,
    /// Configuration domain (ADOM) that is locked and committed.
    pub domain: String,
    pub credentials: Credentials,
    /// Reject self-signed certificates when set.
    pub verify_tls: bool,
    /// Upper bound for every single remote call.
    pub timeout: Duration,
}

/// Raw, possibly incomplete settings as gathered from arguments and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigParts {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub token: Option<String>,
    pub verify_tls: bool,
    pub timeout: Option<Duration>,
}

impl ManagerConfig {
    /// Validates `parts`. A non-empty token wins over username and password.
    pub fn from_parts(parts: ConfigParts) -> Result<Self, ConfigError> {
        let host = non_empty(parts.host).ok_or(ConfigError::MissingHost)?;
        let domain = non_empty(parts.domain).ok_or(ConfigError::MissingDomain)?;

        let credentials = match (non_empty(parts.token), non_empty(parts.username), parts.password) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(username), Some(password)) if !password.is_empty() => {
                Credentials::Password { username, password }
            }
            _ => return Err(ConfigError::MissingCredentials),
        };

        Ok(Self {
            host,
            domain,
            credentials,
            verify_tls: parts.verify_tls,
            timeout: parts.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    pub fn uses_token(&self) -> bool {
        matches!(self.credentials, Credentials::Token(_))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
