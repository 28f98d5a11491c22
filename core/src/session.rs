//! # Session Management
//!
//! A [`Session`] wraps a [`ManagerApi`] with one of two authentication
//! strategies, picked from the configured [`Credentials`]:
//!
//! * **Token**: the token is attached to the handle; nothing goes over the wire.
//! * **Password**: an explicit login that must succeed before any other call,
//!   and a matching logout in [`Session::close`].
//!
//! Both strategies expose the same call surface through [`Session::api`].

use addrbatch_common::config::Credentials;
use addrbatch_common::{info, success};
use thiserror::Error;

use crate::api::{ApiError, ApiResponse, ManagerApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    Token,
    Password,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{operation} failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: ApiError,
    },
    #[error("{operation} rejected by the manager (code {code}): {message}")]
    Rejected {
        operation: &'static str,
        code: i64,
        message: String,
    },
}

pub struct Session {
    api: Box<dyn ManagerApi>,
    strategy: AuthStrategy,
}

impl Session {
    /// Authenticates `api` with `credentials`.
    ///
    /// Under the password strategy this performs the login round-trip and
    /// fails unless the manager answers with code `0`.
    pub async fn establish(
        api: Box<dyn ManagerApi>,
        credentials: &Credentials,
    ) -> Result<Self, SessionError> {
        let strategy = match credentials {
            Credentials::Token(token) => {
                api.attach_token(token);
                info!("Using API token authentication");
                AuthStrategy::Token
            }
            Credentials::Password { username, password } => {
                let response = api.login(username, password).await;
                expect_success("login", response)?;
                success!("Logged in as {username}");
                AuthStrategy::Password
            }
        };

        Ok(Self { api, strategy })
    }

    pub fn api(&self) -> &dyn ManagerApi {
        self.api.as_ref()
    }

    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    /// Tears the session down. Only a password login is logged out.
    pub async fn close(self) -> Result<(), SessionError> {
        match self.strategy {
            AuthStrategy::Token => Ok(()),
            AuthStrategy::Password => {
                let response = self.api.logout().await;
                expect_success("logout", response)?;
                info!("Logged out");
                Ok(())
            }
        }
    }
}

pub(crate) fn expect_success(
    operation: &'static str,
    response: Result<ApiResponse, ApiError>,
) -> Result<ApiResponse, SessionError> {
    match response {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(SessionError::Rejected {
            operation,
            code: response.code,
            message: response.message,
        }),
        Err(source) => Err(SessionError::Transport { operation, source }),
    }
}
