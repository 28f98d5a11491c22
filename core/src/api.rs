//! The central **abstraction** for talking to the policy manager.
//!
//! The batch executor and the session only ever see [`ManagerApi`]. The
//! [`jsonrpc`] module provides the HTTP implementation; tests plug in their
//! own.
//!
//! Every call answers with an [`ApiResponse`] carrying the manager's status
//! code (`0` on success). A non-zero code is *not* an [`ApiError`]: errors are
//! reserved for calls that produced no usable answer at all.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod jsonrpc;

/// Domain name the manager treats as the global (shared) configuration.
pub const GLOBAL_DOMAIN: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub code: i64,
    pub message: String,
}

impl ApiResponse {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("unexpected response for {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Switch for verbose request/response capture.
///
/// It is only ever turned on through [`Diagnostics::scope`], which puts the
/// previous state back when the guard is dropped.
#[derive(Debug, Default)]
pub struct Diagnostics {
    verbose: AtomicBool,
}

impl Diagnostics {
    pub fn is_enabled(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    pub fn scope(&self) -> DiagnosticScope<'_> {
        let previous = self.verbose.swap(true, Ordering::SeqCst);
        DiagnosticScope {
            diagnostics: self,
            previous,
        }
    }
}

#[must_use = "diagnostics are disabled again as soon as the scope is dropped"]
pub struct DiagnosticScope<'a> {
    diagnostics: &'a Diagnostics,
    previous: bool,
}

impl Drop for DiagnosticScope<'_> {
    fn drop(&mut self) {
        self.diagnostics.verbose.store(self.previous, Ordering::SeqCst);
    }
}

/// Remote operations consumed by a provisioning run.
#[async_trait]
pub trait ManagerApi: Send + Sync {
    /// Sends `token` with every following request.
    fn attach_token(&self, token: &str);

    async fn login(&self, username: &str, password: &str) -> Result<ApiResponse, ApiError>;

    async fn logout(&self) -> Result<ApiResponse, ApiError>;

    /// Acquires the exclusive edit lock on `domain`.
    async fn lock(&self, domain: &str) -> Result<ApiResponse, ApiError>;

    /// Creates the object at `url`, or updates it if it already exists.
    async fn set(&self, url: &str, data: &Value) -> Result<ApiResponse, ApiError>;

    /// Persists the changes staged in `domain`.
    async fn commit(&self, domain: &str) -> Result<ApiResponse, ApiError>;

    async fn unlock(&self, domain: &str) -> Result<ApiResponse, ApiError>;

    fn diagnostics(&self) -> &Diagnostics;
}

/// Table URL for firewall address objects in `domain`.
pub fn address_url(domain: &str) -> String {
    if domain.eq_ignore_ascii_case(GLOBAL_DOMAIN) {
        "pm/config/global/obj/firewall/address".to_string()
    } else {
        format!("pm/config/adom/{domain}/obj/firewall/address")
    }
}

/// Workspace URL for `action` (`lock`, `commit`, `unlock`) in `domain`.
pub fn workspace_url(domain: &str, action: &str) -> String {
    if domain.eq_ignore_ascii_case(GLOBAL_DOMAIN) {
        format!("/dvmdb/global/workspace/{action}")
    } else {
        format!("/dvmdb/adom/{domain}/workspace/{action}")
    }
}
