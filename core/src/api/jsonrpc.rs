//! JSON-RPC adapter for the manager's `/jsonrpc` endpoint.
//!
//! Every operation is one `POST` carrying a single-element `params` array:
//!
//! ```json
//! {"id": 3, "method": "set", "session": "…", "verbose": 1,
//!  "params": [{"url": "pm/config/adom/root/obj/firewall/address", "data": {…}}]}
//! ```
//!
//! The status of the call is read from `result[0].status`. With a password
//! login the session id returned by `sys/login/user` is echoed on every later
//! request; with a token it is sent as a bearer header instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use addrbatch_common::config::ManagerConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{ApiError, ApiResponse, Diagnostics, ManagerApi, workspace_url};

const LOGIN_URL: &str = "sys/login/user";
const LOGOUT_URL: &str = "sys/logout";
const REDACTED: &str = "<redacted>";

pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: String,
    session: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
    request_id: AtomicU64,
    diagnostics: Diagnostics,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: u64,
    method: &'a str,
    params: [RpcParams<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<String>,
    verbose: u8,
}

#[derive(Serialize)]
struct RpcParams<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Vec<RpcResult>,
    #[serde(default)]
    session: Option<String>,
}

#[derive(Deserialize)]
struct RpcResult {
    status: RpcStatus,
}

#[derive(Deserialize)]
struct RpcStatus {
    code: i64,
    #[serde(default)]
    message: String,
}

impl JsonRpcClient {
    pub fn new(config: &ManagerConfig) -> Result<Self, ApiError> {
        let endpoint = endpoint_for(&config.host);
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|source| ApiError::Transport {
                url: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint,
            session: Mutex::new(None),
            token: Mutex::new(None),
            request_id: AtomicU64::new(1),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exec(&self, url: &str, data: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.call("exec", url, data).await
    }

    async fn call(&self, method: &str, url: &str, data: Option<&Value>) -> Result<ApiResponse, ApiError> {
        let session = locked(&self.session).clone();
        let token = locked(&self.token).clone();
        let request = RpcRequest {
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: [RpcParams { url, data }],
            session,
            verbose: 1,
        };

        let verbose = self.diagnostics.is_enabled();
        if verbose {
            let body = serde_json::to_value(&request).unwrap_or(Value::Null);
            debug!("REQUEST {} {}", self.endpoint, redact(body));
        }

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let text = builder
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| transport_error(url, source))?
            .text()
            .await
            .map_err(|source| transport_error(url, source))?;

        if verbose {
            debug!("RESPONSE {url} {text}");
        }

        let response: RpcResponse = serde_json::from_str(&text).map_err(|e| ApiError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(session) = response.session {
            *locked(&self.session) = Some(session);
        }

        let result = response.result.into_iter().next().ok_or_else(|| ApiError::Malformed {
            url: url.to_string(),
            reason: "empty result list".to_string(),
        })?;

        Ok(ApiResponse::new(result.status.code, result.status.message))
    }
}

#[async_trait]
impl ManagerApi for JsonRpcClient {
    fn attach_token(&self, token: &str) {
        *locked(&self.token) = Some(token.to_string());
    }

    async fn login(&self, username: &str, password: &str) -> Result<ApiResponse, ApiError> {
        let data = json!({ "user": username, "passwd": password });
        self.exec(LOGIN_URL, Some(&data)).await
    }

    async fn logout(&self) -> Result<ApiResponse, ApiError> {
        let response = self.exec(LOGOUT_URL, None).await;
        *locked(&self.session) = None;
        response
    }

    async fn lock(&self, domain: &str) -> Result<ApiResponse, ApiError> {
        self.exec(&workspace_url(domain, "lock"), None).await
    }

    async fn set(&self, url: &str, data: &Value) -> Result<ApiResponse, ApiError> {
        self.call("set", url, Some(data)).await
    }

    async fn commit(&self, domain: &str) -> Result<ApiResponse, ApiError> {
        self.exec(&workspace_url(domain, "commit"), None).await
    }

    async fn unlock(&self, domain: &str) -> Result<ApiResponse, ApiError> {
        self.exec(&workspace_url(domain, "unlock"), None).await
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// `https://{host}/jsonrpc`, unless `host` already names a scheme.
pub fn endpoint_for(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        format!("{host}/jsonrpc")
    } else {
        format!("https://{host}/jsonrpc")
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> ApiError {
    if source.is_timeout() {
        ApiError::Timeout { url: url.to_string() }
    } else {
        ApiError::Transport {
            url: url.to_string(),
            source,
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn redact(mut body: Value) -> Value {
    if let Some(session) = body.get_mut("session") {
        *session = Value::from(REDACTED);
    }
    if let Some(params) = body.get_mut("params").and_then(Value::as_array_mut) {
        for param in params {
            if let Some(passwd) = param.pointer_mut("/data/passwd") {
                *passwd = Value::from(REDACTED);
            }
        }
    }
    body
}
